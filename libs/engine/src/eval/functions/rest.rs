//! REST builtins
//!
//! These run when a REST function reaches the engine through the builtin
//! table (the `call` action); expression-position `rest_*` calls are
//! specialized into AST nodes at parse time and evaluated directly. Either
//! way the injected provider does the transport and never fails.

use crate::context::EvaluationContext;
use crate::engine::EngineConfig;
use crate::error::{Diagnostic, ErrorCode};
use crate::providers::{rest_result, RestRequest};
use crate::value::Value;
use rust_decimal::prelude::ToPrimitive;
use std::time::Duration;

pub fn call(
    name: &str,
    args: &[Value],
    ctx: &mut EvaluationContext,
    config: &EngineConfig,
) -> Value {
    let (method, rest): (String, &[Value]) = if name == "rest_call" {
        (args[0].to_string().to_uppercase(), &args[1..])
    } else {
        (name["rest_".len()..].to_uppercase(), args)
    };

    let Some(url) = rest.first() else {
        return rest_result(false, None, None, Some("missing url".to_string()));
    };
    let has_body = matches!(method.as_str(), "POST" | "PUT" | "PATCH");
    let (body, tail) = if has_body {
        (rest.get(1).cloned(), &rest[1.min(rest.len())..])
    } else {
        (None, rest)
    };

    let headers = tail.get(1).cloned();
    let timeout = tail
        .get(2)
        .and_then(|v| v.try_decimal())
        .and_then(|ms| ms.to_u64())
        .map(Duration::from_millis)
        .unwrap_or(config.rest_timeout);

    let response = config.rest_provider.call(RestRequest {
        method: method.clone(),
        url: url.to_string(),
        body,
        headers,
        timeout,
    });

    if let Value::Object(map) = &response {
        if map.get("success") == Some(&Value::Bool(false)) {
            let message = map
                .get("message")
                .map(|m| m.to_string())
                .unwrap_or_else(|| "request failed".to_string());
            ctx.add_diagnostic(Diagnostic::new(
                ErrorCode::RestFailure,
                format!("{} {} failed: {}", method, url, message),
            ));
        }
    }
    response
}
