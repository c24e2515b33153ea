//! Logging builtins
//!
//! All of them emit a tracing event and return `Null`. `audit_log` writes to
//! the dedicated `audit` target so deployments can route it separately.

use crate::value::Value;

pub fn emit(name: &str, args: &[Value]) -> Value {
    let message = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    match name {
        "alert" => tracing::warn!(source = "rule", "{}", message),
        "notify" | "send_notification" => {
            tracing::info!(source = "rule", channel = name, "{}", message)
        }
        "audit_log" => tracing::info!(target: "audit", "{}", message),
        _ => tracing::info!(source = "rule", "{}", message),
    }
    Value::Null
}
