//! External collaborator interfaces
//!
//! Everything the engine consumes from the outside world is an injected
//! trait object carried by the engine configuration: the constant store, the
//! REST client behind the `rest_*` functions, the JSON path resolver and the
//! clock. Defaults keep the engine usable without wiring anything up, and
//! in-memory implementations back tests and the CLI.

use crate::value::Value;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// A constant fetched from the external store.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRecord {
    pub code: String,
    pub value_type: Option<String>,
    pub current_value: Value,
    pub required: bool,
    pub default_value: Option<Value>,
}

impl ConstantRecord {
    pub fn new(code: impl Into<String>, current_value: Value) -> Self {
        Self {
            code: code.into(),
            value_type: None,
            current_value,
            required: true,
            default_value: None,
        }
    }

    /// The value an evaluation should snapshot: the stored value, falling
    /// back to the record's own default.
    pub fn effective_value(&self) -> Option<Value> {
        if !self.current_value.is_null() {
            return Some(self.current_value.clone());
        }
        self.default_value.clone()
    }
}

/// Source of system constants. The engine requests every code a document
/// declares or references; returning fewer records (or none) is legal, the
/// document's inline defaults then fill the gaps.
#[async_trait]
pub trait ConstantProvider: Send + Sync {
    async fn constants_by_codes(
        &self,
        codes: &[String],
    ) -> Result<Vec<ConstantRecord>, ProviderError>;
}

/// Failure reported by a constant provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError(pub String);

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ProviderError {}

/// Provider that knows no constants. Documents relying purely on inline
/// defaults evaluate normally against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyConstantProvider;

#[async_trait]
impl ConstantProvider for EmptyConstantProvider {
    async fn constants_by_codes(
        &self,
        _codes: &[String],
    ) -> Result<Vec<ConstantRecord>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Map-backed provider for tests, the CLI and embedders with static
/// constant sets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConstantProvider {
    constants: BTreeMap<String, Value>,
}

impl InMemoryConstantProvider {
    pub fn new(constants: BTreeMap<String, Value>) -> Self {
        Self { constants }
    }

    pub fn with(mut self, code: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(code.into(), value.into());
        self
    }
}

#[async_trait]
impl ConstantProvider for InMemoryConstantProvider {
    async fn constants_by_codes(
        &self,
        codes: &[String],
    ) -> Result<Vec<ConstantRecord>, ProviderError> {
        Ok(codes
            .iter()
            .filter_map(|code| {
                self.constants
                    .get(code)
                    .map(|value| ConstantRecord::new(code.clone(), value.clone()))
            })
            .collect())
    }
}

// ============================================
// REST
// ============================================

/// A REST invocation assembled by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: String,
    pub url: String,
    pub body: Option<Value>,
    pub headers: Option<Value>,
    pub timeout: Duration,
}

/// REST client behind the `rest_*` functions.
///
/// Contract: `call` never fails. Transport errors, timeouts and non-2xx
/// statuses all surface through the returned result map
/// (`{success, error, status, body, message}`). Implementations enforce the
/// per-request timeout themselves.
pub trait RestProvider: Send + Sync {
    fn call(&self, request: RestRequest) -> Value;
}

/// Build the uniform REST result map.
pub fn rest_result(
    success: bool,
    status: Option<i64>,
    body: Option<Value>,
    message: Option<String>,
) -> Value {
    let mut map = BTreeMap::new();
    map.insert("success".to_string(), Value::Bool(success));
    map.insert("error".to_string(), Value::Bool(!success));
    if let Some(status) = status {
        map.insert("status".to_string(), Value::from(status));
    }
    if let Some(body) = body {
        map.insert("body".to_string(), body);
    }
    if let Some(message) = message {
        map.insert("message".to_string(), Value::Text(message));
    }
    Value::Object(map)
}

/// Default REST provider: reports every call as failed. Engines that never
/// evaluate `rest_*` functions run fine on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestProvider;

impl RestProvider for NoRestProvider {
    fn call(&self, request: RestRequest) -> Value {
        tracing::warn!(method = %request.method, url = %request.url, "no REST provider configured");
        rest_result(
            false,
            None,
            None,
            Some("no REST provider configured".to_string()),
        )
    }
}

/// Canned-response provider keyed by `"METHOD url"`, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct StaticRestProvider {
    responses: BTreeMap<String, Value>,
}

impl StaticRestProvider {
    pub fn with(mut self, method: &str, url: &str, body: Value) -> Self {
        self.responses
            .insert(format!("{} {}", method.to_uppercase(), url), body);
        self
    }
}

impl RestProvider for StaticRestProvider {
    fn call(&self, request: RestRequest) -> Value {
        match self
            .responses
            .get(&format!("{} {}", request.method, request.url))
        {
            Some(body) => rest_result(true, Some(200), Some(body.clone()), None),
            None => rest_result(
                false,
                Some(404),
                None,
                Some(format!("no canned response for {} {}", request.method, request.url)),
            ),
        }
    }
}

// ============================================
// JSON path
// ============================================

/// Resolver behind the `json_*` functions and `expr[index]` navigation.
pub trait JsonPathProvider: Send + Sync {
    fn get(&self, value: &Value, path: &str) -> Value;
    fn exists(&self, value: &Value, path: &str) -> bool;
    fn size(&self, value: &Value, path: &str) -> i64;
    fn type_of(&self, value: &Value, path: &str) -> String;
}

/// Built-in resolver for dotted paths with `[index]` steps, e.g.
/// `body.items[2].price`. A leading `$.` is accepted and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedPathProvider;

impl DottedPathProvider {
    fn resolve<'a>(&self, value: &'a Value, path: &str) -> Option<&'a Value> {
        let path = path.trim();
        let path = path.strip_prefix("$.").or_else(|| path.strip_prefix('$')).unwrap_or(path);

        let mut current = value;
        if path.is_empty() {
            return Some(current);
        }

        for segment in path.split('.') {
            if segment.is_empty() {
                return None;
            }
            let (field, indexes) = split_indexes(segment)?;
            if !field.is_empty() {
                match current {
                    Value::Object(map) => current = map.get(field)?,
                    _ => return None,
                }
            }
            for index in indexes {
                match current {
                    Value::List(items) => current = items.get(index)?,
                    _ => return None,
                }
            }
        }
        Some(current)
    }
}

/// Split `items[0][1]` into the field name and its index steps.
fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    match segment.find('[') {
        None => Some((segment, Vec::new())),
        Some(bracket) => {
            let field = &segment[..bracket];
            let mut indexes = Vec::new();
            let mut rest = &segment[bracket..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped.find(']')?;
                indexes.push(stripped[..close].trim().parse().ok()?);
                rest = &stripped[close + 1..];
            }
            if rest.is_empty() {
                Some((field, indexes))
            } else {
                None
            }
        }
    }
}

impl JsonPathProvider for DottedPathProvider {
    fn get(&self, value: &Value, path: &str) -> Value {
        self.resolve(value, path).cloned().unwrap_or(Value::Null)
    }

    fn exists(&self, value: &Value, path: &str) -> bool {
        self.resolve(value, path).is_some()
    }

    fn size(&self, value: &Value, path: &str) -> i64 {
        match self.resolve(value, path) {
            Some(Value::List(items)) => items.len() as i64,
            Some(Value::Object(map)) => map.len() as i64,
            Some(Value::Text(s)) => s.chars().count() as i64,
            Some(Value::Null) | None => 0,
            Some(_) => 1,
        }
    }

    fn type_of(&self, value: &Value, path: &str) -> String {
        match self.resolve(value, path) {
            Some(v) => v.type_name().to_string(),
            None => "null".to_string(),
        }
    }
}

// ============================================
// Clock
// ============================================

/// Time source, injected so date/time functions are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned time for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
