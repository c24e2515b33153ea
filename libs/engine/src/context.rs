//! Evaluation context
//!
//! Holds the three-tier scope (computed > input > constant), the metadata of
//! the running evaluation and the circuit breaker state. A context lives for
//! exactly one evaluation; the engine itself is safe for concurrent
//! evaluations because each gets its own context.

use crate::error::{Diagnostic, ErrorCode};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Which scope a name resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSource {
    Computed,
    Input,
    Constant,
    NotFound,
}

impl VariableSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Computed => "computed",
            Self::Input => "input",
            Self::Constant => "constant",
            Self::NotFound => "not_found",
        }
    }
}

/// Per-evaluation mutable state.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    inputs: BTreeMap<String, Value>,
    constants: BTreeMap<String, Value>,
    computed: BTreeMap<String, Value>,
    pub start_time: DateTime<Utc>,
    pub operation_id: String,
    circuit_breaker_triggered: bool,
    circuit_breaker_message: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl EvaluationContext {
    pub fn new(start_time: DateTime<Utc>, operation_id: impl Into<String>) -> Self {
        Self {
            inputs: BTreeMap::new(),
            constants: BTreeMap::new(),
            computed: BTreeMap::new(),
            start_time,
            operation_id: operation_id.into(),
            circuit_breaker_triggered: false,
            circuit_breaker_message: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn set_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    pub fn set_constant(&mut self, name: impl Into<String>, value: Value) {
        self.constants.insert(name.into(), value);
    }

    /// Write a computed variable. Empty names are rejected with a warning.
    pub fn set_computed(&mut self, name: &str, value: Value) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.add_diagnostic(Diagnostic::new(
                ErrorCode::NamingConvention,
                "cannot set a variable with an empty name",
            ));
            return false;
        }
        self.computed.insert(name.to_string(), value);
        true
    }

    pub fn remove_computed(&mut self, name: &str) -> Option<Value> {
        self.computed.remove(name)
    }

    pub fn remove_input(&mut self, name: &str) -> Option<Value> {
        self.inputs.remove(name)
    }

    /// Resolve a name in priority order; absent names are `Null`.
    pub fn get(&self, name: &str) -> Value {
        self.lookup(name).cloned().unwrap_or(Value::Null)
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let name = name.trim();
        self.computed
            .get(name)
            .or_else(|| self.inputs.get(name))
            .or_else(|| self.constants.get(name))
    }

    /// Which scope a name currently resolves from, for diagnostics.
    pub fn source_of(&self, name: &str) -> VariableSource {
        let name = name.trim();
        if self.computed.contains_key(name) {
            VariableSource::Computed
        } else if self.inputs.contains_key(name) {
            VariableSource::Input
        } else if self.constants.contains_key(name) {
            VariableSource::Constant
        } else {
            VariableSource::NotFound
        }
    }

    pub fn computed(&self) -> &BTreeMap<String, Value> {
        &self.computed
    }

    /// Deep clone for speculative evaluation.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    // ============================================
    // Circuit breaker
    // ============================================

    pub fn trigger_circuit_breaker(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(operation_id = %self.operation_id, message = %message, "circuit breaker triggered");
        self.circuit_breaker_triggered = true;
        self.circuit_breaker_message = Some(message);
    }

    pub fn circuit_breaker_triggered(&self) -> bool {
        self.circuit_breaker_triggered
    }

    pub fn circuit_breaker_message(&self) -> Option<&str> {
        self.circuit_breaker_message.as_deref()
    }

    // ============================================
    // Diagnostics
    // ============================================

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            operation_id = %self.operation_id,
            code = %diagnostic.code,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// True when a diagnostic with the given code was recorded at or after
    /// `mark` (a prior [`Self::diagnostic_count`] snapshot).
    pub fn diagnostic_since(&self, mark: usize, code: ErrorCode) -> bool {
        self.diagnostics[mark..].iter().any(|d| d.code == code)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new(Utc::now(), uuid::Uuid::new_v4().to_string())
    }
}
