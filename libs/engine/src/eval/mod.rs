//! Evaluation: expression visitor, condition visitor and action executor
//!
//! One `Evaluator` walks all three AST families against a mutable
//! [`EvaluationContext`]. Evaluation is forgiving by design: runtime problems
//! (division by zero, unknown functions, type mismatches) become diagnostics
//! and `Null` results rather than errors, and action execution is
//! best-effort except for the circuit breaker, which stops the run.

pub mod condition;
pub mod executor;
pub mod expression;
pub mod functions;

use crate::context::EvaluationContext;
use crate::engine::EngineConfig;

/// AST visitor over a single evaluation's context.
pub struct Evaluator<'a> {
    pub(crate) ctx: &'a mut EvaluationContext,
    pub(crate) config: &'a EngineConfig,
    /// From the document's circuit breaker config; when false,
    /// `circuit_breaker` actions log instead of halting.
    pub(crate) circuit_breaker_enabled: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a mut EvaluationContext, config: &'a EngineConfig) -> Self {
        Self {
            ctx,
            config,
            circuit_breaker_enabled: true,
        }
    }

    pub fn with_circuit_breaker(mut self, enabled: bool) -> Self {
        self.circuit_breaker_enabled = enabled;
        self
    }
}
