//! Verdict - YAML-defined rules engine for business decisioning
//!
//! A rule document declares inputs, references named constants, lists one or
//! more sub-rules with when/then/else blocks, and declares outputs. The engine
//! evaluates the document against a map of input values and produces a map of
//! output values plus metadata (success flag, condition outcome, circuit
//! breaker state, timing, warnings).
//!
//! # Architecture Overview
//!
//! ```text
//! YAML text
//!      |
//!   Document parse -> RuleDocument (cached by text)
//!      |
//!   Expression lexer/parser -> Expr / Condition / Action AST
//!      |
//!   Constant scan -> async fetch (merged with inline defaults)
//!      |
//!   Sub-rule sequencer -> condition evaluation + action execution
//!      |
//!   Output projection -> EvaluationResult
//! ```

pub mod ast;
pub mod constants;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod providers;
pub mod token;
pub mod value;

// Re-export main types
pub use context::{EvaluationContext, VariableSource};
pub use document::{CircuitBreakerConfig, RuleDocument, SubRule};
pub use engine::{Engine, EngineConfig, EvaluationResult};
pub use error::{Diagnostic, Error, ErrorCode, Result};
pub use location::SourceLocation;
pub use providers::{
    Clock, ConstantProvider, ConstantRecord, JsonPathProvider, RestProvider, RestRequest,
};
pub use value::Value;
