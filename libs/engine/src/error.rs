//! Error types for the rules engine

use crate::location::SourceLocation;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors: these short-circuit an evaluation with `success = false`.
///
/// Runtime recoveries (division by zero, unknown functions, type mismatches)
/// are not errors; they are recorded as [`Diagnostic`]s and evaluation
/// continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid rule document: {0}")]
    YamlStructure(String),

    #[error("{kind}: {message} at {location}")]
    ExprParse {
        kind: ParseErrorKind,
        message: String,
        location: SourceLocation,
    },

    #[error("Invalid action: {message} at {location}")]
    ActionParse {
        message: String,
        location: SourceLocation,
    },

    #[error("Required constants not found in database and no default values provided: {}", missing.join(", "))]
    ConstantMissing { missing: Vec<String> },

    #[error("Constant provider failed: {0}")]
    Provider(String),
}

impl Error {
    pub fn expr_parse(
        kind: ParseErrorKind,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self::ExprParse {
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn action_parse(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::ActionParse {
            message: message.into(),
            location,
        }
    }

    /// Error category surfaced to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::YamlStructure(_) => ErrorCode::YamlStructure,
            Self::ExprParse { .. } => ErrorCode::ExprParse,
            Self::ActionParse { .. } => ErrorCode::ActionParse,
            Self::ConstantMissing { .. } => ErrorCode::ConstantMissing,
            Self::Provider(_) => ErrorCode::ConstantMissing,
        }
    }
}

/// Narrow category attached to expression parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    MissingRParen,
    MissingRBracket,
    InvalidLiteral,
    TooDeeplyNested,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "EXPR_UNEXPECTED_TOKEN",
            Self::UnexpectedEof => "EXPR_UNEXPECTED_EOF",
            Self::MissingRParen => "EXPR_MISSING_RPAREN",
            Self::MissingRBracket => "EXPR_MISSING_RBRACKET",
            Self::InvalidLiteral => "EXPR_INVALID_LITERAL",
            Self::TooDeeplyNested => "EXPR_TOO_DEEPLY_NESTED",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error and warning categories surfaced in results and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    YamlStructure,
    ExprParse,
    ActionParse,
    NamingConvention,
    ConstantMissing,
    TypeMismatch,
    DivisionByZero,
    FunctionUnknown,
    RestFailure,
    CircuitBreaker,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YamlStructure => "YAML_STRUCTURE",
            Self::ExprParse => "EXPR_PARSE",
            Self::ActionParse => "ACTION_PARSE",
            Self::NamingConvention => "NAMING_CONVENTION",
            Self::ConstantMissing => "CONSTANT_MISSING",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::DivisionByZero => "DIVISION_BY_ZERO",
            Self::FunctionUnknown => "FUNCTION_UNKNOWN",
            Self::RestFailure => "REST_FAILURE",
            Self::CircuitBreaker => "CIRCUIT_BREAKER",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning collected during parsing or evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(code: ErrorCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            code,
            message: message.into(),
            location: Some(location),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "[{}] {} ({})", self.code, self.message, loc),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}
