//! Source locations for diagnostics
//!
//! Every AST node carries the line/column at which it started inside the
//! expression or action line it was parsed from.

use serde::Serialize;
use std::fmt;

/// Line/column position of a parsed construct, with an optional snippet of
/// the source line for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            snippet: None,
        }
    }

    pub fn with_snippet(line: usize, column: usize, snippet: impl Into<String>) -> Self {
        Self {
            line,
            column,
            snippet: Some(snippet.into()),
        }
    }

    /// Location for constructs that have no meaningful source position
    /// (values injected programmatically, structured YAML condition blocks).
    pub fn synthetic() -> Self {
        Self::new(0, 0)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::synthetic()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
