//! Source locations and parse diagnostics.

use std::fmt;

/// A span in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// Byte offset of the span start
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in bytes
    pub column: usize,
    /// Span length in bytes
    pub size: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// A non-fatal syntax problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(":{}:{}: {message}", location.line, location.column)]
pub struct Diagnostic {
    /// Where the problem was found
    pub location: Location,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic
    #[must_use]
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}
