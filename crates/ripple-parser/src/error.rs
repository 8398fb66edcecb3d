//! Parse error types for the Ripple parser.

use std::fmt;

use ripple_common::span::{LineIndex, Span};

/// A parse error with location information.
///
/// The primary location is a byte span; callers that need the classic
/// `(line_begin, col_begin, line_end, col_end)` shape convert through a
/// [`LineIndex`] with [`ParseError::line_cols`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the error was detected.
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// The error location as 1-based `(line_begin, col_begin, line_end,
    /// col_end)`.
    pub fn line_cols(&self, index: &LineIndex) -> (u32, u32, u32, u32) {
        let (lb, cb) = index.line_col(self.span.start);
        let (le, ce) = index.line_col(self.span.end);
        (lb, cb, le, ce)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_new() {
        let err = ParseError::new("expected an expression", Span::new(5, 10));
        assert_eq!(err.message, "expected an expression");
        assert_eq!(err.span, Span::new(5, 10));
    }

    #[test]
    fn parse_error_line_cols() {
        let index = LineIndex::new("const x;\nconst y = ;\n");
        let err = ParseError::new("expected an expression", Span::new(19, 20));
        assert_eq!(err.line_cols(&index), (2, 11, 2, 12));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::new("unexpected token", Span::new(0, 1));
        assert_eq!(err.to_string(), "unexpected token");
    }
}
