//! Error and diagnostic types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from start of source (0 when only line/column is known)
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
    /// Line number (1-indexed, 0 if unknown)
    pub line: usize,
    /// Column number (1-indexed, 0 if unknown)
    pub column: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            line: 0,
            column: 0,
        }
    }

    /// Create a span with line and column information
    pub fn with_location(line: usize, column: usize, length: usize) -> Self {
        Self {
            offset: 0,
            length,
            line,
            column,
        }
    }

    /// Create a span from sqlparser's Span
    pub fn from_sqlparser(span: &sqlparser::tokenizer::Span) -> Self {
        let start = span.start;
        let end = span.end;
        let length = if end.line == start.line && end.column > start.column {
            end.column as usize - start.column as usize
        } else {
            1
        };
        Self::with_location(start.line as usize, start.column as usize, length)
    }

    /// Smallest span covering both `self` and `other` on the same line.
    ///
    /// Spans on different lines keep `self`'s start and length.
    pub fn cover(self, other: Span) -> Span {
        if self.line != other.line || self.line == 0 {
            return self;
        }
        let start = self.column.min(other.column);
        let end = (self.column + self.length).max(other.column + other.length);
        Span::with_location(self.line, start, end - start)
    }

    /// Whether this span carries a usable line/column position
    pub fn is_located(&self) -> bool {
        self.line > 0
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Diagnostic message for SQL analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
    pub labels: Vec<Label>,
}

/// Label for source annotations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_severity(kind, Severity::Error, message)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_severity(kind, Severity::Warning, message)
    }

    fn with_severity(kind: DiagnosticKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            span: None,
            help: None,
            labels: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_label(mut self, message: impl Into<String>, span: Span) -> Self {
        self.labels.push(Label {
            message: message.into(),
            span,
        });
        self
    }

    /// Get the diagnostic code string (e.g., "Q0001")
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Types of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Q0001: Unqualified column reference in a multi-table SELECT
    UnqualifiedReference,
    /// Parse error
    ParseError,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::UnqualifiedReference => "Q0001",
            DiagnosticKind::ParseError => "E1000",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::UnqualifiedReference => "unqualified-reference",
            DiagnosticKind::ParseError => "parse-error",
        }
    }
}

/// Error returned when a dialect name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown dialect: '{name}'. Supported dialects: {supported}.")]
pub struct UnknownDialect {
    pub name: String,
    pub supported: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DiagnosticKind::UnqualifiedReference.code(), "Q0001");
        assert_eq!(DiagnosticKind::ParseError.code(), "E1000");
        assert_eq!(
            DiagnosticKind::UnqualifiedReference.name(),
            "unqualified-reference"
        );
    }

    #[test]
    fn test_span_cover_same_line() {
        let a = Span::with_location(1, 8, 3);
        let b = Span::with_location(1, 12, 2);
        assert_eq!(a.cover(b), Span::with_location(1, 8, 6));
    }

    #[test]
    fn test_span_cover_different_lines_keeps_start() {
        let a = Span::with_location(1, 8, 3);
        let b = Span::with_location(2, 1, 2);
        assert_eq!(a.cover(b), a);
    }

    #[test]
    fn test_diagnostic_builder() {
        let span = Span::with_location(3, 5, 2);
        let diag = Diagnostic::warning(DiagnosticKind::UnqualifiedReference, "msg")
            .with_span(span)
            .with_help("help")
            .with_label("here", span);
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.span, Some(span));
        assert_eq!(diag.help.as_deref(), Some("help"));
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.code(), "Q0001");
    }
}
