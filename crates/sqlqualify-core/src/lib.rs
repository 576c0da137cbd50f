//! sqlqualify-core: unqualified column reference detection
//!
//! This library flags column references that do not name their source in
//! SELECT statements reading from more than one table or view.

pub mod analyzer;
pub mod dialect;
pub mod error;
pub mod extract;
pub mod lint;

pub use analyzer::Analyzer;
pub use dialect::SqlDialect;
pub use error::{Diagnostic, DiagnosticKind, Severity, Span, UnknownDialect};
pub use extract::{extract_statement, SelectFacts};
pub use lint::{
    is_qualified, scan, ColumnAliasInfo, ColumnReference, Qualification, RefId, TableAliasInfo,
    Violation,
};
