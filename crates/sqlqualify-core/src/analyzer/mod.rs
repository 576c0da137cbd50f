//! SQL analyzer module

use sqlparser::ast::Statement;
use sqlparser::parser::Parser;
use tracing::debug;

use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, DiagnosticKind, Span};
use crate::extract::{extract_statement, SelectFacts};
use crate::lint::scan;

/// SQL Analyzer - flags unqualified column references in multi-table selects
#[derive(Debug, Default)]
pub struct Analyzer {
    dialect: SqlDialect,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            diagnostics: Vec::new(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Analyze SQL text and return diagnostics
    pub fn analyze(&mut self, sql: &str) -> Vec<Diagnostic> {
        self.diagnostics.clear();

        let statements = match self.parse(sql) {
            Ok(stmts) => stmts,
            Err(diag) => {
                self.diagnostics.push(diag);
                return std::mem::take(&mut self.diagnostics);
            }
        };

        for stmt in &statements {
            for facts in extract_statement(stmt) {
                self.check_select(&facts);
            }
        }

        // Selects are visited outermost first; report in text order instead.
        self.diagnostics.sort_by_key(source_position);
        std::mem::take(&mut self.diagnostics)
    }

    /// Extract per-select facts without running the check
    pub fn analyze_facts(&self, sql: &str) -> Result<Vec<SelectFacts>, Diagnostic> {
        let statements = self.parse(sql)?;
        Ok(statements.iter().flat_map(extract_statement).collect())
    }

    fn parse(&self, sql: &str) -> Result<Vec<Statement>, Diagnostic> {
        let dialect = self.dialect.parser_dialect();
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
            Diagnostic::error(DiagnosticKind::ParseError, format!("Parse error: {}", e))
                .with_span(Span::new(0, sql.len().min(50)))
        })
    }

    fn check_select(&mut self, facts: &SelectFacts) {
        let Some(violations) = scan(
            &facts.table_aliases,
            &facts.standalone_aliases,
            &facts.references,
            &facts.col_aliases,
            &facts.using_cols,
            Some(self.dialect),
        ) else {
            return;
        };

        debug!(
            sources = facts.table_aliases.len(),
            violations = violations.len(),
            "unqualified references found"
        );
        self.diagnostics.extend(
            violations
                .into_iter()
                .map(|violation| violation.into_diagnostic(&facts.table_aliases)),
        );
    }
}

/// Sort key placing diagnostics without a location last
fn source_position(diag: &Diagnostic) -> (usize, usize) {
    match diag.span {
        Some(span) if span.is_located() => (span.line, span.column),
        _ => (usize::MAX, usize::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_table_select() {
        let mut analyzer = Analyzer::new();

        let diagnostics = analyzer.analyze("SELECT id, name FROM users");
        assert!(
            diagnostics.is_empty(),
            "Expected no findings: {:?}",
            diagnostics
        );
    }

    #[test]
    fn test_unqualified_in_join() {
        let mut analyzer = Analyzer::new();

        let diagnostics =
            analyzer.analyze("SELECT a, b FROM foo LEFT JOIN vee ON vee.a = foo.a");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::UnqualifiedReference));
        assert!(diagnostics[0].message.contains("'a'"));
        assert!(diagnostics[1].message.contains("'b'"));
    }

    #[test]
    fn test_qualified_join() {
        let mut analyzer = Analyzer::new();

        let diagnostics =
            analyzer.analyze("SELECT foo.a, vee.b FROM foo LEFT JOIN vee ON vee.a = foo.a");
        assert!(
            diagnostics.is_empty(),
            "Expected no findings when qualified: {:?}",
            diagnostics
        );
    }

    #[test]
    fn test_parse_error() {
        let mut analyzer = Analyzer::new();

        let diagnostics = analyzer.analyze("SELECT FROM WHERE");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ParseError);
    }

    #[test]
    fn test_finding_has_span_and_help() {
        let mut analyzer = Analyzer::new();

        let diagnostics = analyzer.analyze("SELECT bad FROM users u, orders o");
        assert_eq!(diagnostics.len(), 1);
        let span = diagnostics[0].span.expect("finding should carry a span");
        assert_eq!((span.line, span.column), (1, 8));
        assert_eq!(
            diagnostics[0].help.as_deref(),
            Some("Qualify 'bad' with one of: u, o")
        );
    }

    #[test]
    fn test_finding_labels_point_at_sources() {
        let mut analyzer = Analyzer::new();

        let diagnostics = analyzer.analyze("SELECT bad FROM users u, orders o");
        let labels: Vec<(&str, usize)> = diagnostics[0]
            .labels
            .iter()
            .map(|l| (l.message.as_str(), l.span.column))
            .collect();
        assert_eq!(labels, vec![("source 'u'", 23), ("source 'o'", 33)]);
    }

    #[test]
    fn test_unlocated_diagnostics_sort_last() {
        let located = Diagnostic::warning(DiagnosticKind::UnqualifiedReference, "a")
            .with_span(Span::with_location(3, 1, 1));
        let unlocated = Diagnostic::warning(DiagnosticKind::UnqualifiedReference, "b");
        assert!(source_position(&located) < source_position(&unlocated));
    }

    #[test]
    fn test_analyzer_is_reusable() {
        let mut analyzer = Analyzer::new();

        let first = analyzer.analyze("SELECT a FROM foo, bar");
        let second = analyzer.analyze("SELECT a FROM foo");
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_analyze_facts() {
        let analyzer = Analyzer::with_dialect(SqlDialect::Redshift);

        let facts = analyzer
            .analyze_facts("SELECT o FROM customer_orders c, c.c_orders o")
            .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].source_names(), vec!["c", "o"]);
    }
}
