//! Expression walking - collects column references into the current select

use sqlparser::ast::{
    Expr, FunctionArg, FunctionArgExpr, FunctionArgumentClause, FunctionArguments, Ident,
    OrderByExpr, Subscript, WindowSpec, WindowType,
};

use super::{FactExtractor, SelectFacts};
use crate::error::Span;
use crate::lint::ColumnReference;

impl FactExtractor {
    /// Record every column reference in `expr` against `facts`.
    ///
    /// Subqueries open their own scope and are recorded separately.
    pub(super) fn visit_expr(&mut self, expr: &Expr, facts: &mut SelectFacts) {
        match expr {
            Expr::Identifier(ident) => {
                self.push_reference(facts, |id| {
                    ColumnReference::unqualified(id, ident.value.clone())
                        .with_span(Span::from_sqlparser(&ident.span))
                });
            }
            Expr::CompoundIdentifier(idents) => {
                if let Some((raw, span)) = compound_reference(idents) {
                    self.push_reference(facts, |id| {
                        ColumnReference::qualified(id, raw).with_span(span)
                    });
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                self.visit_expr(left, facts);
                self.visit_expr(right, facts);
            }
            Expr::UnaryOp { expr, .. } => self.visit_expr(expr, facts),
            Expr::Nested(inner) => self.visit_expr(inner, facts),
            Expr::Function(func) => {
                self.visit_function_args_list(&func.args, facts);
                // `WITHIN GROUP (ORDER BY ...)`
                self.visit_order_by(&func.within_group, facts);
                if let Some(filter) = &func.filter {
                    self.visit_expr(filter, facts);
                }
                // `OVER w` names a window declared in the WINDOW clause
                if let Some(WindowType::WindowSpec(spec)) = &func.over {
                    self.visit_window_spec(spec, facts);
                }
            }
            Expr::InList { expr, list, .. } => {
                self.visit_expr(expr, facts);
                for e in list {
                    self.visit_expr(e, facts);
                }
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.visit_expr(expr, facts);
                self.visit_query(subquery);
            }
            Expr::InUnnest {
                expr, array_expr, ..
            } => {
                self.visit_expr(expr, facts);
                self.visit_expr(array_expr, facts);
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.visit_expr(expr, facts);
                self.visit_expr(low, facts);
                self.visit_expr(high, facts);
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(op) = operand {
                    self.visit_expr(op, facts);
                }
                // WHEN/THEN pairs in source order
                for (cond, result) in conditions.iter().zip(results) {
                    self.visit_expr(cond, facts);
                    self.visit_expr(result, facts);
                }
                if let Some(else_r) = else_result {
                    self.visit_expr(else_r, facts);
                }
            }
            Expr::Subquery(query) | Expr::Exists { subquery: query, .. } => {
                self.visit_query(query);
            }
            Expr::IsNull(e)
            | Expr::IsNotNull(e)
            | Expr::IsTrue(e)
            | Expr::IsFalse(e)
            | Expr::IsNotTrue(e)
            | Expr::IsNotFalse(e)
            | Expr::IsUnknown(e)
            | Expr::IsNotUnknown(e) => self.visit_expr(e, facts),
            Expr::Convert { expr, styles, .. } => {
                self.visit_expr(expr, facts);
                for style in styles {
                    self.visit_expr(style, facts);
                }
            }
            Expr::Cast { expr, .. }
            | Expr::CompositeAccess { expr, .. }
            | Expr::Extract { expr, .. }
            | Expr::Collate { expr, .. }
            | Expr::Ceil { expr, .. }
            | Expr::Floor { expr, .. } => self.visit_expr(expr, facts),
            Expr::Substring {
                expr,
                substring_from,
                substring_for,
                ..
            } => {
                self.visit_expr(expr, facts);
                if let Some(from) = substring_from {
                    self.visit_expr(from, facts);
                }
                if let Some(for_expr) = substring_for {
                    self.visit_expr(for_expr, facts);
                }
            }
            Expr::Trim {
                expr, trim_what, ..
            } => {
                if let Some(what) = trim_what {
                    self.visit_expr(what, facts);
                }
                self.visit_expr(expr, facts);
            }
            Expr::Position { expr, r#in } => {
                self.visit_expr(expr, facts);
                self.visit_expr(r#in, facts);
            }
            Expr::Like { expr, pattern, .. }
            | Expr::ILike { expr, pattern, .. }
            | Expr::SimilarTo { expr, pattern, .. }
            | Expr::RLike { expr, pattern, .. } => {
                self.visit_expr(expr, facts);
                self.visit_expr(pattern, facts);
            }
            Expr::JsonAccess { value, .. } => self.visit_expr(value, facts),
            Expr::MapAccess { column, keys } => {
                self.visit_expr(column, facts);
                for key in keys {
                    self.visit_expr(&key.key, facts);
                }
            }
            Expr::AnyOp { left, right, .. } | Expr::AllOp { left, right, .. } => {
                self.visit_expr(left, facts);
                self.visit_expr(right, facts);
            }
            Expr::AtTimeZone {
                timestamp,
                time_zone,
            } => {
                self.visit_expr(timestamp, facts);
                self.visit_expr(time_zone, facts);
            }
            Expr::Overlay {
                expr,
                overlay_what,
                overlay_from,
                overlay_for,
            } => {
                self.visit_expr(expr, facts);
                self.visit_expr(overlay_what, facts);
                self.visit_expr(overlay_from, facts);
                if let Some(for_expr) = overlay_for {
                    self.visit_expr(for_expr, facts);
                }
            }
            Expr::IsDistinctFrom(a, b) | Expr::IsNotDistinctFrom(a, b) => {
                self.visit_expr(a, facts);
                self.visit_expr(b, facts);
            }
            Expr::Tuple(exprs) => {
                for e in exprs {
                    self.visit_expr(e, facts);
                }
            }
            Expr::Array(arr) => {
                for e in &arr.elem {
                    self.visit_expr(e, facts);
                }
            }
            Expr::Interval(interval) => self.visit_expr(&interval.value, facts),
            Expr::Subscript { expr, subscript } => {
                self.visit_expr(expr, facts);
                match subscript.as_ref() {
                    Subscript::Index { index } => self.visit_expr(index, facts),
                    Subscript::Slice {
                        lower_bound,
                        upper_bound,
                        stride,
                    } => {
                        for bound in [lower_bound, upper_bound, stride].into_iter().flatten() {
                            self.visit_expr(bound, facts);
                        }
                    }
                }
            }
            Expr::Method(method) => {
                self.visit_expr(&method.expr, facts);
                for func in &method.method_chain {
                    self.visit_function_args_list(&func.args, facts);
                }
            }
            Expr::GroupingSets(sets) | Expr::Cube(sets) | Expr::Rollup(sets) => {
                for e in sets.iter().flatten() {
                    self.visit_expr(e, facts);
                }
            }
            // Literals, wildcards, placeholders and the like name no column
            _ => {}
        }
    }

    pub(super) fn visit_function_args_list(
        &mut self,
        args: &FunctionArguments,
        facts: &mut SelectFacts,
    ) {
        match args {
            FunctionArguments::List(arg_list) => {
                for arg in &arg_list.args {
                    self.visit_function_arg(arg, facts);
                }
                // `string_agg(x, ',' ORDER BY y)`, `array_agg(x LIMIT n)`
                for clause in &arg_list.clauses {
                    match clause {
                        FunctionArgumentClause::OrderBy(order_by) => {
                            self.visit_order_by(order_by, facts)
                        }
                        FunctionArgumentClause::Limit(limit) => self.visit_expr(limit, facts),
                        _ => {}
                    }
                }
            }
            FunctionArguments::Subquery(query) => self.visit_query(query),
            FunctionArguments::None => {}
        }
    }

    pub(super) fn visit_window_spec(&mut self, spec: &WindowSpec, facts: &mut SelectFacts) {
        for e in &spec.partition_by {
            self.visit_expr(e, facts);
        }
        self.visit_order_by(&spec.order_by, facts);
    }

    pub(super) fn visit_order_by(&mut self, order_by: &[OrderByExpr], facts: &mut SelectFacts) {
        for ob in order_by {
            self.visit_expr(&ob.expr, facts);
        }
    }

    pub(super) fn visit_function_arg(&mut self, arg: &FunctionArg, facts: &mut SelectFacts) {
        let arg_expr = match arg {
            FunctionArg::Unnamed(arg) => arg,
            FunctionArg::Named { arg, .. } | FunctionArg::ExprNamed { arg, .. } => arg,
        };
        // `count(*)` and `count(t.*)` are not column references
        if let FunctionArgExpr::Expr(e) = arg_expr {
            self.visit_expr(e, facts);
        }
    }
}

/// Raw text and span of a dotted reference (`t.col`, `s.t.col`)
fn compound_reference(idents: &[Ident]) -> Option<(String, Span)> {
    let first = idents.first()?;
    let last = idents.last()?;
    let raw = idents
        .iter()
        .map(|i| i.value.as_str())
        .collect::<Vec<_>>()
        .join(".");
    let span = Span::from_sqlparser(&first.span).cover(Span::from_sqlparser(&last.span));
    Some((raw, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_statement;
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn refs_in_where(predicate: &str) -> Vec<String> {
        let sql = format!("SELECT 1 FROM foo, bar WHERE {predicate}");
        let statements = Parser::parse_sql(&GenericDialect {}, &sql).unwrap();
        let facts = extract_statement(&statements[0]);
        facts[0].references.iter().map(|r| r.raw.clone()).collect()
    }

    #[test]
    fn test_case_in_source_order() {
        assert_eq!(
            refs_in_where("CASE WHEN a > 1 THEN b WHEN c THEN d ELSE e END = 1"),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn test_function_args_and_window() {
        assert_eq!(
            refs_in_where("coalesce(a, foo.b) > max(c) OVER (PARTITION BY d ORDER BY e)"),
            vec!["a", "foo.b", "c", "d", "e"]
        );
    }

    #[test]
    fn test_count_star_has_no_reference() {
        assert!(refs_in_where("count(*) > 0").is_empty());
    }

    #[test]
    fn test_between_and_in_list() {
        assert_eq!(
            refs_in_where("a BETWEEN b AND c AND d IN (e, 1)"),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn test_exists_subquery_not_attributed_to_outer() {
        assert_eq!(
            refs_in_where("EXISTS (SELECT x FROM baz WHERE baz.id = foo.id) AND y = 1"),
            vec!["y"]
        );
    }

    #[test]
    fn test_aggregate_ordering_clauses() {
        assert_eq!(
            refs_in_where(
                "string_agg(a, ',' ORDER BY b) = percentile_cont(0.5) WITHIN GROUP (ORDER BY c)"
            ),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_three_part_reference_is_qualified() {
        let sql = "SELECT s.t.c FROM s.t, u";
        let statements = Parser::parse_sql(&GenericDialect {}, sql).unwrap();
        let facts = extract_statement(&statements[0]);
        assert_eq!(facts[0].references[0].raw, "s.t.c");
        assert!(facts[0].references[0].is_qualified());
    }
}
