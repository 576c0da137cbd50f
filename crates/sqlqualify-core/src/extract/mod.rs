//! Fact extraction - turns a parsed statement into per-SELECT facts
//!
//! Every `SELECT` found in a statement (top level, CTE bodies, set operation
//! branches, derived tables, expression subqueries) gets its own
//! [`SelectFacts`]. References are attributed to the innermost SELECT that
//! contains them; a nested subquery never contributes to its parent.

mod expr;

use indexmap::IndexSet;
use serde::Serialize;
use sqlparser::ast::{
    Distinct, GroupByExpr, Ident, JoinConstraint, JoinOperator, NamedWindowDefinition,
    NamedWindowExpr, ObjectName, OrderByExpr, PivotValueSource, Query, Select, SelectItem,
    SetExpr, Statement, TableAlias, TableFactor, TableWithJoins, Values,
};

use crate::error::Span;
use crate::lint::{ColumnAliasInfo, ColumnReference, RefId, SourceKind, TableAliasInfo};

/// Everything the unqualified-reference check needs to know about one SELECT
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectFacts {
    pub table_aliases: Vec<TableAliasInfo>,
    pub standalone_aliases: Vec<String>,
    pub references: Vec<ColumnReference>,
    pub col_aliases: Vec<ColumnAliasInfo>,
    pub using_cols: IndexSet<String>,
}

impl SelectFacts {
    /// Names usable as qualifiers in this select, in FROM order
    pub fn source_names(&self) -> Vec<&str> {
        self.table_aliases
            .iter()
            .map(|t| t.ref_str.as_str())
            .collect()
    }
}

/// Extract facts for every SELECT in `stmt`, outermost first.
pub fn extract_statement(stmt: &Statement) -> Vec<SelectFacts> {
    let mut extractor = FactExtractor::new();
    extractor.visit_statement(stmt);
    extractor.into_selects()
}

/// Walks a statement and collects [`SelectFacts`]
#[derive(Debug, Default)]
pub struct FactExtractor {
    next_ref: usize,
    selects: Vec<SelectFacts>,
}

impl FactExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_selects(self) -> Vec<SelectFacts> {
        self.selects
    }

    pub fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Query(query) => self.visit_query(query),
            Statement::Insert(insert) => {
                if let Some(source) = &insert.source {
                    self.visit_query(source);
                }
            }
            Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                // UPDATE is not a SELECT; only subqueries inside it are scanned.
                let mut detached = SelectFacts::default();
                self.visit_table_with_joins(table, &mut detached);
                if let Some(from_table) = from {
                    self.visit_table_with_joins(from_table, &mut detached);
                }
                for assignment in assignments {
                    self.visit_expr(&assignment.value, &mut detached);
                }
                if let Some(where_expr) = selection {
                    self.visit_expr(where_expr, &mut detached);
                }
            }
            Statement::Delete(delete) => {
                let mut detached = SelectFacts::default();
                if let Some(where_expr) = &delete.selection {
                    self.visit_expr(where_expr, &mut detached);
                }
            }
            Statement::CreateView { query, .. } => self.visit_query(query),
            Statement::CreateTable(create) => {
                if let Some(query) = &create.query {
                    self.visit_query(query);
                }
            }
            _ => {}
        }
    }

    pub(super) fn visit_query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.visit_query(&cte.query);
            }
        }

        let order_by: &[OrderByExpr] = query
            .order_by
            .as_ref()
            .map(|ob| ob.exprs.as_slice())
            .unwrap_or_default();

        match query.body.as_ref() {
            // ORDER BY belongs to the select it sorts.
            SetExpr::Select(select) => self.visit_select(select, order_by),
            body => {
                self.visit_set_expr(body);
                // ORDER BY over a set operation sorts output columns, not sources.
                let mut detached = SelectFacts::default();
                for ob in order_by {
                    self.visit_expr(&ob.expr, &mut detached);
                }
            }
        }
    }

    fn visit_set_expr(&mut self, set_expr: &SetExpr) {
        match set_expr {
            SetExpr::Select(select) => self.visit_select(select, &[]),
            SetExpr::Query(query) => self.visit_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.visit_set_expr(left);
                self.visit_set_expr(right);
            }
            SetExpr::Values(Values { rows, .. }) => {
                let mut detached = SelectFacts::default();
                for row in rows {
                    for expr in row {
                        self.visit_expr(expr, &mut detached);
                    }
                }
            }
            SetExpr::Insert(stmt) | SetExpr::Update(stmt) => self.visit_statement(stmt),
            _ => {}
        }
    }

    fn visit_select(&mut self, select: &Select, order_by: &[OrderByExpr]) {
        // Reserve the slot first so outer selects precede their subqueries.
        let slot = self.selects.len();
        self.selects.push(SelectFacts::default());
        let mut facts = SelectFacts::default();

        if let Some(Distinct::On(exprs)) = &select.distinct {
            for expr in exprs {
                self.visit_expr(expr, &mut facts);
            }
        }

        for item in &select.projection {
            self.visit_select_item(item, &mut facts);
        }

        for table_with_joins in &select.from {
            self.visit_table_with_joins(table_with_joins, &mut facts);
        }

        // Hive `LATERAL VIEW explode(...) v`
        for view in &select.lateral_views {
            self.visit_expr(&view.lateral_view, &mut facts);
            let name = last_part(&view.lateral_view_name);
            let ref_str = name.map(|id| id.value.clone()).unwrap_or_default();
            let span = name.map(|id| Span::from_sqlparser(&id.span));
            push_source(&mut facts, ref_str, SourceKind::Function, span);
        }

        if let Some(prewhere) = &select.prewhere {
            self.visit_expr(prewhere, &mut facts);
        }

        if let Some(selection) = &select.selection {
            self.visit_expr(selection, &mut facts);
        }

        if let Some(connect_by) = &select.connect_by {
            self.visit_expr(&connect_by.condition, &mut facts);
            for relationship in &connect_by.relationships {
                self.visit_expr(relationship, &mut facts);
            }
        }

        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                self.visit_expr(expr, &mut facts);
            }
        }

        for expr in select
            .cluster_by
            .iter()
            .chain(&select.distribute_by)
            .chain(&select.sort_by)
        {
            self.visit_expr(expr, &mut facts);
        }

        if let Some(having) = &select.having {
            self.visit_expr(having, &mut facts);
        }

        if select.window_before_qualify {
            self.visit_named_windows(&select.named_window, &mut facts);
        }

        if let Some(qualify) = &select.qualify {
            self.visit_expr(qualify, &mut facts);
        }

        if !select.window_before_qualify {
            self.visit_named_windows(&select.named_window, &mut facts);
        }

        self.visit_order_by(order_by, &mut facts);

        tracing::trace!(
            sources = facts.table_aliases.len(),
            references = facts.references.len(),
            "extracted select facts"
        );
        self.selects[slot] = facts;
    }

    /// `WINDOW w AS (PARTITION BY ... ORDER BY ...)`
    fn visit_named_windows(&mut self, windows: &[NamedWindowDefinition], facts: &mut SelectFacts) {
        for NamedWindowDefinition(_, window) in windows {
            if let NamedWindowExpr::WindowSpec(spec) = window {
                self.visit_window_spec(spec, facts);
            }
        }
    }

    fn visit_select_item(&mut self, item: &SelectItem, facts: &mut SelectFacts) {
        match item {
            SelectItem::UnnamedExpr(expr) => self.visit_expr(expr, facts),
            SelectItem::ExprWithAlias { expr, alias } => {
                let start = facts.references.len();
                self.visit_expr(expr, facts);
                let ids = facts.references[start..].iter().map(|r| r.id);
                let info = ColumnAliasInfo::new(alias.value.clone(), ids);
                facts.col_aliases.push(info);
            }
            // `*` and `t.*` name no column.
            SelectItem::QualifiedWildcard(..) | SelectItem::Wildcard(_) => {}
        }
    }

    fn visit_table_with_joins(&mut self, table: &TableWithJoins, facts: &mut SelectFacts) {
        self.visit_table_factor(&table.relation, facts);

        for join in &table.joins {
            self.visit_table_factor(&join.relation, facts);
            self.visit_join_operator(&join.join_operator, facts);
        }
    }

    fn visit_join_operator(&mut self, join_op: &JoinOperator, facts: &mut SelectFacts) {
        use JoinOperator::*;

        let constraint = match join_op {
            Inner(c) | LeftOuter(c) | RightOuter(c) | FullOuter(c) | LeftSemi(c) | RightSemi(c)
            | LeftAnti(c) | RightAnti(c) | Semi(c) | Anti(c) => Some(c),
            AsOf {
                match_condition,
                constraint,
            } => {
                self.visit_expr(match_condition, facts);
                Some(constraint)
            }
            CrossJoin | CrossApply | OuterApply => None,
        };

        match constraint {
            Some(JoinConstraint::On(expr)) => self.visit_expr(expr, facts),
            Some(JoinConstraint::Using(columns)) => {
                facts
                    .using_cols
                    .extend(columns.iter().map(|c| c.value.clone()));
            }
            Some(JoinConstraint::Natural) | Some(JoinConstraint::None) | None => {}
        }
    }

    fn visit_table_factor(&mut self, factor: &TableFactor, facts: &mut SelectFacts) {
        match factor {
            TableFactor::Table {
                name, alias, args, ..
            } => {
                // `generate_series(...)`-style calls parse as tables with arguments
                let kind = if args.is_some() {
                    SourceKind::Function
                } else {
                    SourceKind::Table
                };
                let ref_str = alias_name(alias)
                    .or_else(|| last_part(name).map(|id| id.value.clone()))
                    .unwrap_or_default();
                let span = alias
                    .as_ref()
                    .map(|a| &a.name)
                    .or_else(|| last_part(name))
                    .map(|id| Span::from_sqlparser(&id.span));
                push_source(facts, ref_str, kind, span);
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                self.visit_query(subquery);
                push_standalone_source(facts, alias.as_ref(), None, SourceKind::Derived);
            }
            TableFactor::TableFunction { expr, alias, .. } => {
                self.visit_expr(expr, facts);
                push_standalone_source(facts, alias.as_ref(), None, SourceKind::Function);
            }
            TableFactor::Function {
                name, args, alias, ..
            } => {
                for arg in args {
                    self.visit_function_arg(arg, facts);
                }
                push_standalone_source(
                    facts,
                    alias.as_ref(),
                    last_part(name),
                    SourceKind::Function,
                );
            }
            TableFactor::UNNEST {
                alias, array_exprs, ..
            } => {
                for expr in array_exprs {
                    self.visit_expr(expr, facts);
                }
                push_standalone_source(facts, alias.as_ref(), None, SourceKind::Function);
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                self.visit_table_with_joins(table_with_joins, facts);
            }
            TableFactor::JsonTable {
                json_expr, alias, ..
            }
            | TableFactor::OpenJsonTable {
                json_expr, alias, ..
            } => {
                self.visit_expr(json_expr, facts);
                push_standalone_source(facts, alias.as_ref(), None, SourceKind::Function);
            }
            // The reshaping operators hide the inner table behind their own alias.
            // Their own expressions name the inner table's columns, so they are
            // walked outside this select.
            TableFactor::Pivot {
                table,
                aggregate_functions,
                value_source,
                default_on_null,
                alias,
                ..
            } => {
                let mut inner = SelectFacts::default();
                self.visit_table_factor(table, &mut inner);
                for aggregate in aggregate_functions {
                    self.visit_expr(&aggregate.expr, &mut inner);
                }
                if let PivotValueSource::Subquery(query) = value_source {
                    self.visit_query(query);
                }
                if let Some(default) = default_on_null {
                    self.visit_expr(default, &mut inner);
                }
                push_reshaped_source(facts, alias.as_ref(), inner);
            }
            TableFactor::Unpivot { table, alias, .. } => {
                let mut inner = SelectFacts::default();
                self.visit_table_factor(table, &mut inner);
                push_reshaped_source(facts, alias.as_ref(), inner);
            }
            TableFactor::MatchRecognize {
                table,
                partition_by,
                order_by,
                measures,
                symbols,
                alias,
                ..
            } => {
                let mut inner = SelectFacts::default();
                self.visit_table_factor(table, &mut inner);
                for expr in partition_by {
                    self.visit_expr(expr, &mut inner);
                }
                self.visit_order_by(order_by, &mut inner);
                for measure in measures {
                    self.visit_expr(&measure.expr, &mut inner);
                }
                for symbol in symbols {
                    self.visit_expr(&symbol.definition, &mut inner);
                }
                push_reshaped_source(facts, alias.as_ref(), inner);
            }
        }
    }

    pub(super) fn next_ref_id(&mut self) -> RefId {
        let id = RefId(self.next_ref);
        self.next_ref += 1;
        id
    }

    pub(super) fn push_reference(
        &mut self,
        facts: &mut SelectFacts,
        make: impl FnOnce(RefId) -> ColumnReference,
    ) {
        let id = self.next_ref_id();
        facts.references.push(make(id));
    }
}

fn push_source(facts: &mut SelectFacts, ref_str: String, kind: SourceKind, span: Option<Span>) {
    let mut info = TableAliasInfo::new(ref_str, kind);
    info.span = span;
    facts.table_aliases.push(info);
}

/// Register a source that is not a physical table.
///
/// Its alias (if any) is both a table alias and a standalone alias.
fn push_standalone_source(
    facts: &mut SelectFacts,
    alias: Option<&TableAlias>,
    fallback: Option<&Ident>,
    kind: SourceKind,
) {
    if let Some(a) = alias {
        facts.standalone_aliases.push(a.name.value.clone());
    }
    let named = alias.map(|a| &a.name).or(fallback);
    let ref_str = named.map(|id| id.value.clone()).unwrap_or_default();
    let span = named.map(|id| Span::from_sqlparser(&id.span));
    push_source(facts, ref_str, kind, span);
}

/// Register a `PIVOT`/`UNPIVOT`/`MATCH_RECOGNIZE` result.
///
/// With an alias the result is a single derived source; without one it keeps
/// the inner table's name.
fn push_reshaped_source(facts: &mut SelectFacts, alias: Option<&TableAlias>, inner: SelectFacts) {
    match alias {
        Some(_) => push_standalone_source(facts, alias, None, SourceKind::Derived),
        None => facts.table_aliases.extend(inner.table_aliases),
    }
}

fn alias_name(alias: &Option<TableAlias>) -> Option<String> {
    alias.as_ref().map(|a| a.name.value.clone())
}

fn last_part(name: &ObjectName) -> Option<&Ident> {
    name.0.last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Qualification;
    use pretty_assertions::assert_eq;
    use sqlparser::dialect::{
        HiveDialect, MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect, SnowflakeDialect,
    };
    use sqlparser::parser::Parser;

    fn facts_for(sql: &str) -> Vec<SelectFacts> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).unwrap();
        statements.iter().flat_map(extract_statement).collect()
    }

    fn raws(facts: &SelectFacts) -> Vec<&str> {
        facts.references.iter().map(|r| r.raw.as_str()).collect()
    }

    #[test]
    fn test_single_table() {
        let facts = facts_for("SELECT a, b FROM foo");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].source_names(), vec!["foo"]);
        assert_eq!(raws(&facts[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_join_sources_and_on_condition() {
        let facts = facts_for("SELECT a, b FROM foo LEFT JOIN vee ON vee.a = foo.a");
        assert_eq!(facts[0].source_names(), vec!["foo", "vee"]);
        assert_eq!(raws(&facts[0]), vec!["a", "b", "vee.a", "foo.a"]);
        let qualifications: Vec<_> = facts[0]
            .references
            .iter()
            .map(|r| r.qualification)
            .collect();
        assert_eq!(
            qualifications,
            vec![
                Qualification::Unqualified,
                Qualification::Unqualified,
                Qualification::Qualified,
                Qualification::Qualified
            ]
        );
    }

    #[test]
    fn test_aliases_replace_table_names() {
        let facts = facts_for("SELECT u.id FROM public.users AS u, orders");
        assert_eq!(facts[0].source_names(), vec!["u", "orders"]);
    }

    #[test]
    fn test_using_columns() {
        let facts = facts_for("SELECT id, name FROM foo JOIN bar USING (id, tenant)");
        let using: Vec<&str> = facts[0].using_cols.iter().map(String::as_str).collect();
        assert_eq!(using, vec!["id", "tenant"]);
        // USING identifiers are not references themselves
        assert_eq!(raws(&facts[0]), vec!["id", "name"]);
    }

    #[test]
    fn test_column_alias_owns_its_references() {
        let facts = facts_for("SELECT foo.y AS x, a + b AS s FROM foo, bar ORDER BY x");
        let select = &facts[0];
        assert_eq!(raws(select), vec!["foo.y", "a", "b", "x"]);
        assert_eq!(select.col_aliases.len(), 2);
        assert_eq!(select.col_aliases[0].alias_identifier_name, "x");
        assert!(select.col_aliases[0].defines(&select.references[0]));
        assert!(!select.col_aliases[0].defines(&select.references[3]));
        assert!(select.col_aliases[1].defines(&select.references[1]));
        assert!(select.col_aliases[1].defines(&select.references[2]));
    }

    #[test]
    fn test_subquery_is_its_own_scope() {
        let facts =
            facts_for("SELECT a FROM foo, bar WHERE foo.id IN (SELECT b FROM baz WHERE c = 1)");
        assert_eq!(facts.len(), 2);
        assert_eq!(raws(&facts[0]), vec!["a", "foo.id"]);
        assert_eq!(facts[1].source_names(), vec!["baz"]);
        assert_eq!(raws(&facts[1]), vec!["b", "c"]);
    }

    #[test]
    fn test_derived_table_is_a_standalone_source() {
        let facts = facts_for("SELECT t.a, foo.b FROM (SELECT a FROM bar) AS t, foo");
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].source_names(), vec!["t", "foo"]);
        assert_eq!(facts[0].standalone_aliases, vec!["t".to_string()]);
        assert_eq!(facts[0].table_aliases[0].kind, SourceKind::Derived);
        assert_eq!(raws(&facts[1]), vec!["a"]);
    }

    #[test]
    fn test_cte_and_union_branches() {
        let facts = facts_for(
            "WITH c AS (SELECT x FROM foo) SELECT a FROM c UNION SELECT b FROM bar ORDER BY 1",
        );
        assert_eq!(facts.len(), 3);
        assert_eq!(raws(&facts[0]), vec!["x"]);
        assert_eq!(raws(&facts[1]), vec!["a"]);
        assert_eq!(raws(&facts[2]), vec!["b"]);
    }

    #[test]
    fn test_reference_ids_are_unique_across_scopes() {
        let facts = facts_for("SELECT a, (SELECT b FROM bar) FROM foo WHERE c = 1");
        let mut ids: Vec<RefId> = facts
            .iter()
            .flat_map(|f| f.references.iter().map(|r| r.id))
            .collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn test_reference_spans() {
        let facts = facts_for("SELECT a FROM foo, bar");
        let span = facts[0].references[0].span.unwrap();
        assert_eq!(span.line, 1);
        assert_eq!(span.column, 8);
    }

    #[test]
    fn test_insert_select_and_update_subquery() {
        let facts = facts_for(
            "INSERT INTO t SELECT a FROM foo, bar; \
             UPDATE t SET x = 1 WHERE id IN (SELECT id FROM foo)",
        );
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].source_names(), vec!["foo", "bar"]);
        assert_eq!(facts[1].source_names(), vec!["foo"]);
    }

    #[test]
    fn test_redshift_super_navigation_source() {
        let statements = Parser::parse_sql(
            &RedshiftSqlDialect {},
            "SELECT o FROM customer_orders c, c.c_orders o",
        )
        .unwrap();
        let facts = extract_statement(&statements[0]);
        assert_eq!(facts[0].source_names(), vec!["c", "o"]);
        assert_eq!(raws(&facts[0]), vec!["o"]);
    }

    #[test]
    fn test_pivot_alias_replaces_inner_table() {
        let statements = Parser::parse_sql(
            &SnowflakeDialect {},
            "SELECT p.a FROM t PIVOT(sum(amount) FOR month IN ('JAN', 'FEB')) AS p, u",
        )
        .unwrap();
        let facts = extract_statement(&statements[0]);
        assert_eq!(facts[0].source_names(), vec!["p", "u"]);
        assert_eq!(facts[0].table_aliases[0].kind, SourceKind::Derived);
        // `amount` belongs to the pivot, not to the outer select
        assert_eq!(raws(&facts[0]), vec!["p.a"]);
    }

    #[test]
    fn test_unaliased_unpivot_keeps_inner_name() {
        let statements = Parser::parse_sql(
            &SnowflakeDialect {},
            "SELECT t.v FROM t UNPIVOT(v FOR m IN (jan, feb)), u",
        )
        .unwrap();
        let facts = extract_statement(&statements[0]);
        assert_eq!(facts[0].source_names(), vec!["t", "u"]);
    }

    #[test]
    fn test_json_table_is_a_source() {
        let statements = Parser::parse_sql(
            &MySqlDialect {},
            "SELECT a FROM foo, JSON_TABLE(foo.j, '$[*]' COLUMNS(x INT PATH '$')) AS jt",
        )
        .unwrap();
        let facts = extract_statement(&statements[0]);
        assert_eq!(facts[0].source_names(), vec!["foo", "jt"]);
        assert_eq!(facts[0].standalone_aliases, vec!["jt".to_string()]);
        assert_eq!(raws(&facts[0]), vec!["a", "foo.j"]);
    }

    #[test]
    fn test_lateral_view_is_a_source() {
        let statements = Parser::parse_sql(
            &HiveDialect {},
            "SELECT a FROM t LATERAL VIEW explode(t.arr) v AS a",
        )
        .unwrap();
        let facts = extract_statement(&statements[0]);
        assert_eq!(facts[0].source_names(), vec!["t", "v"]);
        assert_eq!(raws(&facts[0]), vec!["a", "t.arr"]);
    }

    #[test]
    fn test_distinct_on_and_named_window_in_source_order() {
        let facts = facts_for(
            "SELECT DISTINCT ON (a) sum(foo.x) OVER w FROM foo, bar \
             WHERE b = 1 WINDOW w AS (PARTITION BY c ORDER BY d) ORDER BY e",
        );
        assert_eq!(raws(&facts[0]), vec!["a", "foo.x", "b", "c", "d", "e"]);
    }
}
