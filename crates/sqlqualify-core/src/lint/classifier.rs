//! Qualification classifier

use indexmap::IndexSet;

use super::model::ColumnReference;
use crate::dialect::SqlDialect;

/// Returns true when `reference` needs no further qualification.
///
/// Any one of these is sufficient:
/// - it already carries a dotted prefix;
/// - its text names a column alias from another select-list element;
/// - its text names a `USING` column;
/// - the dialect allows SUPER navigation (Redshift) and its text names a table alias.
pub fn is_qualified(
    reference: &ColumnReference,
    table_alias_names: &[&str],
    col_alias_names: &[&str],
    using_cols: &IndexSet<String>,
    dialect: Option<SqlDialect>,
) -> bool {
    let raw = reference.raw.as_str();
    reference.is_qualified()
        || col_alias_names.contains(&raw)
        || using_cols.contains(raw)
        || (dialect.is_some_and(|d| d.supports_super_navigation())
            && table_alias_names.contains(&raw))
}
