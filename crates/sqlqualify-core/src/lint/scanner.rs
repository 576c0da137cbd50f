//! Statement scanner - flags unqualified references in a multi-source SELECT

use indexmap::IndexSet;
use tracing::trace;

use super::classifier::is_qualified;
use super::model::{ColumnAliasInfo, ColumnReference, TableAliasInfo, Violation};
use crate::dialect::SqlDialect;

/// Scan the references of one SELECT.
///
/// Returns `None` when the select has at most one source or nothing was
/// flagged. Violations come back in the order `references` was given.
/// `standalone_aliases` is accepted for the host's convenience and does not
/// influence the outcome.
pub fn scan(
    table_aliases: &[TableAliasInfo],
    _standalone_aliases: &[String],
    references: &[ColumnReference],
    col_aliases: &[ColumnAliasInfo],
    using_cols: &IndexSet<String>,
    dialect: Option<SqlDialect>,
) -> Option<Vec<Violation>> {
    if table_aliases.len() <= 1 {
        return None;
    }

    let table_alias_names: Vec<&str> = table_aliases.iter().map(|t| t.ref_str.as_str()).collect();
    let mut violations = Vec::new();

    for reference in references {
        // An alias never vouches for a reference inside its own definition.
        let col_alias_names: Vec<&str> = col_aliases
            .iter()
            .filter(|alias| !alias.defines(reference))
            .map(|alias| alias.alias_identifier_name.as_str())
            .collect();

        let qualified = is_qualified(
            reference,
            &table_alias_names,
            &col_alias_names,
            using_cols,
            dialect,
        );
        trace!(reference = %reference.raw, qualified, "classified reference");

        if !qualified {
            violations.push(Violation::unqualified(reference));
        }
    }

    if violations.is_empty() {
        None
    } else {
        Some(violations)
    }
}
