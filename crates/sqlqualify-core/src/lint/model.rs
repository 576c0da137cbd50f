//! Facts about a single SELECT consumed by the unqualified-reference check

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Span};

/// Identity of a column reference within one statement.
///
/// Two references with the same text at different positions have different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(pub usize);

/// Syntactic qualification of a column reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Qualification {
    /// Carries a dotted prefix (`t.col`, `schema.t.col`)
    Qualified,
    /// Bare name (`col`)
    Unqualified,
}

/// A column name used somewhere in a SELECT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub id: RefId,
    /// Reference text, dotted parts joined by `.`
    pub raw: String,
    pub qualification: Qualification,
    pub span: Option<Span>,
}

impl ColumnReference {
    pub fn unqualified(id: RefId, raw: impl Into<String>) -> Self {
        Self {
            id,
            raw: raw.into(),
            qualification: Qualification::Unqualified,
            span: None,
        }
    }

    pub fn qualified(id: RefId, raw: impl Into<String>) -> Self {
        Self {
            id,
            raw: raw.into(),
            qualification: Qualification::Qualified,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_qualified(&self) -> bool {
        self.qualification == Qualification::Qualified
    }
}

/// What kind of source a table alias is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Named table or view
    Table,
    /// Subquery in FROM
    Derived,
    /// Table-valued function or UNNEST
    Function,
}

/// A table, view or derived source in the FROM/JOIN graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAliasInfo {
    /// Name usable as an explicit qualifier: the alias, or the table name if unaliased
    pub ref_str: String,
    pub kind: SourceKind,
    pub span: Option<Span>,
}

impl TableAliasInfo {
    pub fn new(ref_str: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            ref_str: ref_str.into(),
            kind,
            span: None,
        }
    }

    pub fn table(ref_str: impl Into<String>) -> Self {
        Self::new(ref_str, SourceKind::Table)
    }
}

/// A select-list alias (`expr AS name`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliasInfo {
    pub alias_identifier_name: String,
    /// References occurring inside this alias's own defining expression
    pub column_reference_ids: IndexSet<RefId>,
}

impl ColumnAliasInfo {
    pub fn new(name: impl Into<String>, ids: impl IntoIterator<Item = RefId>) -> Self {
        Self {
            alias_identifier_name: name.into(),
            column_reference_ids: ids.into_iter().collect(),
        }
    }

    /// Whether `reference` sits inside this alias's own expression
    pub fn defines(&self, reference: &ColumnReference) -> bool {
        self.column_reference_ids.contains(&reference.id)
    }
}

/// A flagged reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub anchor: ColumnReference,
    pub description: String,
}

impl Violation {
    pub fn unqualified(anchor: &ColumnReference) -> Self {
        Self {
            description: format!(
                "Unqualified reference '{}' found in select with more than one referenced table/view.",
                anchor.raw
            ),
            anchor: anchor.clone(),
        }
    }

    /// Convert into a reportable diagnostic.
    ///
    /// Every named source becomes part of the help text, and located ones
    /// are attached as labels.
    pub fn into_diagnostic(self, sources: &[TableAliasInfo]) -> Diagnostic {
        let mut diag = Diagnostic::warning(DiagnosticKind::UnqualifiedReference, self.description);
        if let Some(span) = self.anchor.span {
            diag = diag.with_span(span);
        }
        let mut named = Vec::new();
        for source in sources.iter().filter(|s| !s.ref_str.is_empty()) {
            named.push(source.ref_str.as_str());
            if let Some(span) = source.span {
                diag = diag.with_label(format!("source '{}'", source.ref_str), span);
            }
        }
        if !named.is_empty() {
            diag = diag.with_help(format!(
                "Qualify '{}' with one of: {}",
                self.anchor.raw,
                named.join(", ")
            ));
        }
        diag
    }
}
