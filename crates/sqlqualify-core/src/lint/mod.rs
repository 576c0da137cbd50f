//! Unqualified column reference check
//!
//! In a SELECT with more than one table source, every column reference
//! should name its source. The check works on facts already extracted from
//! the syntax tree (see [`crate::extract`]) and never touches the tree itself.

mod classifier;
mod model;
mod scanner;

pub use classifier::is_qualified;
pub use model::{
    ColumnAliasInfo, ColumnReference, Qualification, RefId, SourceKind, TableAliasInfo, Violation,
};
pub use scanner::scan;
