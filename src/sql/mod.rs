#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Clause extractors and comparators.
pub mod clauses;
/// Goal descriptions and statement-level comparison.
pub mod goals;
/// SQL:2016 reserved keywords.
pub mod keywords;
/// Edit distances and syntax repair.
pub mod repair;
/// Zhang–Shasha tree-edit distance.
pub mod ted;
/// Labeled parse trees built from parser JSON.
pub mod tree;

pub use clauses::{ClauseInfo, ComparisonResult, StatementKind};
pub use goals::{compare_queries, compare_single_statement, describe_goal};
pub use ted::tree_edit_distance;
pub use tree::ParseNode;
