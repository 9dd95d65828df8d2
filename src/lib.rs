//! # sqlgrade
//!
//! A clause-aware SQL auto-grader. Submitted statements are parsed, executed
//! and compared against reference statements and already-correct peers; the
//! syntax, semantics and results verdicts are combined into one correctness
//! level and a grade with actionable feedback.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// SQL parser and execution backend collaborators
pub mod backend;
/// Runtime configuration read from the environment
pub mod config;
/// Grading sessions, correctness levels and the grading pipeline
pub mod grade;
/// Subprocess helpers
pub mod process;
/// Parse trees, tree-edit distance, clause comparison and syntax repair
pub mod sql;
/// Shared value types
pub mod types;

pub use backend::{ExecutionBackend, HelperBackend, HelperParser, SqlParser};
pub use grade::{Pipeline, SessionConfig, default_session, grade_assignment};
pub use types::{DiffEntry, QueryOutput};
