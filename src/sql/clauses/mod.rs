#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// ALTER TABLE extraction and comparison.
pub mod alter;
/// CREATE ASSERTION extraction and comparison.
pub mod assertion;
/// Comparison results shared by every comparator.
pub mod comparison;
/// Boolean condition trees (WHERE, HAVING, CHECK).
pub mod condition;
/// CREATE TABLE extraction and comparison.
pub mod create;
/// DELETE extraction and comparison.
pub mod delete;
/// Scalar expression rendering.
pub mod expr;
/// FROM / USING extraction and comparison.
pub mod from;
/// INSERT extraction and comparison.
pub mod insert;
/// SELECT extraction and comparison.
pub mod select;
/// UPDATE extraction and comparison.
pub mod update;
/// CREATE VIEW extraction and comparison.
pub mod view;

use std::fmt;

pub use alter::AlterInfo;
pub use assertion::AssertionInfo;
pub use comparison::{ClauseComparison, ClauseOutcome, ComparisonResult};
pub use condition::ConditionNode;
pub use create::CreateInfo;
pub use delete::DeleteInfo;
pub use from::FromInfo;
pub use insert::InsertInfo;
pub use select::SelectInfo;
pub use update::UpdateInfo;
pub use view::ViewInfo;

use crate::sql::tree::ParseNode;

/// Elements of `a` left over after removing one occurrence of each element
/// of `b`, in the order of `a`.
pub(crate) fn sorted_difference(a: &[String], b: &[String]) -> Vec<String> {
    let mut remaining = b.to_vec();
    a.iter()
        .filter(|item| match remaining.iter().position(|r| r == *item) {
            Some(i) => {
                remaining.remove(i);
                false
            }
            None => true,
        })
        .cloned()
        .collect()
}

/// Statement kinds the grader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `SELECT`.
    Select,
    /// `CREATE TABLE`.
    Create,
    /// `INSERT`.
    Insert,
    /// `UPDATE`.
    Update,
    /// `DELETE`.
    Delete,
    /// `CREATE ASSERTION`.
    Assertion,
    /// `ALTER TABLE`.
    Alter,
    /// `CREATE VIEW`.
    View,
}

impl StatementKind {
    /// Maps a parser statement tag (`SelectStmt`, ...) to a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SelectStmt" => Some(Self::Select),
            "CreateStmt" => Some(Self::Create),
            "InsertStmt" => Some(Self::Insert),
            "UpdateStmt" => Some(Self::Update),
            "DeleteStmt" => Some(Self::Delete),
            "CreateAssertionStmt" => Some(Self::Assertion),
            "AlterTableStmt" => Some(Self::Alter),
            "ViewStmt" | "CreateViewStmt" => Some(Self::View),
            _ => None,
        }
    }

    /// Upper-case name used in feedback (`CREATE`, `ASSERTION`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Create => "CREATE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Assertion => "ASSERTION",
            Self::Alter => "ALTER",
            Self::View => "CREATE VIEW",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extracted content of one statement, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseInfo {
    /// A SELECT statement.
    Select(Box<SelectInfo>),
    /// A CREATE TABLE statement.
    Create(CreateInfo),
    /// An INSERT statement.
    Insert(InsertInfo),
    /// An UPDATE statement.
    Update(UpdateInfo),
    /// A DELETE statement.
    Delete(DeleteInfo),
    /// A CREATE ASSERTION statement.
    Assertion(AssertionInfo),
    /// An ALTER TABLE statement.
    Alter(AlterInfo),
    /// A CREATE VIEW statement.
    View(ViewInfo),
}

impl ClauseInfo {
    /// Extracts a statement node (the child of a `stmt` wrapper). Returns
    /// `None` for statement kinds that are not supported.
    pub fn extract(statement: &ParseNode) -> Option<Self> {
        let info = match StatementKind::from_tag(statement.key())? {
            StatementKind::Select => Self::Select(Box::new(SelectInfo::extract(statement))),
            StatementKind::Create => Self::Create(CreateInfo::extract(statement)),
            StatementKind::Insert => Self::Insert(InsertInfo::extract(statement)),
            StatementKind::Update => Self::Update(UpdateInfo::extract(statement)),
            StatementKind::Delete => Self::Delete(DeleteInfo::extract(statement)),
            StatementKind::Assertion => Self::Assertion(AssertionInfo::extract(statement)),
            StatementKind::Alter => Self::Alter(AlterInfo::extract(statement)),
            StatementKind::View => Self::View(ViewInfo::extract(statement)),
        };
        Some(info)
    }

    /// Kind of the statement.
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Create(_) => StatementKind::Create,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
            Self::Assertion(_) => StatementKind::Assertion,
            Self::Alter(_) => StatementKind::Alter,
            Self::View(_) => StatementKind::View,
        }
    }

    /// Compares `self` (the reference) with `submission`. Returns `None` when
    /// the two are of different kinds.
    pub fn compare(&self, submission: &ClauseInfo) -> Option<ComparisonResult> {
        let result = match (self, submission) {
            (Self::Select(r), Self::Select(s)) => select::compare(r, s),
            (Self::Create(r), Self::Create(s)) => create::compare(r, s),
            (Self::Insert(r), Self::Insert(s)) => insert::compare(r, s),
            (Self::Update(r), Self::Update(s)) => update::compare(r, s),
            (Self::Delete(r), Self::Delete(s)) => delete::compare(r, s),
            (Self::Assertion(r), Self::Assertion(s)) => assertion::compare(r, s),
            (Self::Alter(r), Self::Alter(s)) => alter::compare(r, s),
            (Self::View(r), Self::View(s)) => view::compare(r, s),
            _ => return None,
        };
        Some(result)
    }

    /// Goal sentences for the statement.
    pub fn describe(&self) -> Vec<String> {
        match self {
            Self::Select(info) => info.describe(),
            Self::Create(info) => vec![info.describe()],
            Self::Insert(info) => vec![info.describe()],
            Self::Update(info) => vec![info.describe()],
            Self::Delete(info) => vec![info.describe()],
            Self::Assertion(info) => vec![info.describe()],
            Self::Alter(info) => vec![info.describe()],
            Self::View(info) => vec![info.describe()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_keeps_duplicates() {
        let a = vec!["x".to_string(), "x".to_string(), "y".to_string()];
        let b = vec!["x".to_string()];
        assert_eq!(sorted_difference(&a, &b), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn unknown_tags_are_unsupported() {
        assert_eq!(StatementKind::from_tag("CreateFunctionStmt"), None);
        assert_eq!(StatementKind::from_tag("AlterTableStmt"), Some(StatementKind::Alter));
        assert_eq!(StatementKind::from_tag("CreateViewStmt"), Some(StatementKind::View));
        assert_eq!(StatementKind::from_tag("DeleteStmt"), Some(StatementKind::Delete));
    }
}
