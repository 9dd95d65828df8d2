#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// `table` value of a diff entry recording a violated constraint.
pub const CONSTRAINT_ERROR: &str = "constraint error";
/// `table` value of a diff entry recording a permission failure.
pub const PERMISSION_ERROR: &str = "permission error";

/// One observed change to the database made by a non-SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Affected table, or one of [`CONSTRAINT_ERROR`] / [`PERMISSION_ERROR`].
    pub table:     String,
    /// Kind of change (`table_created`, `added`, `unique constraint`, ...).
    pub operation: String,
    /// Column name, canonical row text, or type change.
    #[serde(default)]
    pub detail:    String,
}

impl DiffEntry {
    /// Creates an entry.
    pub fn new(table: impl Into<String>, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            table:     table.into(),
            operation: operation.into(),
            detail:    detail.into(),
        }
    }

    /// Classifies backend error text into a constraint or permission entry
    /// using lower-cased substring checks. Returns `None` for any other
    /// error.
    pub fn from_execution_error(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("constraint") {
            let kind = if lower.contains("unique") || lower.contains("primary key") {
                "unique constraint"
            } else if lower.contains("foreign key") {
                "foreign key constraint"
            } else if lower.contains("check") {
                "check constraint"
            } else if lower.contains("not null") {
                "not null constraint"
            } else {
                "other constraint"
            };
            return Some(Self::new(CONSTRAINT_ERROR, kind, ""));
        }
        if lower.contains("permission") || lower.contains("access denied") {
            return Some(Self::new(PERMISSION_ERROR, "access denied", ""));
        }
        None
    }

    /// True for constraint-violation entries.
    pub fn is_constraint_error(&self) -> bool {
        self.table == CONSTRAINT_ERROR
    }

    /// True for permission-failure entries.
    pub fn is_permission_error(&self) -> bool {
        self.table == PERMISSION_ERROR || self.operation == PERMISSION_ERROR
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "[{}] {}", self.operation, self.table)
        } else {
            write!(f, "[{}] {}: {}", self.operation, self.table, self.detail)
        }
    }
}

/// Output of executing one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutput {
    /// Row set returned by a SELECT, each cell rendered as text.
    Rows(Vec<Vec<String>>),
    /// Changes made by any other statement.
    Changes(Vec<DiffEntry>),
}

impl Default for QueryOutput {
    fn default() -> Self {
        Self::Rows(Vec::new())
    }
}

impl QueryOutput {
    /// True when there are no rows or changes.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Rows(rows) => rows.is_empty(),
            Self::Changes(changes) => changes.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_constraint_errors() {
        let entry = DiffEntry::from_execution_error(
            "ERROR: duplicate key value violates unique constraint \"book_pkey\"",
        )
        .expect("constraint error");
        assert_eq!(entry.table, CONSTRAINT_ERROR);
        assert_eq!(entry.operation, "unique constraint");

        let entry = DiffEntry::from_execution_error("insert violates foreign key constraint \"fk\"")
            .expect("constraint error");
        assert_eq!(entry.operation, "foreign key constraint");
    }

    #[test]
    fn classifies_permission_errors() {
        let entry = DiffEntry::from_execution_error("Access denied for user").expect("permission error");
        assert!(entry.is_permission_error());
        assert!(DiffEntry::from_execution_error("syntax error at or near").is_none());
    }
}
