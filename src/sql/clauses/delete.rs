#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! DELETE statements.

use super::{
    comparison::{ClauseOutcome, ComparisonResult},
    condition::{self, ConditionNode},
    from::{self, FromInfo},
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Everything extracted from a `DeleteStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteInfo {
    /// Target table.
    pub table:  String,
    /// `USING` sources.
    pub from:   FromInfo,
    /// WHERE condition.
    pub filter: Option<ConditionNode>,
}

impl DeleteInfo {
    /// Extracts a `DeleteStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        let table = statement
            .path(&["relation", "relname"])
            .map(|n| strip_quotes(n.value()))
            .unwrap_or_default();
        let alias = statement
            .path(&["relation", "alias", "aliasname"])
            .map(|n| strip_quotes(n.value()))
            .unwrap_or_default();
        let from = FromInfo::extract(statement);
        let scope = from.scope().with_table(alias, table.clone());
        Self {
            filter: condition::extract_clause(statement.child("whereClause"), &scope),
            table,
            from,
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.table.is_empty() {
            return "No DELETE statement found.".to_string();
        }
        let mut out = format!("Delete rows from '{}'", self.table);
        let sources = self.from.describe_inline();
        if !sources.is_empty() {
            out.push_str(&format!(" using {sources}"));
        }
        if let Some(filter) = &self.filter {
            out.push_str(&format!(" where {filter}"));
        }
        out.push('.');
        out
    }
}

/// Compares two DELETE statements.
pub fn compare(reference: &DeleteInfo, submission: &DeleteInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.table.eq_ignore_ascii_case(&submission.table) {
        result.correct("Target table");
    } else {
        result.incorrect(
            "Target table",
            format!(
                "● The DELETE statement should target table '{}', but your query targets '{}'.\n",
                reference.table, submission.table
            ),
        );
        result.hint(format!("💡 Please change the target table to '{}'.", reference.table));
    }

    let sources = from::compare(&reference.from, &submission.from);
    match sources.outcome {
        ClauseOutcome::Absent => {}
        ClauseOutcome::Correct => result.correct("FROM clause"),
        ClauseOutcome::Incorrect => {
            result.incorrect("FROM clause", &sources.message);
            result.hint("💡 Review and adjust your FROM (or USING) clause to match the expected query.");
        }
    }

    let filter = condition::compare_clause("WHERE", reference.filter.as_ref(), submission.filter.as_ref());
    if filter.outcome != ClauseOutcome::Absent {
        result.record_clause("WHERE clause", filter);
    }

    result
}
