#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! UPDATE statements.

use super::{
    comparison::{ClauseOutcome, ComparisonResult},
    condition::{self, ConditionNode},
    expr,
    from::{self, FromInfo},
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// One `column = value` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPair {
    /// Assigned column.
    pub column: String,
    /// Rendered value expression.
    pub value:  String,
}

/// Everything extracted from an `UpdateStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Target table.
    pub table:  String,
    /// SET assignments in source order.
    pub set:    Vec<SetPair>,
    /// `FROM` sources.
    pub from:   FromInfo,
    /// WHERE condition.
    pub filter: Option<ConditionNode>,
}

impl UpdateInfo {
    /// Extracts an `UpdateStmt` node.
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

        let set = statement
            .child("targetList")
            .map(|list| {
                list.children()
                    .iter()
                    .filter(|t| t.key() == "ResTarget")
                    .map(|target| SetPair {
                        column: strip_quotes(&target.value_of("name")),
                        value:  expr::render_wrapped(target.child("val"), &scope),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            filter: condition::extract_clause(statement.child("whereClause"), &scope),
            table,
            set,
            from,
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.table.is_empty() {
            return "No UPDATE statement found.".to_string();
        }
        let assignments: Vec<String> = self
            .set
            .iter()
            .map(|p| format!("{} = {}", p.column, p.value))
            .collect();
        let assignments = match assignments.as_slice() {
            [init @ .., last] if !init.is_empty() => format!("{} and {last}", init.join(", ")),
            _ => assignments.join(""),
        };
        let mut out = format!("Update table '{}' by setting {assignments}", self.table);
        let sources = self.from.describe_inline();
        if !sources.is_empty() {
            out.push_str(&format!(" from {sources}"));
        }
        if let Some(filter) = &self.filter {
            out.push_str(&format!(" where {filter}"));
        }
        out.push('.');
        out
    }
}

/// Compares two UPDATE statements. SET pairs are matched by column name.
pub fn compare(reference: &UpdateInfo, submission: &UpdateInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.table.eq_ignore_ascii_case(&submission.table) {
        result.correct("Target table");
    } else {
        result.incorrect(
            "Target table",
            format!(
                "● The UPDATE should target table '{}', but your query uses '{}'.\n",
                reference.table, submission.table
            ),
        );
        result.hint(format!("💡 Update the target table to '{}'.", reference.table));
    }

    if reference.set.len() != submission.set.len() {
        result.incorrect(
            "Set clauses count",
            format!(
                "● The reference UPDATE sets {} column(s), but your query sets {} column(s).\n",
                reference.set.len(),
                submission.set.len()
            ),
        );
        result.hint("💡 Ensure you set the correct number of columns in your UPDATE.");
    }

    let mut set_ok = reference.set.len() == submission.set.len();
    for expected in &reference.set {
        match submission
            .set
            .iter()
            .find(|p| p.column.eq_ignore_ascii_case(&expected.column))
        {
            None => {
                set_ok = false;
                result.incorrect(
                    format!("Set clause column ({})", expected.column),
                    format!("● Missing SET clause for column '{}'.\n", expected.column),
                );
                result.hint(format!("💡 Add the SET clause for column '{}'.", expected.column));
            }
            Some(found) if found.value != expected.value => {
                set_ok = false;
                result.incorrect(
                    format!("Value for '{}'", expected.column),
                    format!(
                        "● For column '{}', the value should be '{}', but you provided '{}'.\n",
                        expected.column, expected.value, found.value
                    ),
                );
                result.hint(format!("💡 Fix the value assignment for column '{}'.", expected.column));
            }
            Some(_) => {}
        }
    }
    if set_ok {
        result.correct("Set clauses");
    }

    let sources = from::compare(&reference.from, &submission.from);
    if sources.outcome != ClauseOutcome::Absent {
        result.record_clause("FROM clause", sources);
    }

    let filter = condition::compare_clause("WHERE", reference.filter.as_ref(), submission.filter.as_ref());
    if filter.outcome == ClauseOutcome::Absent {
        result.correct("WHERE clause");
    } else {
        result.record_clause("WHERE clause", filter);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(column: &str, value: &str) -> SetPair {
        SetPair {
            column: column.into(),
            value:  value.into(),
        }
    }

    #[test]
    fn wrong_value_is_named() {
        let reference = UpdateInfo {
            table: "employees".into(),
            set: vec![pair("salary", "5000")],
            ..UpdateInfo::default()
        };
        let submission = UpdateInfo {
            set: vec![pair("salary", "6000")],
            ..reference.clone()
        };
        let result = compare(&reference, &submission);
        assert_eq!(result.incorrect_parts, vec!["Value for 'salary'".to_string()]);
        assert!(result.message.contains("should be '5000', but you provided '6000'"));
    }
}
