#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! CREATE ASSERTION statements.

use super::{
    comparison::{ClauseOutcome, ComparisonResult},
    condition::{self, ConditionNode},
    expr::Scope,
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Everything extracted from a `CreateAssertionStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertionInfo {
    /// Assertion name.
    pub name:  String,
    /// Required condition.
    pub check: Option<ConditionNode>,
}

impl AssertionInfo {
    /// Extracts a `CreateAssertionStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        Self {
            name:  strip_quotes(&statement.value_of("assertion_name")),
            check: condition::extract_clause(statement.child("check_expr"), &Scope::new()),
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.name.is_empty() {
            return "No assertion found.".to_string();
        }
        match &self.check {
            Some(check) => format!("Create an assertion named '{}' that requires {check}", self.name),
            None => format!("Create an assertion named '{}' that requires no specific condition.", self.name),
        }
    }
}

/// Compares two assertions.
pub fn compare(reference: &AssertionInfo, submission: &AssertionInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.name.eq_ignore_ascii_case(&submission.name) {
        result.correct("Assertion name");
    } else {
        result.incorrect(
            "Assertion name",
            format!(
                "● The assertion should be named '{}', but your query uses '{}'.\n",
                reference.name, submission.name
            ),
        );
        result.hint(format!("💡 Change the assertion name to '{}'.", reference.name));
    }

    let check = condition::compare_clause("CHECK", reference.check.as_ref(), submission.check.as_ref());
    match check.outcome {
        ClauseOutcome::Absent | ClauseOutcome::Correct => result.correct("Assertion condition"),
        ClauseOutcome::Incorrect => {
            result.incorrect(
                "Assertion condition",
                format!("● The assertion condition does not match: {}\n", check.message),
            );
            result.next_steps.extend(check.next_steps);
        }
    }

    result
}
