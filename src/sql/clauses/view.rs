#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! CREATE VIEW statements. The defining query is graded by the SELECT
//! comparator.

use super::{
    comparison::ComparisonResult,
    expr,
    select::{self, SelectInfo},
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Everything extracted from a `ViewStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewInfo {
    /// View name.
    pub name:    String,
    /// Explicit output column names, empty when omitted.
    pub columns: Vec<String>,
    /// Defining query, when it is a plain SELECT.
    pub query:   Option<Box<SelectInfo>>,
}

impl ViewInfo {
    /// Extracts a `ViewStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        Self {
            name:    statement
                .path(&["view", "relname"])
                .map(|n| strip_quotes(n.value()).to_lowercase())
                .unwrap_or_default(),
            columns: expr::string_values_of(statement.child("aliases"))
                .into_iter()
                .map(|c| c.to_lowercase())
                .collect(),
            query:   statement
                .path(&["query", "SelectStmt"])
                .map(|q| Box::new(SelectInfo::extract(q))),
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.name.is_empty() {
            return "No CREATE VIEW statement found.".to_string();
        }
        let mut out = format!("Create a view named '{}'. ", self.name);
        if !self.columns.is_empty() {
            out.push_str(&format!("Columns: ({}). ", self.columns.join(", ")));
        }
        match &self.query {
            Some(query) => out.push_str(&format!("Definition: {}", query.describe().join(" "))),
            None => out.push_str("No view definition found."),
        }
        out
    }
}

/// Compares two CREATE VIEW statements.
pub fn compare(reference: &ViewInfo, submission: &ViewInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.name == submission.name {
        result.correct("View name");
    } else {
        result.incorrect(
            "View name",
            format!(
                "● The view name should be '{}', but found '{}'.\n",
                reference.name, submission.name
            ),
        );
        result.hint(format!("💡 Change the view name to '{}'.", reference.name));
    }

    if reference.columns == submission.columns {
        if !reference.columns.is_empty() {
            result.correct("View columns");
        }
    } else {
        result.incorrect(
            "View columns",
            format!(
                "● The view columns should be ({}), but found ({}).\n",
                reference.columns.join(", "),
                submission.columns.join(", ")
            ),
        );
        result.hint(format!(
            "💡 Name the view columns ({}) in that order.",
            reference.columns.join(", ")
        ));
    }

    match (&reference.query, &submission.query) {
        (Some(r), Some(s)) => {
            let query = select::compare(r, s);
            if query.equal {
                result.correct("View SELECT clause");
            } else {
                result.incorrect(
                    "View SELECT clause",
                    format!(
                        "● The SELECT clause in the view definition does not match.\n{}",
                        query.message
                    ),
                );
                result.next_steps.extend(query.next_steps);
            }
        }
        (None, None) => {}
        _ => {
            result.incorrect(
                "View SELECT clause",
                "● The view should be defined by a single SELECT statement.\n",
            );
            result.hint("💡 Define the view with AS SELECT ...");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_list_order_matters() {
        let reference = ViewInfo {
            name:    "cheap_books".into(),
            columns: vec!["isbn".into(), "title".into()],
            query:   None,
        };
        let submission = ViewInfo {
            columns: vec!["title".into(), "isbn".into()],
            ..reference.clone()
        };
        let result = compare(&reference, &submission);
        assert!(!result.equal);
        assert_eq!(result.incorrect_parts, vec!["View columns".to_string()]);
        assert_eq!(result.correct_parts, vec!["View name".to_string()]);
    }

    #[test]
    fn missing_name_describes_nothing() {
        assert_eq!(ViewInfo::default().describe(), "No CREATE VIEW statement found.");
    }
}
