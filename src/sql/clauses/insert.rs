#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! INSERT statements.

use itertools::Itertools;

use super::{
    comparison::ComparisonResult,
    expr::{self, Scope},
    select::{self, SelectInfo},
    sorted_difference,
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Reference cell value that accepts anything.
pub const ANY_VALUE: &str = "*";

/// Where the inserted rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertSource {
    /// `VALUES (...), (...)`, each cell rendered.
    Values(Vec<Vec<String>>),
    /// `INSERT ... SELECT`.
    Select(Box<SelectInfo>),
    /// `DEFAULT VALUES`, or no source at all.
    Default,
}

impl InsertSource {
    /// Name of the style used in messages.
    fn style(&self) -> &'static str {
        match self {
            Self::Values(_) => "INSERT...VALUES",
            Self::Select(_) => "INSERT...SELECT",
            Self::Default => "INSERT...DEFAULT VALUES",
        }
    }
}

/// Everything extracted from an `InsertStmt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertInfo {
    /// Target table.
    pub table:   String,
    /// Explicit target columns, empty when omitted.
    pub columns: Vec<String>,
    /// Row source.
    pub source:  InsertSource,
}

impl InsertInfo {
    /// Extracts an `InsertStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        let table = statement
            .path(&["relation", "relname"])
            .map(|n| strip_quotes(n.value()))
            .unwrap_or_default();
        let columns = statement
            .child("cols")
            .map(|cols| {
                cols.children()
                    .iter()
                    .filter(|c| c.key() == "ResTarget")
                    .map(|c| strip_quotes(&c.value_of("name")))
                    .collect()
            })
            .unwrap_or_default();

        let source = match statement.path(&["selectStmt", "SelectStmt"]) {
            Some(select) => match select.child("valuesLists") {
                Some(lists) => {
                    let scope = Scope::new();
                    InsertSource::Values(
                        lists
                            .children()
                            .iter()
                            .filter(|l| l.key() == "List")
                            .map(|list| {
                                list.child("items")
                                    .map(|items| {
                                        items
                                            .children()
                                            .iter()
                                            .map(|cell| expr::render(cell, &scope))
                                            .collect()
                                    })
                                    .unwrap_or_default()
                            })
                            .collect(),
                    )
                }
                None => InsertSource::Select(Box::new(SelectInfo::extract(select))),
            },
            None => InsertSource::Default,
        };

        Self {
            table,
            columns,
            source,
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.table.is_empty() {
            return "No INSERT statement found.".to_string();
        }
        let mut out = format!("Insert into table '{}'. ", self.table);
        if !self.columns.is_empty() {
            out.push_str(&format!("Target columns: {}. ", expr::join_quoted(&self.columns, ",")));
        }
        match &self.source {
            InsertSource::Values(rows) if rows.is_empty() => out.push_str("No values provided."),
            InsertSource::Values(rows) if rows.len() == 1 => {
                out.push_str(&format!("Insert values: ({}).", rows[0].join(", ")));
            }
            InsertSource::Values(rows) => {
                out.push_str(&format!(
                    "Insert values: {}.",
                    rows.iter().map(|r| format!("({})", r.join(", "))).join("; ")
                ));
            }
            InsertSource::Select(select) => {
                out.push_str(&format!("Insert the rows returned by a query that: {}", select.describe().join("; ")));
            }
            InsertSource::Default => out.push_str("No values provided."),
        }
        out
    }

    /// Rows with the cells reordered to follow `order`, when both statements
    /// name the same columns in a different order.
    fn rows_in_order(&self, order: &[String]) -> Option<Vec<Vec<String>>> {
        let InsertSource::Values(rows) = &self.source else {
            return None;
        };
        if self.columns.is_empty() || self.columns == order {
            return Some(rows.clone());
        }
        let positions: Option<Vec<usize>> = order
            .iter()
            .map(|c| self.columns.iter().position(|own| own.eq_ignore_ascii_case(c)))
            .collect();
        let Some(positions) = positions else {
            return Some(rows.clone());
        };
        Some(
            rows.iter()
                .map(|row| positions.iter().filter_map(|&p| row.get(p).cloned()).collect())
                .collect(),
        )
    }
}

/// Compares two INSERT statements.
pub fn compare(reference: &InsertInfo, submission: &InsertInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.table.eq_ignore_ascii_case(&submission.table) {
        result.correct("Target table");
    } else {
        result.incorrect(
            "Target table",
            format!(
                "● Target table mismatch: expected '{}', but found '{}'.\n",
                reference.table, submission.table
            ),
        );
        result.hint("💡 Ensure the INSERT targets the correct table.");
    }

    let lower = |cols: &[String]| -> Vec<String> { cols.iter().map(|c| c.to_lowercase()).sorted().collect() };
    let (expected, found) = (lower(&reference.columns), lower(&submission.columns));
    if expected == found {
        if !expected.is_empty() {
            result.correct("Target columns");
        }
    } else {
        let missing = sorted_difference(&expected, &found);
        let extra = sorted_difference(&found, &expected);
        let mut message = String::new();
        if !missing.is_empty() {
            message.push_str(&format!("● Missing columns: {}.\n", missing.join(", ")));
            result.hint("💡 Add the missing columns to the INSERT statement.");
        }
        if !extra.is_empty() {
            message.push_str(&format!("● Extra columns: {}.\n", extra.join(", ")));
            result.hint("💡 Remove the extra columns from the INSERT statement.");
        }
        result.incorrect("Target columns", message);
    }

    match (&reference.source, &submission.source) {
        (InsertSource::Values(_), InsertSource::Values(_)) => {
            let expected_rows = reference.rows_in_order(&reference.columns).unwrap_or_default();
            let found_rows = submission
                .rows_in_order(&reference.columns)
                .unwrap_or_default();
            compare_rows(&expected_rows, &found_rows, &mut result);
        }
        (InsertSource::Select(expected), InsertSource::Select(found)) => {
            let nested = select::compare(expected, found);
            if nested.equal {
                result.correct("Inserted values");
            } else {
                result.incorrect(
                    "Inserted values",
                    format!(
                        "● The SELECT feeding the INSERT differs in: {}.\n",
                        nested.incorrect_parts.join(", ")
                    ),
                );
                result.next_steps.extend(nested.next_steps);
            }
        }
        (InsertSource::Default, InsertSource::Default) => result.correct("Inserted values"),
        (expected, _) => {
            result.incorrect(
                "INSERT style",
                "● Mismatch in INSERT style: one query uses INSERT...SELECT while the other uses INSERT...VALUES.\n",
            );
            result.hint(format!("💡 Use the {} style.", expected.style()));
        }
    }

    result
}

/// Compares `VALUES` rows cell by cell; `*` in the reference accepts anything.
fn compare_rows(expected: &[Vec<String>], found: &[Vec<String>], result: &mut ComparisonResult) {
    if expected.is_empty() && found.is_empty() {
        return;
    }
    if expected.len() != found.len() {
        result.incorrect(
            "Number of rows",
            format!(
                "● Mismatch in number of rows: expected {}, found {}.\n",
                expected.len(),
                found.len()
            ),
        );
        result.hint("💡 Ensure the correct number of rows are inserted.");
        return;
    }

    let before = result.incorrect_parts.len();
    for (i, (expected_row, found_row)) in expected.iter().zip(found).enumerate() {
        let row = i + 1;
        if expected_row.len() != found_row.len() {
            let mut message = format!(
                "● Row {row} has different number of values: expected {}, found {}.\n",
                expected_row.len(),
                found_row.len()
            );
            if found_row.len() > expected_row.len() {
                message.push_str(&format!(
                    "● Extra value(s): {}.\n",
                    expr::join_quoted(&found_row[expected_row.len()..], "")
                ));
                result.hint(format!("💡 Remove the extra value(s) at row {row}."));
            } else {
                message.push_str(&format!(
                    "● Missing value(s): {}.\n",
                    expr::join_quoted(&expected_row[found_row.len()..], "")
                ));
                result.hint(format!("💡 Add the missing value(s) at row {row}."));
            }
            result.incorrect(format!("Row {row} values"), message);
            continue;
        }
        for (j, (e, f)) in expected_row.iter().zip(found_row).enumerate() {
            let column = j + 1;
            if e == ANY_VALUE || e == f {
                continue;
            }
            result.incorrect(
                format!("Row {row}, column {column}"),
                format!("● Mismatch at row {row}, column {column}: expected '{e}', found '{f}'.\n"),
            );
            result.hint(format!("💡 Check the value at row {row}, column {column}."));
        }
    }
    if result.incorrect_parts.len() == before {
        result.correct("Inserted values");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(columns: &[&str], rows: &[&[&str]]) -> InsertInfo {
        InsertInfo {
            table:   "employees".into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            source:  InsertSource::Values(
                rows.iter()
                    .map(|r| r.iter().map(|c| c.to_string()).collect())
                    .collect(),
            ),
        }
    }

    #[test]
    fn column_order_does_not_matter() {
        let reference = values(&["id", "name"], &[&["1", "Ann"]]);
        let submission = values(&["name", "id"], &[&["Ann", "1"]]);
        let result = compare(&reference, &submission);
        assert!(result.equal, "{}", result.message);
    }

    #[test]
    fn wildcard_accepts_any_value() {
        let reference = values(&["id", "name"], &[&["1", "*"]]);
        let submission = values(&["id", "name"], &[&["1", "Bob"]]);
        assert!(compare(&reference, &submission).equal);
    }

    #[test]
    fn cell_mismatch_is_located() {
        let reference = values(&["id"], &[&["1"], &["2"]]);
        let submission = values(&["id"], &[&["1"], &["3"]]);
        let result = compare(&reference, &submission);
        assert_eq!(result.incorrect_parts, vec!["Row 2, column 1".to_string()]);
        assert!(result.message.contains("expected '2', found '3'"));
    }
}
