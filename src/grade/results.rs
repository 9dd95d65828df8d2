#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Output comparison: row sets produced by SELECT statements and table-state
//! changes produced by every other statement.

use itertools::Itertools;
use serde::Serialize;

use crate::types::{DiffEntry, QueryOutput};

/// Outcome of comparing a submission's output with the reference output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputComparison {
    /// Outputs match.
    pub equal:      bool,
    /// Everything expected is present, possibly alongside extras.
    pub subset:     bool,
    /// Mismatch severity; 0 when equal.
    pub difference: usize,
    /// Diagnostic lines, one per discrepancy.
    pub messages:   Vec<String>,
    /// Remediation hints, parallel to the discrepancies that raised them.
    pub hints:      Vec<String>,
}

impl OutputComparison {
    /// Diagnostic lines joined by newlines.
    pub fn message(&self) -> String {
        self.messages.join("\n")
    }
}

/// Transposes a rectangular grid.
fn transpose(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|j| rows.iter().map(|row| row[j].clone()).collect())
        .collect()
}

/// Brings a row set into a canonical form: columns sorted as whole vectors
/// and, unless order matters, rows sorted too. Ragged grids keep their column
/// order.
fn canonicalize(rows: &[Vec<String>], check_order: bool) -> Vec<Vec<String>> {
    let rectangular = rows.iter().map(Vec::len).all_equal();
    let mut canonical = if rectangular {
        let mut columns = transpose(rows);
        columns.sort();
        transpose(&columns)
    } else {
        rows.to_vec()
    };
    if !check_order {
        canonical.sort();
    }
    canonical
}

/// True when `needle` occurs as a contiguous window of `row`.
fn contains_window(row: &[String], needle: &[String]) -> bool {
    needle.is_empty() || row.windows(needle.len()).any(|window| window == needle)
}

/// True when every row of `smaller`, in order, is a window of a distinct,
/// later row of `bigger`.
fn is_sequence_contained(smaller: &[Vec<String>], bigger: &[Vec<String>]) -> bool {
    let mut pending = smaller.iter().peekable();
    for row in bigger {
        let Some(next) = pending.peek() else {
            break;
        };
        if contains_window(row, next) {
            pending.next();
        }
    }
    pending.peek().is_none()
}

/// Largest number of equal cells over every translation of `a` onto `b`.
fn max_overlap(a: &[Vec<String>], b: &[Vec<String>]) -> usize {
    let (r1, r2) = (a.len() as isize, b.len() as isize);
    let c1 = a.iter().map(Vec::len).max().unwrap_or(0) as isize;
    let c2 = b.iter().map(Vec::len).max().unwrap_or(0) as isize;

    let mut best = 0;
    for row_offset in (1 - r1)..r2 {
        for col_offset in (1 - c1)..c2 {
            let mut overlap = 0;
            for (i, row) in a.iter().enumerate() {
                let ti = i as isize + row_offset;
                if !(0..r2).contains(&ti) {
                    continue;
                }
                let target = &b[ti as usize];
                for (j, cell) in row.iter().enumerate() {
                    let tj = j as isize + col_offset;
                    if tj >= 0 && (tj as usize) < target.len() && target[tj as usize] == *cell {
                        overlap += 1;
                    }
                }
            }
            best = best.max(overlap);
        }
    }
    best
}

/// Compares the rows a SELECT returned with the expected rows.
///
/// Column order never matters; row order matters only with `check_order`.
/// `difference` counts the cells of both grids left unmatched by the best
/// translation of one grid over the other.
///
/// Two empty row sets are equal, so a query that correctly returns nothing
/// gets full results credit.
///
/// Both grids are canonicalized independently, columns first and then rows.
/// An extra column in `actual` can therefore sort between the expected
/// columns and reorder the rows, and a real superset is then reported as a
/// plain mismatch instead of a subset.
pub fn compare_rows(
    expected: &[Vec<String>],
    actual: &[Vec<String>],
    check_order: bool,
) -> OutputComparison {
    match (expected.is_empty(), actual.is_empty()) {
        (true, true) => {
            return OutputComparison {
                equal: true,
                subset: true,
                ..OutputComparison::default()
            };
        }
        (true, false) | (false, true) => {
            let difference = expected.len().abs_diff(actual.len());
            return OutputComparison {
                difference,
                messages: vec![format!(
                    "❌ Your query returned {} row(s) but {} were expected.",
                    actual.len(),
                    expected.len()
                )],
                hints: vec!["Review your filter conditions and joins.".to_string()],
                ..OutputComparison::default()
            };
        }
        (false, false) => {}
    }

    let expected = canonicalize(expected, check_order);
    let actual = canonicalize(actual, check_order);

    let expected_cols = expected.iter().map(Vec::len).max().unwrap_or(0);
    let actual_cols = actual.iter().map(Vec::len).max().unwrap_or(0);
    let subset = expected.len() <= actual.len()
        && expected_cols <= actual_cols
        && is_sequence_contained(&expected, &actual);

    let cells = |grid: &[Vec<String>]| grid.iter().map(Vec::len).sum::<usize>();
    let difference = cells(&expected) + cells(&actual) - 2 * max_overlap(&expected, &actual);
    let equal = subset && difference == 0;

    let mut comparison = OutputComparison {
        equal,
        subset,
        difference,
        ..OutputComparison::default()
    };
    if equal {
        return comparison;
    }
    if subset {
        comparison.messages.push(format!(
            "⚠️ Your query returned every expected row, plus {difference} extra cell(s)."
        ));
        comparison
            .hints
            .push("Tighten your WHERE clause or select fewer columns.".to_string());
    } else {
        comparison.messages.push(format!(
            "❌ Your query output differs from the expected output in {difference} cell(s)."
        ));
        comparison
            .hints
            .push("Compare the selected columns and filter conditions with the task.".to_string());
    }
    comparison
}

/// Table name of an entry, or its detail for entries without a real table.
fn subject(entry: &DiffEntry) -> &str {
    if entry.is_permission_error() && !entry.detail.is_empty() {
        &entry.detail
    } else {
        &entry.table
    }
}

/// Message and hint for an expected change the submission did not make.
fn missing_feedback(entry: &DiffEntry) -> (String, String) {
    let (table, detail) = (entry.table.as_str(), entry.detail.as_str());
    if entry.is_constraint_error() {
        let kind = &entry.operation;
        return (
            format!("❌ Your query should have violated a {kind}, but it did not."),
            format!("Review the data to trigger the {kind}."),
        );
    }
    if entry.is_permission_error() {
        let table = subject(entry);
        return (
            format!("❌ You lack permission to modify table '{table}'."),
            format!("Check your GRANT privileges for {table}."),
        );
    }
    match entry.operation.as_str() {
        "table_created" => (
            format!("❌ You forgot to create the table '{table}'."),
            format!("Add: CREATE TABLE {table} ...;"),
        ),
        "column_added" => (
            format!("❌ You did not add the column '{detail}' to table '{table}'."),
            format!("Add column {detail} to {table}."),
        ),
        "column_removed" => (
            format!("❌ You did not remove the column '{detail}' from table '{table}'."),
            format!("Drop column {detail} from {table}."),
        ),
        "column_type_changed" => (
            format!("❌ You did not change the column type in table '{table}': {detail}."),
            format!("Alter the column type in {table}: {detail}."),
        ),
        "added" => (
            format!("❌ You did not insert this row into '{table}': {detail}."),
            format!("INSERT INTO {table} VALUES({detail});"),
        ),
        "removed" => (
            format!("❌ You did not delete this row from '{table}': {detail}."),
            format!("DELETE FROM {table} WHERE ...;"),
        ),
        _ => (
            format!("❌ An expected change is missing: {entry}."),
            "Review the statement against the task description.".to_string(),
        ),
    }
}

/// Message and hint for a change the submission made but should not have.
fn extra_feedback(entry: &DiffEntry) -> (String, String) {
    let (table, detail) = (entry.table.as_str(), entry.detail.as_str());
    if entry.is_constraint_error() {
        let kind = &entry.operation;
        return (
            format!("⚠️ Your query unexpectedly triggered a {kind}."),
            format!("Check why the {kind} was raised."),
        );
    }
    if entry.is_permission_error() {
        let table = subject(entry);
        return (
            format!("⚠️ You hit a permission error on '{table}'."),
            format!("Check your GRANT privileges for {table}."),
        );
    }
    match entry.operation.as_str() {
        "table_created" => (
            format!("⚠️ You created an extra table '{table}' that wasn’t needed."),
            format!("Remove: DROP TABLE {table};"),
        ),
        "column_added" => (
            format!("⚠️ You added an unnecessary column '{detail}' to table '{table}'."),
            format!("Drop column {detail} from {table}."),
        ),
        "column_removed" => (
            format!("⚠️ You removed the column '{detail}' from table '{table}', but it should stay."),
            format!("Re-add column {detail} to {table}."),
        ),
        "column_type_changed" => (
            format!("⚠️ You changed a column type in table '{table}' that should stay: {detail}."),
            format!("Keep the original column type in {table}."),
        ),
        "added" => (
            format!("⚠️ You inserted an extra row into '{table}': {detail}."),
            "Remove that INSERT from your query.".to_string(),
        ),
        "removed" => (
            format!("⚠️ You deleted a row from '{table}' that shouldn’t have been removed: {detail}."),
            "Remove that DELETE from your query.".to_string(),
        ),
        _ => (
            format!("⚠️ Your query made an unexpected change: {entry}."),
            "Remove the statement part that causes this change.".to_string(),
        ),
    }
}

/// Compares the changes a non-SELECT statement made with the expected ones.
///
/// Entries are matched as a multiset; each unmatched expected entry and each
/// unmatched actual entry yields its own diagnostic.
pub fn compare_changes(expected: &[DiffEntry], actual: &[DiffEntry]) -> OutputComparison {
    let mut pool: Vec<Option<&DiffEntry>> = actual.iter().map(Some).collect();
    let mut missing = Vec::new();
    for entry in expected {
        match pool.iter_mut().find(|slot| slot.is_some_and(|e| e == entry)) {
            Some(slot) => *slot = None,
            None => missing.push(entry),
        }
    }
    let extra: Vec<&DiffEntry> = pool.into_iter().flatten().collect();

    let mut comparison = OutputComparison {
        equal: missing.is_empty() && extra.is_empty(),
        subset: missing.is_empty(),
        difference: missing.len() + extra.len(),
        ..OutputComparison::default()
    };
    for (message, hint) in missing
        .into_iter()
        .map(missing_feedback)
        .chain(extra.into_iter().map(extra_feedback))
    {
        comparison.messages.push(message);
        comparison.hints.push(hint);
    }
    comparison
}

/// Compares two statement outputs of either kind. Outputs of different kinds
/// never match.
pub fn compare_outputs(
    expected: &QueryOutput,
    actual: &QueryOutput,
    check_order: bool,
) -> OutputComparison {
    match (expected, actual) {
        (QueryOutput::Rows(expected), QueryOutput::Rows(actual)) => {
            compare_rows(expected, actual, check_order)
        }
        (QueryOutput::Changes(expected), QueryOutput::Changes(actual)) => {
            compare_changes(expected, actual)
        }
        _ => OutputComparison {
            difference: 1,
            messages: vec![
                "❌ Your statement produces a different kind of output than the expected one."
                    .to_string(),
            ],
            hints: vec!["Check that you used the right statement type.".to_string()],
            ..OutputComparison::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn column_order_is_ignored() {
        let expected = grid(&[&["1", "a"], &["2", "b"]]);
        let actual = grid(&[&["a", "1"], &["b", "2"]]);
        let result = compare_rows(&expected, &actual, true);
        assert!(result.equal);
    }

    #[test]
    fn max_overlap_finds_shifted_grid() {
        let a = grid(&[&["x", "y"]]);
        let b = grid(&[&["q", "q"], &["q", "x"]]);
        assert_eq!(max_overlap(&a, &b), 1);
    }

    #[test]
    fn one_empty_side_counts_row_difference() {
        let expected = grid(&[&["1"], &["2"], &["3"]]);
        let result = compare_rows(&expected, &[], false);
        assert!(!result.equal && !result.subset);
        assert_eq!(result.difference, 3);
    }

    #[test]
    fn missing_row_is_reported_with_insert_hint() {
        let expected = vec![DiffEntry::new("book", "added", "1, 'Dune'")];
        let result = compare_changes(&expected, &[]);
        assert!(!result.equal);
        assert_eq!(
            result.messages,
            vec!["❌ You did not insert this row into 'book': 1, 'Dune'.".to_string()]
        );
        assert_eq!(result.hints, vec!["INSERT INTO book VALUES(1, 'Dune');".to_string()]);
    }

    #[test]
    fn mixed_output_kinds_never_match() {
        let rows = QueryOutput::Rows(Vec::new());
        let changes = QueryOutput::Changes(Vec::new());
        assert!(!compare_outputs(&rows, &changes, false).equal);
    }
}
