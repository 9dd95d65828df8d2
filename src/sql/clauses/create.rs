#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! CREATE TABLE statements.
//!
//! Identifiers are lower-cased on extraction so that every name comparison
//! below is case-insensitive. Foreign keys and unique constraints are paired
//! by their local column sets; CHECK constraints by canonical signature.

use itertools::Itertools;

use super::{
    comparison::ComparisonResult,
    condition::{self, ConditionNode},
    expr::{self, Scope},
    sorted_difference,
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// One column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name:      String,
    /// Type name, the last component of the declared type.
    pub type_name: String,
    /// True when declared `NOT NULL` or part of the primary key.
    pub not_null:  bool,
}

/// A `FOREIGN KEY` constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing columns.
    pub local_columns:      Vec<String>,
    /// Referenced table.
    pub referenced_table:   String,
    /// Referenced columns, possibly empty (the referenced primary key).
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Sorted local columns, used to pair constraints.
    fn key(&self) -> Vec<String> {
        self.local_columns.iter().cloned().sorted().collect()
    }
}

/// Everything extracted from a `CreateStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateInfo {
    /// Table name.
    pub table:        String,
    /// Columns in declaration order.
    pub columns:      Vec<ColumnDef>,
    /// Primary key columns, in declaration order.
    pub primary_key:  Vec<String>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
    /// Column sets of the UNIQUE constraints, each sorted.
    pub uniques:      Vec<Vec<String>>,
    /// CHECK constraints, column- and table-level.
    pub checks:       Vec<ConditionNode>,
}

/// Lower-cased `sval`s of a list.
fn names_of(list: Option<&std::sync::Arc<ParseNode>>) -> Vec<String> {
    expr::string_values_of(list)
        .into_iter()
        .map(|n| n.to_lowercase())
        .collect()
}

impl CreateInfo {
    /// Extracts a `CreateStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        let mut info = Self {
            table: statement
                .path(&["relation", "relname"])
                .map(|n| strip_quotes(n.value()).to_lowercase())
                .unwrap_or_default(),
            ..Self::default()
        };
        let scope = Scope::new();

        let Some(elements) = statement.child("tableElts") else {
            return info;
        };
        for element in elements.children() {
            match element.key() {
                "ColumnDef" => info.add_column(element, &scope),
                "Constraint" => info.add_constraint(element, None, &scope),
                _ => {}
            }
        }
        for column in &mut info.columns {
            if info.primary_key.contains(&column.name) {
                column.not_null = true;
            }
        }
        info
    }

    /// Adds a column definition and its column-level constraints.
    fn add_column(&mut self, column: &ParseNode, scope: &Scope) {
        let name = strip_quotes(&column.value_of("colname")).to_lowercase();
        let type_name = column
            .path(&["typeName", "names"])
            .and_then(|n| expr::string_values(n).pop())
            .unwrap_or_default()
            .to_lowercase();
        let mut def = ColumnDef {
            name: name.clone(),
            type_name,
            not_null: false,
        };
        if let Some(constraints) = column.child("constraints") {
            for constraint in constraints.children().iter().filter(|c| c.key() == "Constraint") {
                if constraint.value_of("contype") == "CONSTR_NOTNULL" {
                    def.not_null = true;
                }
                self.add_constraint(constraint, Some(&name), scope);
            }
        }
        self.columns.push(def);
    }

    /// Adds a constraint; `column` is set for column-level constraints.
    fn add_constraint(&mut self, constraint: &ParseNode, column: Option<&str>, scope: &Scope) {
        let own_column = || column.map(|c| vec![c.to_string()]).unwrap_or_default();
        match constraint.value_of("contype").as_str() {
            "CONSTR_PRIMARY" => {
                let keys = names_of(constraint.child("keys"));
                self.primary_key
                    .extend(if keys.is_empty() { own_column() } else { keys });
            }
            "CONSTR_FOREIGN" => {
                let local = names_of(constraint.child("fk_attrs"));
                self.foreign_keys.push(ForeignKey {
                    local_columns:      if local.is_empty() { own_column() } else { local },
                    referenced_table:   constraint
                        .path(&["pktable", "relname"])
                        .map(|n| strip_quotes(n.value()).to_lowercase())
                        .unwrap_or_default(),
                    referenced_columns: names_of(constraint.child("pk_attrs")),
                });
            }
            "CONSTR_UNIQUE" => {
                let keys = names_of(constraint.child("keys"));
                let keys = if keys.is_empty() { own_column() } else { keys };
                self.uniques.push(keys.into_iter().sorted().collect());
            }
            "CONSTR_CHECK" => {
                if let Some(check) = constraint
                    .child("raw_expr")
                    .and_then(|r| r.children().first())
                {
                    self.checks.push(
                        condition::extract_condition(check, scope)
                            .unwrap_or_else(|| ConditionNode::simple(expr::render(check, scope), "", "")),
                    );
                }
            }
            _ => {}
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.table.is_empty() {
            return "No CREATE statement found.".to_string();
        }
        let mut out = format!("Create a table named '{}'. ", self.table);
        if !self.columns.is_empty() {
            let columns: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    if c.not_null {
                        format!("{} {} NOT NULL", c.name, c.type_name)
                    } else {
                        format!("{} {}", c.name, c.type_name)
                    }
                })
                .collect();
            let listed = match columns.as_slice() {
                [init @ .., last] if !init.is_empty() => format!("{} and {last}", init.join(", ")),
                _ => columns.join(""),
            };
            out.push_str(&format!("Columns: {listed}. "));
        }
        if !self.primary_key.is_empty() {
            out.push_str(&format!("Primary key on ({}). ", self.primary_key.join(", ")));
        }
        if !self.foreign_keys.is_empty() {
            let fks = self
                .foreign_keys
                .iter()
                .map(|fk| {
                    format!(
                        "FOREIGN KEY ({}) REFERENCES {} ({})",
                        fk.local_columns.join(", "),
                        fk.referenced_table,
                        fk.referenced_columns.join(", ")
                    )
                })
                .join("; ");
            out.push_str(&format!("Foreign keys: {fks}. "));
        }
        if !self.uniques.is_empty() {
            let uniques = self
                .uniques
                .iter()
                .map(|u| format!("UNIQUE ({})", u.join(", ")))
                .join("; ");
            out.push_str(&format!("Unique constraints: {uniques}. "));
        }
        if !self.checks.is_empty() {
            out.push_str(&format!("Check constraints: {}. ", self.checks.iter().join("; ")));
        }
        out.trim_end().to_string()
    }
}

/// Compares two CREATE TABLE statements.
pub fn compare(reference: &CreateInfo, submission: &CreateInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.table == submission.table {
        result.correct("Table name");
    } else {
        result.incorrect(
            "Table name",
            format!(
                "● The table name should be '{}', but your query uses '{}'.\n",
                reference.table, submission.table
            ),
        );
        result.hint(format!("💡 Change the table name to '{}'.", reference.table));
    }

    compare_columns(reference, submission, &mut result);
    compare_primary_key(&reference.primary_key, &submission.primary_key, &mut result);
    compare_foreign_keys(&reference.foreign_keys, &submission.foreign_keys, &mut result);
    compare_uniques(&reference.uniques, &submission.uniques, &mut result);
    compare_checks(&reference.checks, &submission.checks, &mut result);

    result
}

/// Column names, then type and NOT NULL of each shared column.
fn compare_columns(reference: &CreateInfo, submission: &CreateInfo, result: &mut ComparisonResult) {
    let names = |info: &CreateInfo| -> Vec<String> { info.columns.iter().map(|c| c.name.clone()).sorted().collect() };
    let (expected, found) = (names(reference), names(submission));
    if expected == found {
        if !expected.is_empty() {
            result.correct("Column names");
        }
    } else {
        let missing = sorted_difference(&expected, &found);
        let extra = sorted_difference(&found, &expected);
        let mut message = String::new();
        if !missing.is_empty() {
            message.push_str(&format!(
                "● Your CREATE statement is missing these column(s): {}.\n",
                missing.join(", ")
            ));
            result.hint(format!("💡 Add the missing column(s): {}.", missing.join(", ")));
        }
        if !extra.is_empty() {
            message.push_str(&format!(
                "● Your CREATE statement includes extra column(s): {}.\n",
                extra.join(", ")
            ));
            result.hint(format!("💡 Remove the extra column(s): {}.", extra.join(", ")));
        }
        result.incorrect("Column names", message);
    }

    for expected in &reference.columns {
        let Some(found) = submission.columns.iter().find(|c| c.name == expected.name) else {
            continue;
        };
        let type_part = format!("Type of '{}'", expected.name);
        if expected.type_name == found.type_name {
            result.correct(type_part);
        } else {
            result.incorrect(
                type_part,
                format!(
                    "● The type for column '{}' should be '{}', but you have '{}'.\n",
                    expected.name, expected.type_name, found.type_name
                ),
            );
            result.hint(format!(
                "💡 Change the type of column '{}' to '{}'.",
                expected.name, expected.type_name
            ));
        }

        let not_null_part = format!("NOT NULL constraint for '{}'", expected.name);
        if expected.not_null == found.not_null {
            result.correct(not_null_part);
        } else {
            result.incorrect(
                not_null_part,
                format!(
                    "● Column '{}' should {} a NOT NULL constraint, but your statement {} it.\n",
                    expected.name,
                    if expected.not_null { "have" } else { "not have" },
                    if found.not_null { "has" } else { "does not have" }
                ),
            );
            result.hint(format!(
                "💡 {} the NOT NULL constraint on column '{}'.",
                if expected.not_null { "Add" } else { "Remove" },
                expected.name
            ));
        }
    }
}

/// Primary key column sets.
fn compare_primary_key(reference: &[String], submission: &[String], result: &mut ComparisonResult) {
    if reference.is_empty() && submission.is_empty() {
        return;
    }
    let expected: Vec<String> = reference.iter().cloned().sorted().collect();
    let found: Vec<String> = submission.iter().cloned().sorted().collect();
    if expected == found {
        result.correct("Primary key");
        return;
    }

    if expected.len() > 1 && found.len() == 1 {
        result.incorrect(
            "Primary key",
            format!(
                "● Your statement defines a primary key only on '{}', but the requirement is a composite primary key on \
                 ({}).\n",
                found[0],
                expected.join(", ")
            ),
        );
        result.hint(format!(
            "💡 Define a composite primary key on ({}).",
            expected.join(", ")
        ));
        return;
    }

    let missing = sorted_difference(&expected, &found);
    let extra = sorted_difference(&found, &expected);
    let mut message = String::new();
    if !missing.is_empty() {
        message.push_str(&format!("● Missing primary key column(s): {}.\n", missing.join(", ")));
    }
    if !extra.is_empty() {
        message.push_str(&format!("● Extra primary key column(s): {}.\n", extra.join(", ")));
    }
    result.incorrect("Primary key", message);
    result.hint(format!("💡 The primary key should be on ({}).", expected.join(", ")));
}

/// Foreign keys, paired by local column set.
fn compare_foreign_keys(reference: &[ForeignKey], submission: &[ForeignKey], result: &mut ComparisonResult) {
    const PART: &str = "Foreign keys";
    if reference.is_empty() {
        if !submission.is_empty() {
            result.incorrect(PART, "● Unexpected FOREIGN KEY constraint(s) found.\n");
            result.hint("💡 Remove the FOREIGN KEY constraint definitions.");
        }
        return;
    }
    if reference.len() != submission.len() {
        result.incorrect(
            PART,
            format!(
                "● Expected {} foreign key constraint(s), but found {}.\n",
                reference.len(),
                submission.len()
            ),
        );
        result.hint("💡 Review your FOREIGN KEY constraint definitions.");
        return;
    }

    let mut message = String::new();
    let mut unused: Vec<&ForeignKey> = submission.iter().collect();
    for (i, expected) in reference.iter().enumerate() {
        let n = i + 1;
        let position = unused
            .iter()
            .position(|fk| fk.key() == expected.key())
            .or(if unused.is_empty() { None } else { Some(0) });
        let Some(position) = position else {
            continue;
        };
        let found = unused.remove(position);
        if found.key() != expected.key() {
            message.push_str(&format!(
                "● For FOREIGN KEY constraint {n}, expected local column(s): ({}) but found: ({}).\n",
                expected.local_columns.join(", "),
                found.local_columns.join(", ")
            ));
        }
        if found.referenced_table != expected.referenced_table {
            message.push_str(&format!(
                "● For FOREIGN KEY constraint {n}, expected referenced table '{}' but found '{}'.\n",
                expected.referenced_table, found.referenced_table
            ));
        }
        if found.referenced_columns != expected.referenced_columns {
            message.push_str(&format!(
                "● For FOREIGN KEY constraint {n}, expected referenced column(s): ({}) but found: ({}).\n",
                expected.referenced_columns.join(", "),
                found.referenced_columns.join(", ")
            ));
        }
    }

    if message.is_empty() {
        result.correct(PART);
    } else {
        result.incorrect(PART, message);
        result.hint("💡 Adjust your FOREIGN KEY constraints to reference the required tables and columns.");
    }
}

/// UNIQUE constraints, compared as sets of column sets.
fn compare_uniques(reference: &[Vec<String>], submission: &[Vec<String>], result: &mut ComparisonResult) {
    const PART: &str = "Unique constraints";
    if reference.is_empty() {
        if !submission.is_empty() {
            result.incorrect(PART, "● Unexpected UNIQUE constraint(s) found.\n");
            result.hint("💡 Remove the UNIQUE constraint definitions.");
        }
        return;
    }
    if reference.len() != submission.len() {
        result.incorrect(
            PART,
            format!(
                "● Expected {} UNIQUE constraint(s), but found {}.\n",
                reference.len(),
                submission.len()
            ),
        );
        result.hint("💡 Review your UNIQUE constraint definitions.");
        return;
    }

    let expected: Vec<&Vec<String>> = reference.iter().sorted().collect();
    let found: Vec<&Vec<String>> = submission.iter().sorted().collect();
    let mut message = String::new();
    for (i, (e, f)) in expected.iter().zip(&found).enumerate() {
        if e != f {
            message.push_str(&format!(
                "● For UNIQUE constraint {}, expected column(s): {} but found: {}.\n",
                i + 1,
                e.join(", "),
                f.join(", ")
            ));
        }
    }
    if message.is_empty() {
        result.correct(PART);
    } else {
        result.incorrect(PART, message);
        result.hint("💡 Adjust the columns covered by your UNIQUE constraints.");
    }
}

/// CHECK constraints, matched by canonical signature.
fn compare_checks(reference: &[ConditionNode], submission: &[ConditionNode], result: &mut ComparisonResult) {
    const PART: &str = "Check constraints";
    if reference.is_empty() {
        if !submission.is_empty() {
            result.incorrect(PART, "● Unexpected CHECK constraint(s) found.\n");
            result.hint("💡 Remove the CHECK constraint definitions.");
        }
        return;
    }
    if reference.len() != submission.len() {
        result.incorrect(
            PART,
            format!(
                "● Expected {} CHECK constraint(s), but found {}.\n",
                reference.len(),
                submission.len()
            ),
        );
        result.hint("💡 Review your CHECK constraint definitions.");
        return;
    }

    let mut unused: Vec<&ConditionNode> = submission.iter().collect();
    let mut message = String::new();
    let mut hints = Vec::new();
    for (i, expected) in reference.iter().enumerate() {
        let signature = expected.signature();
        if let Some(position) = unused.iter().position(|c| c.signature() == signature) {
            unused.remove(position);
            continue;
        }
        let found = if unused.is_empty() { None } else { Some(unused.remove(0)) };
        message.push_str(&format!(
            "● For CHECK constraint {}, expected: {expected} but found: {}.\n",
            i + 1,
            found.map(ToString::to_string).unwrap_or_default()
        ));
        hints.push(format!("💡 Adjust the CHECK constraint definition {}.", i + 1));
    }
    if message.is_empty() {
        result.correct(PART);
    } else {
        result.incorrect(PART, message);
        for hint in hints {
            result.hint(hint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(pk: &str) -> CreateInfo {
        CreateInfo {
            table: "book".into(),
            columns: vec![
                ColumnDef {
                    name:      "isbn".into(),
                    type_name: "varchar".into(),
                    not_null:  true,
                },
                ColumnDef {
                    name:      "title".into(),
                    type_name: "varchar".into(),
                    not_null:  false,
                },
            ],
            primary_key: vec![pk.to_string()],
            ..CreateInfo::default()
        }
    }

    #[test]
    fn primary_key_mismatch_names_both_columns() {
        let result = compare(&book("isbn"), &book("title"));
        assert!(!result.equal);
        assert!(result.incorrect_parts.contains(&"Primary key".to_string()));
        assert!(result.message.contains("isbn"));
        assert!(result.message.contains("title"));
    }

    #[test]
    fn unique_sets_ignore_declaration_order() {
        let mut a = book("isbn");
        a.uniques = vec![vec!["a".into()], vec!["b".into(), "c".into()]];
        let mut b = book("isbn");
        b.uniques = vec![vec!["b".into(), "c".into()], vec!["a".into()]];
        assert!(compare(&a, &b).equal);
    }
}
