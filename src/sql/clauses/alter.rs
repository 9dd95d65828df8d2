#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! ALTER TABLE statements.
//!
//! Operations are compared positionally: a submission must perform the same
//! sequence of sub-commands as the reference, each with matching parameters.

use std::fmt;

use super::{
    comparison::ComparisonResult,
    condition,
    expr::{self, Scope},
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Sub-command kinds of an `AlterTableStmt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterKind {
    /// `ADD COLUMN`.
    AddColumn,
    /// `DROP COLUMN`.
    DropColumn,
    /// `ALTER COLUMN ... TYPE`.
    AlterColumnType,
    /// `ALTER COLUMN ... SET NOT NULL`.
    SetNotNull,
    /// `ALTER COLUMN ... DROP NOT NULL`.
    DropNotNull,
    /// `RENAME COLUMN`.
    RenameColumn,
    /// `RENAME TO`.
    RenameTable,
    /// `ADD CONSTRAINT`.
    AddConstraint,
    /// `DROP CONSTRAINT`.
    DropConstraint,
    /// `SET SCHEMA`.
    SetSchema,
    /// `SET TABLESPACE`.
    SetTablespace,
    /// `OWNER TO`.
    OwnerTo,
    /// Any other sub-command, by its raw tag.
    Other(String),
}

impl AlterKind {
    /// Maps an `AlterTableCmd` subtype (`AT_AddColumn`, ...) to a kind.
    fn from_subtype(subtype: &str) -> Self {
        match subtype {
            "AT_AddColumn" => Self::AddColumn,
            "AT_DropColumn" => Self::DropColumn,
            "AT_AlterColumnType" => Self::AlterColumnType,
            "AT_SetNotNull" => Self::SetNotNull,
            "AT_DropNotNull" => Self::DropNotNull,
            "AT_RenameColumn" => Self::RenameColumn,
            "AT_RenameTable" => Self::RenameTable,
            "AT_AddConstraint" => Self::AddConstraint,
            "AT_DropConstraint" => Self::DropConstraint,
            "AT_SetSchema" => Self::SetSchema,
            "AT_SetTableSpace" => Self::SetTablespace,
            "AT_ChangeOwner" | "AT_OwnerTo" => Self::OwnerTo,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AlterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            Self::AddColumn => "ADD COLUMN",
            Self::DropColumn => "DROP COLUMN",
            Self::AlterColumnType => "ALTER COLUMN TYPE",
            Self::SetNotNull => "SET NOT NULL",
            Self::DropNotNull => "DROP NOT NULL",
            Self::RenameColumn => "RENAME COLUMN",
            Self::RenameTable => "RENAME TABLE",
            Self::AddConstraint => "ADD CONSTRAINT",
            Self::DropConstraint => "DROP CONSTRAINT",
            Self::SetSchema => "SET SCHEMA",
            Self::SetTablespace => "SET TABLESPACE",
            Self::OwnerTo => "OWNER TO",
            Self::Other(tag) => tag.as_str(),
        };
        write!(f, "{name}")
    }
}

/// One sub-command of an ALTER TABLE statement.
///
/// Only the parameters meaningful for `kind` are filled; the rest stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterOperation {
    /// Sub-command kind.
    pub kind:            AlterKind,
    /// Column the command acts on.
    pub column:          String,
    /// Declared or new type name.
    pub type_name:       String,
    /// True for `ADD COLUMN ... NOT NULL`.
    pub not_null:        bool,
    /// `CASCADE` or `RESTRICT` for drops.
    pub behavior:        String,
    /// New column or table name, schema, tablespace or owner.
    pub new_name:        String,
    /// Constraint name, when given.
    pub constraint_name: String,
    /// Rendered constraint definition for `ADD CONSTRAINT`.
    pub definition:      String,
    /// Canonical CHECK signature, compared instead of `definition`.
    pub check_signature: Option<String>,
}

impl AlterOperation {
    /// Creates an operation with every parameter empty.
    fn new(kind: AlterKind) -> Self {
        Self {
            kind,
            column: String::new(),
            type_name: String::new(),
            not_null: false,
            behavior: String::new(),
            new_name: String::new(),
            constraint_name: String::new(),
            definition: String::new(),
            check_signature: None,
        }
    }

    /// Extracts one `AlterTableCmd` node.
    fn extract(command: &ParseNode) -> Self {
        let mut op = Self::new(AlterKind::from_subtype(&command.value_of("subtype")));
        let name = strip_quotes(&command.value_of("name")).to_lowercase();
        let column_def = command.path(&["def", "ColumnDef"]);

        match op.kind {
            AlterKind::AddColumn => {
                if let Some(def) = column_def {
                    op.column = strip_quotes(&def.value_of("colname")).to_lowercase();
                    op.type_name = type_name(def);
                    op.not_null = def.child("constraints").is_some_and(|constraints| {
                        constraints
                            .children()
                            .iter()
                            .any(|c| c.key() == "Constraint" && c.value_of("contype") == "CONSTR_NOTNULL")
                    });
                }
            }
            AlterKind::DropColumn => {
                op.column = name;
                op.behavior = command.value_of("behavior");
            }
            AlterKind::AlterColumnType => {
                op.column = name;
                op.type_name = match column_def {
                    Some(def) => type_name(def),
                    None => command
                        .path(&["def", "TypeName", "names"])
                        .and_then(|n| expr::string_values(n).pop())
                        .unwrap_or_default()
                        .to_lowercase(),
                };
            }
            AlterKind::SetNotNull | AlterKind::DropNotNull => op.column = name,
            AlterKind::RenameColumn => {
                op.column = name;
                op.new_name = strip_quotes(&command.value_of("newname")).to_lowercase();
            }
            AlterKind::RenameTable => {
                op.new_name = strip_quotes(&command.value_of("newname")).to_lowercase();
            }
            AlterKind::AddConstraint => {
                if let Some(constraint) = command.path(&["def", "Constraint"]) {
                    op.constraint_name = strip_quotes(&constraint.value_of("conname")).to_lowercase();
                    op.add_constraint(constraint);
                }
            }
            AlterKind::DropConstraint => {
                op.constraint_name = name;
                op.behavior = command.value_of("behavior");
            }
            AlterKind::SetSchema => {
                op.new_name = strip_quotes(&command.value_of("newschema")).to_lowercase();
            }
            AlterKind::SetTablespace => op.new_name = name,
            AlterKind::OwnerTo => {
                op.new_name = command
                    .path(&["newowner", "rolename"])
                    .map(|n| strip_quotes(n.value()).to_lowercase())
                    .unwrap_or_default();
            }
            AlterKind::Other(_) => op.column = name,
        }
        op
    }

    /// Fills `definition` (and `check_signature`) from a `Constraint` node.
    fn add_constraint(&mut self, constraint: &ParseNode) {
        let names = |key: &str| {
            expr::string_values_of(constraint.child(key))
                .into_iter()
                .map(|n| n.to_lowercase())
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.definition = match constraint.value_of("contype").as_str() {
            "CONSTR_PRIMARY" => format!("PRIMARY KEY ({})", names("keys")),
            "CONSTR_UNIQUE" => format!("UNIQUE ({})", names("keys")),
            "CONSTR_FOREIGN" => {
                let table = constraint
                    .path(&["pktable", "relname"])
                    .map(|n| strip_quotes(n.value()).to_lowercase())
                    .unwrap_or_default();
                format!("FOREIGN KEY ({}) REFERENCES {table} ({})", names("fk_attrs"), names("pk_attrs"))
            }
            "CONSTR_CHECK" => {
                let scope = Scope::new();
                match constraint.child("raw_expr").and_then(|r| r.children().first()) {
                    Some(check) => match condition::extract_condition(check, &scope) {
                        Some(node) => {
                            self.check_signature = Some(node.signature());
                            format!("CHECK ({node})")
                        }
                        None => format!("CHECK ({})", expr::render(check, &scope)),
                    },
                    None => "CHECK".to_string(),
                }
            }
            "CONSTR_NOTNULL" => "NOT NULL".to_string(),
            other => other.trim_start_matches("CONSTR_").to_string(),
        };
    }

    /// One-phrase rendering used in goal sentences.
    fn describe(&self) -> String {
        let mut out = self.kind.to_string();
        match self.kind {
            AlterKind::AddColumn => {
                out.push_str(&format!(" {} {}", self.column, self.type_name));
                if self.not_null {
                    out.push_str(" NOT NULL");
                }
            }
            AlterKind::AlterColumnType => out.push_str(&format!(" {} TO {}", self.column, self.type_name)),
            AlterKind::RenameColumn => out.push_str(&format!(" {} TO {}", self.column, self.new_name)),
            AlterKind::AddConstraint => {
                if !self.constraint_name.is_empty() {
                    out.push_str(&format!(" {}", self.constraint_name));
                }
                out.push_str(&format!(" {}", self.definition));
            }
            AlterKind::DropConstraint => out.push_str(&format!(" {}", self.constraint_name)),
            AlterKind::RenameTable | AlterKind::SetSchema | AlterKind::SetTablespace | AlterKind::OwnerTo => {
                out.push_str(&format!(" {}", self.new_name))
            }
            _ => {
                if !self.column.is_empty() {
                    out.push_str(&format!(" {}", self.column));
                }
            }
        }
        out
    }
}

/// Lower-cased last component of a `ColumnDef`'s declared type.
fn type_name(def: &ParseNode) -> String {
    def.path(&["typeName", "names"])
        .and_then(|n| expr::string_values(n).pop())
        .unwrap_or_default()
        .to_lowercase()
}

/// Everything extracted from an `AlterTableStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterInfo {
    /// Altered table.
    pub table:      String,
    /// Sub-commands in statement order.
    pub operations: Vec<AlterOperation>,
}

impl AlterInfo {
    /// Extracts an `AlterTableStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        Self {
            table:      statement
                .path(&["relation", "relname"])
                .map(|n| strip_quotes(n.value()).to_lowercase())
                .unwrap_or_default(),
            operations: statement
                .child("cmds")
                .map(|cmds| {
                    cmds.children()
                        .iter()
                        .filter(|c| c.key() == "AlterTableCmd")
                        .map(|c| AlterOperation::extract(c))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Goal sentence for the statement.
    pub fn describe(&self) -> String {
        if self.table.is_empty() {
            return "No ALTER statement found.".to_string();
        }
        let operations: Vec<String> = self.operations.iter().map(AlterOperation::describe).collect();
        format!("Alter table '{}': {}.", self.table, operations.join("; "))
    }

    /// Comma-separated operation kinds, used in sequence messages.
    fn sequence(&self) -> String {
        self.operations
            .iter()
            .map(|op| op.kind.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Compares the parameters of two operations of the same kind, appending one
/// line per mismatch. Returns true when all match.
fn compare_operation(
    index: usize,
    reference: &AlterOperation,
    submission: &AlterOperation,
    message: &mut String,
) -> bool {
    let before = message.len();
    let mut check = |what: &str, expected: &str, found: &str| {
        if expected != found {
            message.push_str(&format!("● Op {index}: expected {what} '{expected}' but found '{found}'.\n"));
        }
    };

    check("column", &reference.column, &submission.column);
    check("type", &reference.type_name, &submission.type_name);
    check("behavior", &reference.behavior, &submission.behavior);
    check("new name", &reference.new_name, &submission.new_name);
    if reference.not_null != submission.not_null {
        let state = |flag: bool| if flag { "NOT NULL" } else { "nullable" };
        check("nullability", state(reference.not_null), state(submission.not_null));
    }
    if !reference.constraint_name.is_empty() {
        check("constraint name", &reference.constraint_name, &submission.constraint_name);
    }
    let same_check = matches!(
        (&reference.check_signature, &submission.check_signature),
        (Some(expected), Some(found)) if expected == found
    );
    if !same_check {
        check("constraint", &reference.definition, &submission.definition);
    }
    message.len() == before
}

/// Compares two ALTER TABLE statements.
pub fn compare(reference: &AlterInfo, submission: &AlterInfo) -> ComparisonResult {
    let mut result = ComparisonResult::new();

    if reference.table == submission.table {
        result.correct("Table name");
    } else {
        result.incorrect(
            "Table name",
            format!(
                "● The table name should be '{}', but found '{}'.\n",
                reference.table, submission.table
            ),
        );
        result.hint(format!("💡 Alter the table '{}'.", reference.table));
    }

    if reference.operations.len() != submission.operations.len() {
        result.incorrect(
            "Number of operations",
            format!(
                "● Expected {} operation(s), but found {}.\n",
                reference.operations.len(),
                submission.operations.len()
            ),
        );
        result.hint("💡 Perform exactly the ALTER operations that are asked for.");
        return result;
    }
    result.correct("Number of operations");

    let kinds_match = reference
        .operations
        .iter()
        .zip(&submission.operations)
        .all(|(r, s)| r.kind == s.kind);
    if !kinds_match {
        result.incorrect(
            "Operation types",
            format!(
                "● Expected operation sequence: {} but found: {}.\n",
                reference.sequence(),
                submission.sequence()
            ),
        );
        result.hint(format!("💡 Use the operations {} in that order.", reference.sequence()));
        return result;
    }
    result.correct("Operation types");

    for (i, (r, s)) in reference.operations.iter().zip(&submission.operations).enumerate() {
        let label = format!("Operation {}", i + 1);
        let mut message = String::new();
        if compare_operation(i + 1, r, s, &mut message) {
            result.correct(label);
        } else {
            result.incorrect(label, message);
            result.hint(format!("💡 Review the parameters of your {} operation.", r.kind));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_column(name: &str, ty: &str) -> AlterOperation {
        AlterOperation {
            column: name.into(),
            type_name: ty.into(),
            ..AlterOperation::new(AlterKind::AddColumn)
        }
    }

    #[test]
    fn describes_operations_in_order() {
        let info = AlterInfo {
            table:      "book".into(),
            operations: vec![add_column("price", "numeric"), AlterOperation {
                column: "isbn".into(),
                ..AlterOperation::new(AlterKind::DropColumn)
            }],
        };
        assert_eq!(info.describe(), "Alter table 'book': ADD COLUMN price numeric; DROP COLUMN isbn.");
    }

    #[test]
    fn constraint_name_only_checked_when_required() {
        let reference = AlterOperation {
            definition: "UNIQUE (isbn)".into(),
            ..AlterOperation::new(AlterKind::AddConstraint)
        };
        let submission = AlterOperation {
            constraint_name: "book_isbn_key".into(),
            ..reference.clone()
        };
        let mut message = String::new();
        assert!(compare_operation(1, &reference, &submission, &mut message));
        assert!(message.is_empty());
    }

    #[test]
    fn wrong_type_is_reported_per_operation() {
        let reference = AlterInfo {
            table:      "book".into(),
            operations: vec![add_column("price", "numeric")],
        };
        let submission = AlterInfo {
            operations: vec![add_column("price", "int4")],
            ..reference.clone()
        };
        let result = compare(&reference, &submission);
        assert!(!result.equal);
        assert_eq!(result.incorrect_parts, vec!["Operation 1".to_string()]);
        assert_eq!(result.message, "● Op 1: expected type 'numeric' but found 'int4'.\n");
    }
}
