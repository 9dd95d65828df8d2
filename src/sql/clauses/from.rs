#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! FROM / USING clauses: tables, joins and common table expressions.

use itertools::Itertools;

use super::{
    comparison::ClauseComparison,
    condition::{self, ConditionNode},
    expr::{self, Scope},
    sorted_difference,
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Name used for a join nested inside another join.
pub const NESTED_JOIN: &str = "(nested join)";

/// A table (or table-like source) named in a FROM clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    /// Table name, `(subquery)` or `(function)`.
    pub name:  String,
    /// Alias, empty when none was given.
    pub alias: String,
}

/// A join between two sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinInfo {
    /// Parser join type, e.g. `JOIN_INNER`, `JOIN_LEFT`.
    pub join_type:     String,
    /// Left source.
    pub left:          TableRef,
    /// Right source.
    pub right:         TableRef,
    /// `ON` condition, if any.
    pub condition:     Option<ConditionNode>,
    /// True for `NATURAL` joins.
    pub is_natural:    bool,
    /// Columns listed in `USING (...)`.
    pub using_columns: Vec<String>,
}

impl JoinInfo {
    /// Rendered join condition, empty when there is none.
    pub fn condition_text(&self) -> String {
        self.condition
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Human wording of the join type.
    fn describe_type(&self) -> &'static str {
        if self.is_natural {
            return "a natural join";
        }
        match self.join_type.as_str() {
            "JOIN_INNER" => "an inner join",
            "JOIN_LEFT" => "a left join",
            "JOIN_RIGHT" => "a right join",
            "JOIN_FULL" => "a full join",
            "JOIN_CROSS" => "a cross join",
            _ => "a join",
        }
    }
}

/// Sources of a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromInfo {
    /// Every table referenced, including both sides of each join.
    pub tables: Vec<TableRef>,
    /// Joins in the order they appear.
    pub joins:  Vec<JoinInfo>,
    /// Names of common table expressions.
    pub ctes:   Vec<String>,
}

impl FromInfo {
    /// Extracts the sources of a statement node from its `fromClause` (or,
    /// failing that, `usingClause`) and `withClause`.
    pub fn extract(statement: &ParseNode) -> Self {
        let mut info = Self::default();
        if let Some(list) = statement
            .child("fromClause")
            .or_else(|| statement.child("usingClause"))
        {
            info.add_sources(list);
        }
        if let Some(ctes) = statement.path(&["withClause", "ctes"]) {
            info.ctes = ctes
                .children()
                .iter()
                .filter(|c| c.key() == "CommonTableExpr")
                .map(|c| c.value_of("ctename"))
                .collect();
        }
        info
    }

    /// True when no table was found.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.joins.is_empty() && self.ctes.is_empty()
    }

    /// Scope resolving the aliases declared here.
    pub fn scope(&self) -> Scope {
        self.tables
            .iter()
            .fold(Scope::new(), |scope, t| scope.with_table(&t.alias, &t.name))
    }

    /// Adds every source of a `fromClause`/`usingClause` list.
    fn add_sources(&mut self, list: &ParseNode) {
        for item in list.children() {
            match item.key() {
                "JoinExpr" => {
                    self.add_join(item);
                }
                _ => {
                    if let Some(table) = table_ref(item) {
                        self.tables.push(table);
                    }
                }
            }
        }
    }

    /// Records a join and its sources, returning the placeholder for the
    /// join itself.
    fn add_join(&mut self, join: &ParseNode) -> TableRef {
        let mut side = |key: &str| -> TableRef {
            let Some(node) = join.child(key).and_then(|n| n.children().first()) else {
                return TableRef::default();
            };
            if node.key() == "JoinExpr" {
                self.add_join(node)
            } else {
                let table = table_ref(node).unwrap_or_default();
                self.tables.push(table.clone());
                table
            }
        };
        let left = side("larg");
        let right = side("rarg");

        let scope = self.scope();
        let condition = join
            .child("quals")
            .and_then(|q| q.children().first())
            .map(|q| {
                condition::extract_condition(q, &scope)
                    .unwrap_or_else(|| ConditionNode::simple(expr::render(q, &scope), "", ""))
            });

        self.joins.push(JoinInfo {
            join_type: join.value_of("jointype"),
            left,
            right,
            condition,
            is_natural: join.value_of("isNatural") == "true",
            using_columns: expr::string_values_of(join.child("usingClause")),
        });

        TableRef {
            name:  NESTED_JOIN.to_string(),
            alias: join
                .path(&["alias", "aliasname"])
                .map(|a| strip_quotes(a.value()))
                .unwrap_or_default(),
        }
    }

    /// Goal sentence describing the sources.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if !self.ctes.is_empty() {
            out.push_str(&format!(
                "Using Common Table Expressions (CTEs): {}. ",
                self.ctes.join(", ")
            ));
        }
        if !self.joins.is_empty() {
            let joins = self
                .joins
                .iter()
                .map(|j| {
                    let mut text = format!("{} between {} and {}", j.describe_type(), j.left.name, j.right.name);
                    if j.is_natural {
                        text.push_str(" (natural join)");
                    } else if !j.using_columns.is_empty() {
                        text.push_str(&format!(" using ({})", j.using_columns.join(", ")));
                    } else if j.condition.is_some() {
                        text.push_str(&format!(" on {}", j.condition_text()));
                    }
                    text
                })
                .join("; then ");
            out.push_str(&format!("Identify data sources by performing {joins}"));
        } else if !self.tables.is_empty() {
            out.push_str(&format!(
                "Identify data source(s): {}",
                self.tables.iter().map(|t| t.name.as_str()).join(", ")
            ));
        } else {
            out.push_str("No tables in FROM clause.");
        }
        out
    }

    /// One-line description used inside DELETE and UPDATE goals; empty when
    /// there are no sources.
    pub fn describe_inline(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            self.describe()
        }
    }
}

/// Reads a table-like range item.
fn table_ref(node: &ParseNode) -> Option<TableRef> {
    let alias = node
        .path(&["alias", "aliasname"])
        .map(|a| strip_quotes(a.value()))
        .unwrap_or_default();
    let name = match node.key() {
        "RangeVar" => strip_quotes(&node.value_of("relname")),
        "RangeSubselect" => expr::SUBQUERY.to_string(),
        "RangeFunction" => "(function)".to_string(),
        _ => return None,
    };
    Some(TableRef { name, alias })
}

/// Sorted names of `tables`.
fn sorted_names(tables: &[TableRef]) -> Vec<String> {
    tables.iter().map(|t| t.name.clone()).sorted().collect()
}

/// Compares two FROM clauses.
pub fn compare(reference: &FromInfo, submission: &FromInfo) -> ClauseComparison {
    if reference.tables.is_empty() && submission.tables.is_empty() {
        return ClauseComparison::absent("Both queries have no from clause.");
    }

    let mut message = String::new();

    let (ref_tables, sub_tables) = (sorted_names(&reference.tables), sorted_names(&submission.tables));
    if ref_tables != sub_tables {
        message.push_str("\n ● Mismatch in FROM clause tables.\n");
        let missing = sorted_difference(&ref_tables, &sub_tables);
        let extra = sorted_difference(&sub_tables, &ref_tables);
        if !missing.is_empty() {
            message.push_str(&format!("● Missing tables: {}.\n", expr::join_quoted(&missing, ",")));
        }
        if !extra.is_empty() {
            message.push_str(&format!("● Extra tables: {}.\n", expr::join_quoted(&extra, ",")));
        }
    }

    if reference.joins.len() != submission.joins.len() {
        message.push_str("● Joins: Mismatch in the number of joins.\n");
    } else {
        for (i, (r, s)) in reference.joins.iter().zip(&submission.joins).enumerate() {
            compare_join(i + 1, r, s, &mut message);
        }
    }

    let (ref_ctes, sub_ctes) = (
        reference.ctes.iter().cloned().sorted().collect::<Vec<_>>(),
        submission.ctes.iter().cloned().sorted().collect::<Vec<_>>(),
    );
    if ref_ctes != sub_ctes {
        message.push_str("● Mismatch in common table expressions (CTEs).\n");
        let missing = sorted_difference(&ref_ctes, &sub_ctes);
        let extra = sorted_difference(&sub_ctes, &ref_ctes);
        if !missing.is_empty() {
            message.push_str(&format!("● Missing CTEs: {}.\n", missing.join(", ")));
        }
        if !extra.is_empty() {
            message.push_str(&format!("● Extra CTEs: {}.\n", extra.join(", ")));
        }
    }

    ClauseComparison::from_message(message, Vec::new())
}

/// Compares the `n`th join of both statements.
fn compare_join(n: usize, reference: &JoinInfo, submission: &JoinInfo, message: &mut String) {
    if reference.join_type != submission.join_type {
        message.push_str(&format!(
            "● Join {n}: Expected join type '{}', but found '{}'.\n",
            reference.join_type, submission.join_type
        ));
        return;
    }

    if reference.join_type == "JOIN_INNER" {
        let expected: Vec<String> = [&reference.left.name, &reference.right.name]
            .into_iter()
            .cloned()
            .sorted()
            .dedup()
            .collect();
        let found: Vec<String> = [&submission.left.name, &submission.right.name]
            .into_iter()
            .cloned()
            .sorted()
            .dedup()
            .collect();
        if expected != found {
            message.push_str(&format!(
                "● Join {n}: Mismatch in joined tables for INNER JOIN.\n● Expected tables: {}.\n● Found tables: \
                 {}.\n",
                expr::join_quoted(&expected, ","),
                expr::join_quoted(&found, ",")
            ));
        }
    } else if reference.left.name != submission.left.name || reference.right.name != submission.right.name {
        message.push_str(&format!(
            "● Join {n}: Mismatch in joined tables for {}.\n● Expected tables: {}, {}.\n● Found tables: {}, {}.\n",
            reference.join_type, reference.left.name, reference.right.name, submission.left.name, submission.right.name
        ));
    }

    let same_condition = match (&reference.condition, &submission.condition) {
        (Some(a), Some(b)) => a.signature() == b.signature(),
        (None, None) => true,
        _ => false,
    };
    if !same_condition {
        message.push_str(&format!(
            "● Join {n}: Mismatch in join condition.\n● Expected condition: {}.\n● Found condition: {}.\n",
            reference.condition_text(),
            submission.condition_text()
        ));
    }

    if reference.using_columns != submission.using_columns || reference.is_natural != submission.is_natural {
        message.push_str(&format!("● Join {n}: Mismatch in USING columns or NATURAL join.\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_empty_is_absent() {
        let result = compare(&FromInfo::default(), &FromInfo::default());
        assert_eq!(result.outcome, crate::sql::clauses::ClauseOutcome::Absent);
    }
}
