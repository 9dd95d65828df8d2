#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Boolean condition trees, as found in WHERE, HAVING, CHECK and assertion
//! clauses, with their canonical signatures and structural comparison.

use std::{collections::BTreeSet, fmt, sync::Arc};

use super::{
    comparison::ClauseComparison,
    expr::{self, Scope, SUBQUERY},
};
use crate::sql::tree::ParseNode;

/// Operators whose operands may be swapped freely.
const COMMUTATIVE_OPERATORS: [&str; 3] = ["=", "<>", "!="];

/// A recursive boolean condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionNode {
    /// A single predicate `left op right`.
    Simple {
        /// Left operand.
        left:  String,
        /// Operator, e.g. `=`, `IN`, `IS NULL`.
        op:    String,
        /// Right operand, empty for unary tests.
        right: String,
    },
    /// Conjunction.
    And(Vec<ConditionNode>),
    /// Disjunction.
    Or(Vec<ConditionNode>),
    /// Negation.
    Not(Box<ConditionNode>),
}

impl ConditionNode {
    /// Creates a simple predicate.
    pub fn simple(left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        Self::Simple {
            left:  left.into(),
            op:    op.into(),
            right: right.into(),
        }
    }

    /// Name of the node's connective: `SIMPLE`, `AND`, `OR` or `NOT`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Simple { .. } => "SIMPLE",
            Self::And(_) => "AND",
            Self::Or(_) => "OR",
            Self::Not(_) => "NOT",
        }
    }

    /// Canonical form used to compare conditions regardless of operand and
    /// conjunct order.
    ///
    /// Ordering comparisons with a literal on the left are flipped, operands
    /// of commutative operators are sorted, and the children of AND/OR nodes
    /// are sorted by their own signatures.
    pub fn signature(&self) -> String {
        match self {
            Self::Simple { left, op, right } => {
                let (mut left, mut op, mut right) = (left.as_str(), op.as_str(), right.as_str());
                if literal_on_left(left, right)
                    && let Some(flipped) = flipped_operator(op)
                {
                    std::mem::swap(&mut left, &mut right);
                    op = flipped;
                }
                if COMMUTATIVE_OPERATORS.contains(&op) && left > right {
                    std::mem::swap(&mut left, &mut right);
                }
                format!("SIMPLE:{left}{op}{right}")
            }
            Self::And(children) | Self::Or(children) => {
                let mut out = format!("{}:", self.kind_name());
                for sig in sorted_signatures(children) {
                    out.push_str(&sig);
                    out.push(';');
                }
                out
            }
            Self::Not(child) => format!("NOT:{}", child.signature()),
        }
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::And(children) | Self::Or(children) => {
                let delimiter = if matches!(self, Self::And(_)) { " and " } else { " or " };
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(delimiter))
            }
            Self::Not(child) => write!(f, "not ({child})"),
        }
    }
}

/// True when `left` looks like a literal and `right` like an identifier.
fn literal_on_left(left: &str, right: &str) -> bool {
    let (Some(l), Some(r)) = (left.chars().next(), right.chars().next()) else {
        return false;
    };
    (l.is_ascii_digit() || l == '\'') && (r.is_alphabetic() || r == '_')
}

/// Mirror image of an ordering operator.
fn flipped_operator(op: &str) -> Option<&'static str> {
    match op {
        "<" => Some(">"),
        ">" => Some("<"),
        "<=" => Some(">="),
        ">=" => Some("<="),
        _ => None,
    }
}

/// Child signatures in ascending order.
fn sorted_signatures(children: &[ConditionNode]) -> Vec<String> {
    let mut sigs: Vec<String> = children.iter().map(ConditionNode::signature).collect();
    sigs.sort();
    sigs
}

/// Extracts a condition tree from an expression node, or `None` when the
/// node is not a recognized boolean expression.
pub fn extract_condition(node: &ParseNode, scope: &Scope) -> Option<ConditionNode> {
    match node.key() {
        "A_Expr" => extract_operator_expression(node, scope),
        "BoolExpr" => {
            let children: Vec<ConditionNode> = node
                .child("args")
                .map(|args| {
                    args.children()
                        .iter()
                        .filter_map(|a| extract_condition(a, scope))
                        .collect()
                })
                .unwrap_or_default();
            match node.value_of("boolop").as_str() {
                "AND_EXPR" => Some(ConditionNode::And(children)),
                "OR_EXPR" => Some(ConditionNode::Or(children)),
                "NOT_EXPR" => children
                    .into_iter()
                    .next()
                    .map(|c| ConditionNode::Not(Box::new(c))),
                _ => None,
            }
        }
        "NullTest" => {
            let arg = expr::render_wrapped(node.child("arg"), scope);
            let op = match node.value_of("nulltesttype").as_str() {
                "IS_NULL" => "IS NULL",
                "IS_NOT_NULL" => "IS NOT NULL",
                _ => return None,
            };
            Some(ConditionNode::simple(arg, op, ""))
        }
        "SubLink" => {
            let test = || expr::render_wrapped(node.child("testexpr"), scope);
            match node.value_of("subLinkType").as_str() {
                "EXISTS_SUBLINK" => Some(ConditionNode::simple("EXISTS", "", SUBQUERY)),
                kind @ ("ANY_SUBLINK" | "ALL_SUBLINK") => {
                    let quantifier = if kind == "ANY_SUBLINK" { "ANY" } else { "ALL" };
                    let mut op = expr::operator_name(node.child("operName"));
                    if op.is_empty() {
                        op = "=".to_string();
                    }
                    Some(ConditionNode::simple(test(), format!("{op} {quantifier}"), SUBQUERY))
                }
                "EXPR_SUBLINK" => Some(ConditionNode::simple(test(), "=", SUBQUERY)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Handles the `A_Expr` kinds.
fn extract_operator_expression(node: &ParseNode, scope: &Scope) -> Option<ConditionNode> {
    let left = || expr::render_wrapped(node.child("lexpr"), scope);
    let rexpr = node.child("rexpr").and_then(|r| r.children().first());

    match node.value_of("kind").as_str() {
        "AEXPR_OP" => {
            let op = expr::operator_name(node.child("name"));
            let right = expr::render_wrapped(node.child("rexpr"), scope);
            Some(ConditionNode::simple(left(), op, right))
        }
        "AEXPR_IN" => {
            let right = match rexpr {
                Some(list) if list.key() == "List" || list.key() == "A_ArrayExpr" => {
                    let items = list
                        .child("items")
                        .or_else(|| list.child("elements"))
                        .map(|i| {
                            i.children()
                                .iter()
                                .map(|c| expr::render(c, scope))
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    format!("({})", expr::join_quoted(&items, ","))
                }
                Some(other) => expr::render(other, scope),
                None => expr::NULL_OPERAND.to_string(),
            };
            let op = if expr::operator_name(node.child("name")) == "<>" {
                "NOT IN"
            } else {
                "IN"
            };
            Some(ConditionNode::simple(left(), op, right))
        }
        "AEXPR_LIKE" | "AEXPR_ILIKE" => {
            let name = expr::operator_name(node.child("name"));
            let op = match (node.value_of("kind").as_str(), name.starts_with('!')) {
                ("AEXPR_LIKE", false) => "LIKE",
                ("AEXPR_LIKE", true) => "NOT LIKE",
                (_, false) => "ILIKE",
                (_, true) => "NOT ILIKE",
            };
            let right = expr::render_wrapped(node.child("rexpr"), scope);
            Some(ConditionNode::simple(left(), op, right))
        }
        kind @ ("AEXPR_BETWEEN" | "AEXPR_NOT_BETWEEN") => {
            let bounds: Vec<String> = rexpr
                .and_then(|list| list.child("items"))
                .map(|items| {
                    items
                        .children()
                        .iter()
                        .map(|c| expr::render(c, scope))
                        .collect()
                })
                .unwrap_or_default();
            let right = match bounds.as_slice() {
                [lo, hi] => format!("{lo} AND {hi}"),
                _ => format!(
                    "{} AND {}",
                    expr::render_wrapped(node.child("lower"), scope),
                    expr::render_wrapped(node.child("upper"), scope)
                ),
            };
            let op = if kind == "AEXPR_BETWEEN" {
                "BETWEEN"
            } else {
                "NOT BETWEEN"
            };
            Some(ConditionNode::simple(left(), op, right))
        }
        "AEXPR_NOT" => rexpr
            .and_then(|r| extract_condition(r, scope))
            .map(|c| ConditionNode::Not(Box::new(c))),
        _ => None,
    }
}

/// Extracts the condition held by a clause wrapper node such as
/// `whereClause` or `havingClause`.
pub fn extract_clause(clause: Option<&Arc<ParseNode>>, scope: &Scope) -> Option<ConditionNode> {
    clause
        .and_then(|c| c.children().first())
        .and_then(|c| extract_condition(c, scope))
}

/// Goal sentence for a WHERE clause.
pub fn describe_where(condition: Option<&ConditionNode>) -> String {
    match condition {
        Some(c) => format!("To filter data where {c}"),
        None => "No conditions in WHERE clause".to_string(),
    }
}

/// Compares two conditions structurally, appending one `❗` line per
/// mismatch to `message`. Returns true when they match.
pub fn compare_nodes(expected: &ConditionNode, found: &ConditionNode, message: &mut String) -> bool {
    use ConditionNode::*;

    match (expected, found) {
        (
            Simple {
                left: l1,
                op: op1,
                right: r1,
            },
            Simple {
                left: l2,
                op: op2,
                right: r2,
            },
        ) => {
            if op1 != op2 {
                message.push_str(&format!(
                    "❗ Operator mismatch: Expected '{op1}', but found '{op2}'.\n"
                ));
                return false;
            }
            let commutative = COMMUTATIVE_OPERATORS.contains(&op1.as_str());
            let matches = if commutative {
                BTreeSet::from([l1, r1]) == BTreeSet::from([l2, r2])
            } else {
                l1 == l2 && r1 == r2
            };
            if !matches {
                let label = if commutative { "Expected operands" } else { "Expected" };
                let found_label = if commutative { "Found operands" } else { "Found" };
                message.push_str(&format!(
                    "❗ Operands mismatch in condition '{l1} {op1} {r1}'.\n❗ {label}: '{l1}' and '{r1}'.\n❗ \
                     {found_label}: '{l2}' and '{r2}'.\n"
                ));
            }
            matches
        }
        (And(a), And(b)) | (Or(a), Or(b)) => {
            let kind = expected.kind_name();
            if a.len() != b.len() {
                message.push_str(&format!(
                    "❗ Number of conditions in {kind} clause mismatch. Expected {}, but found {}.\n",
                    a.len(),
                    b.len()
                ));
                return false;
            }
            let (sa, sb) = (sorted_signatures(a), sorted_signatures(b));
            if sa != sb {
                let list = |sigs: &[String]| sigs.iter().map(|s| format!("{s}; ")).collect::<String>();
                message.push_str(&format!(
                    "❗ Mismatch in conditions within {kind} clause.\n❗ Expected conditions: {}\n ❗ Found \
                     conditions: {}\n",
                    list(&sa),
                    list(&sb)
                ));
                return false;
            }
            true
        }
        (Not(a), Not(b)) => compare_nodes(a, b, message),
        _ => {
            message.push_str(&format!(
                "\n ❗ Condition type mismatch: Expected {}, but found {}.\n",
                expected.kind_name(),
                found.kind_name()
            ));
            false
        }
    }
}

/// Compares an optional condition clause.
///
/// `clause` names the clause in the presence messages (`WHERE`, `HAVING`).
pub fn compare_clause(
    clause: &str,
    reference: Option<&ConditionNode>,
    submission: Option<&ConditionNode>,
) -> ClauseComparison {
    match (reference, submission) {
        (None, None) => ClauseComparison::absent(format!("Both queries have no {clause} clause.")),
        (Some(_), None) => ClauseComparison::from_message(
            format!("Mismatch in {clause} clause presence.\n"),
            vec![format!("💡 Add a {clause} clause to filter the data as specified.")],
        ),
        (None, Some(_)) => ClauseComparison::from_message(
            format!("Mismatch in {clause} clause presence.\n"),
            vec![format!("💡 Remove the {clause} clause if it's not required.")],
        ),
        (Some(r), Some(s)) => {
            let mut message = String::new();
            if compare_nodes(r, s, &mut message) {
                ClauseComparison::from_message(String::new(), Vec::new())
            } else {
                ClauseComparison::from_message(
                    message,
                    vec![format!(
                        "💡 Review your {clause} clause conditions to match the specified requirements."
                    )],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_on_left_is_flipped() {
        let a = ConditionNode::simple("5", "<", "salary");
        let b = ConditionNode::simple("salary", ">", "5");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn conjunct_order_is_ignored() {
        let a = ConditionNode::And(vec![
            ConditionNode::simple("a", "=", "1"),
            ConditionNode::simple("b", ">", "2"),
        ]);
        let b = ConditionNode::And(vec![
            ConditionNode::simple("b", ">", "2"),
            ConditionNode::simple("1", "=", "a"),
        ]);
        let mut message = String::new();
        assert!(compare_nodes(&a, &b, &mut message), "{message}");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn operand_mismatch_is_reported() {
        let a = ConditionNode::simple("emp_id", "=", "101");
        let b = ConditionNode::simple("emp_id", "=", "202");
        let result = compare_clause("WHERE", Some(&a), Some(&b));
        assert!(result.outcome.is_incorrect());
        assert!(result.message.contains("'emp_id' and '101'"));
    }

    #[test]
    fn rendering() {
        let c = ConditionNode::Or(vec![
            ConditionNode::simple("a", "=", "1"),
            ConditionNode::Not(Box::new(ConditionNode::simple("b", "IS NULL", ""))),
        ]);
        assert_eq!(c.to_string(), "(a = 1 or not (b IS NULL ))");
    }
}
