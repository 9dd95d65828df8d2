#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Statement-level dispatch: goal descriptions and reference/submission
//! comparison for whole parse trees.

use std::sync::Arc;

use super::{
    clauses::{ClauseInfo, ComparisonResult, StatementKind},
    tree::ParseNode,
};

/// Heading of every goal description.
const GOAL_HEADING: &str = "The query is supposed to:";

/// Statement node held by a `stmt` wrapper, or the node itself.
fn unwrap_statement(node: &Arc<ParseNode>) -> Option<Arc<ParseNode>> {
    if node.key() == "stmt" {
        node.children().first().cloned()
    } else {
        node.statement_node()
    }
}

/// General goal of one statement: a bullet summary for SELECT, the full
/// sentence for every other kind.
pub fn general_goal(statement: &ParseNode) -> String {
    let mut out = GOAL_HEADING.to_string();
    match ClauseInfo::extract(statement) {
        Some(ClauseInfo::Select(info)) => out.push_str(&info.summarize()),
        Some(info) => {
            for sentence in info.describe() {
                out.push_str(&format!("\n ● {sentence}"));
            }
        }
        None => out.push_str("\n ● This query type is not supported yet."),
    }
    out
}

/// Detailed goal sentences, one group per statement in `root`.
pub fn describe_goal(root: &Arc<ParseNode>) -> Vec<String> {
    let statements = root.statements();
    if statements.is_empty() {
        return vec!["No valid statement found in the given query.".to_string()];
    }
    statements
        .iter()
        .filter_map(unwrap_statement)
        .map(|statement| {
            let mut out = GOAL_HEADING.to_string();
            match ClauseInfo::extract(&statement) {
                Some(info) => {
                    for sentence in info.describe() {
                        out.push_str(&format!("\n ● {sentence}"));
                    }
                }
                None => out.push_str("\n ● This query type is not supported yet."),
            }
            out
        })
        .collect()
}

/// Compares two statement nodes (`SelectStmt`, `DeleteStmt`, ...).
///
/// SELECT statements come back with the clause report already formatted;
/// every other kind is wrapped here in the component report.
pub fn compare_statements(reference: &ParseNode, submission: &ParseNode) -> ComparisonResult {
    let (ref_type, sub_type) = (reference.key(), submission.key());
    if ref_type != sub_type {
        let mut result = ComparisonResult::new();
        result.incorrect(
            "Statement Type",
            format!("The correct statement is a {ref_type} but your statement is a {sub_type}.\n"),
        );
        return result;
    }

    let compared = ClauseInfo::extract(reference).and_then(|r| {
        let s = ClauseInfo::extract(submission)?;
        Some((r.kind(), r.compare(&s)?))
    });
    let Some((kind, mut result)) = compared else {
        return ComparisonResult {
            equal: false,
            message: format!("Unsupported statement type: {ref_type}\n"),
            ..ComparisonResult::default()
        };
    };

    if kind == StatementKind::Select {
        return result;
    }
    result.message = component_report(&result, kind);
    result
}

/// Formats the sectioned report of a non-SELECT comparison.
fn component_report(result: &ComparisonResult, kind: StatementKind) -> String {
    let mut out = String::from("2️⃣ Correct Components:\n");
    if result.correct_parts.is_empty() {
        out.push_str("● None.\n");
    }
    for part in &result.correct_parts {
        out.push_str(&format!("✅ {part}\n"));
    }
    out.push('\n');

    if !result.incorrect_parts.is_empty() {
        out.push_str("3️⃣ Issues found in the following components:\n");
        for part in &result.incorrect_parts {
            out.push_str(&format!("❌ {part}\n"));
        }
        if !result.message.is_empty() {
            out.push_str(&format!("\n❗ Problem Details:\n{}\n", result.message));
        }
    }

    if result.next_steps.is_empty() {
        out.push_str(&format!("Excellent! Your {kind} statement matches the reference.\n"));
    } else {
        out.push_str("4️⃣ Next steps:\n");
        for step in &result.next_steps {
            out.push_str(&format!("{step}\n"));
        }
    }
    out
}

/// Compares the first statement of two parse trees.
pub fn compare_single_statement(reference: &Arc<ParseNode>, submission: &Arc<ParseNode>) -> ComparisonResult {
    match (reference.statement_node(), submission.statement_node()) {
        (Some(r), Some(s)) => compare_statements(&r, &s),
        _ => ComparisonResult {
            equal: false,
            message: "One or both statements are empty.".to_string(),
            ..ComparisonResult::default()
        },
    }
}

/// Compares every statement of two parse trees.
///
/// Each reference statement is paired with the first unused submission
/// statement of the same kind; unpaired statements on either side are
/// reported as missing or extra.
pub fn compare_queries(reference: &Arc<ParseNode>, submission: &Arc<ParseNode>) -> ComparisonResult {
    let ref_statements: Vec<Arc<ParseNode>> = reference
        .statements()
        .iter()
        .filter_map(unwrap_statement)
        .collect();
    let sub_statements: Vec<Arc<ParseNode>> = submission
        .statements()
        .iter()
        .filter_map(unwrap_statement)
        .collect();

    let mut overall = ComparisonResult::new();
    let mut used = vec![false; sub_statements.len()];

    for statement in &ref_statements {
        let kind = statement.key();
        let matched = sub_statements
            .iter()
            .enumerate()
            .position(|(j, s)| !used[j] && s.key() == kind);
        match matched {
            Some(j) => {
                used[j] = true;
                let result = compare_statements(statement, &sub_statements[j]);
                let goal = general_goal(statement);
                overall.message.push_str(&format!("1️⃣ Goal:\n{goal}\n\n"));
                overall.merge(result);
            }
            None => overall.incorrect(format!("{kind} statement"), format!("Missing {kind} statement.\n")),
        }
    }

    for (statement, _) in sub_statements.iter().zip(&used).filter(|(_, used)| !**used) {
        let kind = statement.key();
        overall.incorrect(format!("Extra {kind}"), format!("Extra {kind} statement.\n"));
    }

    overall
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn delete(id: i64) -> Arc<ParseNode> {
        ParseNode::from_json(&json!({
            "stmts": [{"stmt": {"DeleteStmt": {
                "relation": {"relname": "employees"},
                "whereClause": {"A_Expr": {
                    "kind": "AEXPR_OP",
                    "name": [{"String": {"sval": "="}}],
                    "lexpr": {"ColumnRef": {"fields": [{"String": {"sval": "emp_id"}}]}},
                    "rexpr": {"A_Const": {"ival": {"ival": id}}}
                }}
            }}}]
        }))
    }

    #[test]
    fn mismatched_kinds_are_reported() {
        let select = ParseNode::from_json(&json!({"stmts": [{"stmt": {"SelectStmt": {}}}]}));
        let result = compare_single_statement(&delete(1), &select);
        assert_eq!(result.incorrect_parts, vec!["Statement Type".to_string()]);
        assert!(result.message.starts_with("The correct statement is a DeleteStmt"));
    }

    #[test]
    fn extra_statements_are_reported() {
        let reference = delete(1);
        let submission = ParseNode::from_json(&json!({
            "stmts": [
                {"stmt": {"DeleteStmt": {"relation": {"relname": "employees"}}}},
                {"stmt": {"DeleteStmt": {"relation": {"relname": "managers"}}}}
            ]
        }));
        let result = compare_queries(&reference, &submission);
        assert!(!result.equal);
        assert!(result.incorrect_parts.contains(&"Extra DeleteStmt".to_string()));
    }
}
