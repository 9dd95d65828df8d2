mod support;

use serde_json::json;
use sqlgrade::sql::{ClauseInfo, ParseNode, compare_queries, compare_single_statement, describe_goal};
use support::{
    alter_add_check, alter_add_column, column, create_assertion, create_book, create_view,
    delete_where, equals, insert_values, int, operator, select_star, update_set,
};

fn parse(value: serde_json::Value) -> std::sync::Arc<ParseNode> {
    ParseNode::from_json(&value)
}

#[test]
fn every_statement_kind_matches_itself() {
    let fixtures = [
        delete_where("employees", 101),
        update_set(&[("bonus", 1000), ("salary", 5000)], 101),
        create_book("isbn"),
        select_star("t", Some(equals(column("id"), int(3)))),
        insert_values("book", &["isbn", "price"], &[&[1, 20], &[2, 35]]),
        create_assertion("positive_price", operator(">", column("price"), int(0))),
        alter_add_column("book", "pages", "int4"),
        create_view("cheap_books", &["isbn"], "book", Some(operator("<", column("price"), int(10)))),
    ];
    for fixture in fixtures {
        let tree = parse(fixture);
        let statement = tree.statement_node().expect("statement");
        let info = ClauseInfo::extract(&statement).expect("supported statement");
        let result = info.compare(&info).expect("same kind");
        assert!(result.equal, "{:?} should equal itself", info.kind());
        assert!(result.incorrect_parts.is_empty());
    }
}

#[test]
fn delete_with_other_id_flags_only_where() {
    let reference = parse(delete_where("Employees", 101));
    let submission = parse(delete_where("Employees", 202));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert_eq!(result.incorrect_parts, vec!["WHERE clause".to_string()]);
    assert!(result.correct_parts.contains(&"Target table".to_string()));
}

#[test]
fn update_set_order_does_not_matter() {
    let reference = parse(update_set(&[("bonus", 1000), ("salary", 5000)], 101));
    let submission = parse(update_set(&[("salary", 5000), ("bonus", 1000)], 101));
    let result = compare_single_statement(&reference, &submission);

    assert!(result.equal, "{}", result.message);
    assert!(result.incorrect_parts.is_empty());
}

#[test]
fn update_with_wrong_value_names_the_column() {
    let reference = parse(update_set(&[("bonus", 1000), ("salary", 5000)], 101));
    let submission = parse(update_set(&[("bonus", 1000), ("salary", 4000)], 101));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert!(result.message.contains("salary"));
}

#[test]
fn create_with_wrong_primary_key_names_both_columns() {
    let reference = parse(create_book("isbn"));
    let submission = parse(create_book("title"));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert!(
        result
            .incorrect_parts
            .iter()
            .any(|p| p.eq_ignore_ascii_case("primary key"))
    );
    assert!(result.message.contains("isbn"));
    assert!(result.message.contains("title"));
}

#[test]
fn query_comparison_reports_goal_and_missing_statements() {
    let reference = parse(json!({"stmts": [
        {"stmt": {"DeleteStmt": {"relation": {"relname": "employees"}}}},
        {"stmt": {"DeleteStmt": {"relation": {"relname": "managers"}}}}
    ]}));
    let submission = parse(json!({"stmts": [
        {"stmt": {"DeleteStmt": {"relation": {"relname": "employees"}}}}
    ]}));
    let result = compare_queries(&reference, &submission);

    assert!(!result.equal);
    assert!(result.message.starts_with("1️⃣ Goal:\nThe query is supposed to:"));
    assert!(result.message.contains("Missing DeleteStmt statement."));
}

#[test]
fn goals_describe_each_statement() {
    let tree = parse(update_set(&[("bonus", 1000)], 7));
    let goals = describe_goal(&tree);
    assert_eq!(goals.len(), 1);
    assert!(goals[0].starts_with("The query is supposed to:\n ● "));
    assert!(goals[0].contains("bonus"));
}

#[test]
fn assertion_with_other_condition_flags_the_condition() {
    let reference = parse(create_assertion("positive_price", operator(">", column("price"), int(0))));
    let submission = parse(create_assertion("positive_price", operator(">=", column("price"), int(0))));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert_eq!(result.incorrect_parts, vec!["Assertion condition".to_string()]);
    assert!(result.correct_parts.contains(&"Assertion name".to_string()));
}

#[test]
fn alter_with_wrong_type_flags_the_operation() {
    let reference = parse(alter_add_column("book", "pages", "int4"));
    let submission = parse(alter_add_column("book", "pages", "text"));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert_eq!(result.incorrect_parts, vec!["Operation 1".to_string()]);
    assert!(result.message.contains("expected type 'int4' but found 'text'"));
}

#[test]
fn alter_with_other_operation_flags_the_sequence() {
    let reference = parse(alter_add_column("book", "pages", "int4"));
    let submission = parse(alter_add_check("book", "", operator(">", column("pages"), int(0))));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert_eq!(result.incorrect_parts, vec!["Operation types".to_string()]);
    assert!(result.message.contains("ADD COLUMN but found: ADD CONSTRAINT"));
}

#[test]
fn alter_check_constraint_matches_by_signature() {
    let reference = parse(alter_add_check("book", "pages_positive", operator(">", column("pages"), int(0))));
    let submission = parse(alter_add_check("book", "pages_positive", operator("<", int(0), column("pages"))));
    let result = compare_single_statement(&reference, &submission);

    assert!(result.equal, "{}", result.message);
    assert!(
        result
            .message
            .contains("Excellent! Your ALTER statement matches the reference.")
    );
}

#[test]
fn view_with_other_filter_flags_the_definition() {
    let under = |limit| Some(operator("<", column("price"), int(limit)));
    let reference = parse(create_view("cheap_books", &[], "book", under(10)));
    let submission = parse(create_view("cheap_books", &[], "book", under(20)));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert_eq!(result.incorrect_parts, vec!["View SELECT clause".to_string()]);
    assert!(result.message.contains("WHERE clause"));
}

#[test]
fn view_name_and_columns_are_checked() {
    let reference = parse(create_view("cheap_books", &["isbn"], "book", None));
    let submission = parse(create_view("books", &["isbn", "title"], "book", None));
    let result = compare_single_statement(&reference, &submission);

    assert!(!result.equal);
    assert_eq!(
        result.incorrect_parts,
        vec!["View name".to_string(), "View columns".to_string()]
    );
    assert!(result.correct_parts.contains(&"View SELECT clause".to_string()));
}

#[test]
fn alter_and_view_goals_are_described() {
    let alter = describe_goal(&parse(alter_add_column("book", "pages", "int4")));
    assert!(alter[0].contains("Alter table 'book': ADD COLUMN pages int4."));

    let view = describe_goal(&parse(create_view("cheap_books", &[], "book", None)));
    assert!(view[0].contains("Create a view named 'cheap_books'."));
}
