mod support;

use serde_json::json;
use sqlgrade::sql::{ParseNode, tree_edit_distance};
use support::{column, delete_where, equals, int, select_star};

#[test]
fn distance_to_self_is_zero() {
    let tree = ParseNode::from_json(&select_star("t", Some(equals(column("id"), int(1)))));
    assert_eq!(tree_edit_distance(&tree, &tree), 0);
}

#[test]
fn distance_is_symmetric_and_obeys_triangle_inequality() {
    let a = ParseNode::from_json(&select_star("t", None));
    let b = ParseNode::from_json(&select_star("t", Some(equals(column("id"), int(1)))));
    let c = ParseNode::from_json(&delete_where("t", 2));

    let ab = tree_edit_distance(&a, &b);
    let ba = tree_edit_distance(&b, &a);
    let bc = tree_edit_distance(&b, &c);
    let ac = tree_edit_distance(&a, &c);

    assert_eq!(ab, ba);
    assert!(ab > 0);
    assert!(ac <= ab + bc);
}

#[test]
fn single_literal_change_costs_one_rename() {
    let a = ParseNode::from_json(&delete_where("employees", 101));
    let b = ParseNode::from_json(&delete_where("employees", 202));
    assert_eq!(tree_edit_distance(&a, &b), 1);
}

#[test]
fn extra_leaf_costs_one_insert() {
    let a = ParseNode::from_json(&json!({"a": {"b": 1}}));
    let b = ParseNode::from_json(&json!({"a": {"b": 1, "c": 2}}));
    assert_eq!(tree_edit_distance(&a, &b), 1);
    assert_eq!(tree_edit_distance(&b, &a), 1);
}
