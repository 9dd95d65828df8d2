use sqlgrade::{
    grade::{compare_changes, compare_rows},
    types::DiffEntry,
};

fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn shuffled_rows_match_when_order_is_unchecked() {
    let expected = grid(&[&["1", "Ada"], &["2", "Grace"], &["3", "Linus"]]);
    let actual = grid(&[&["3", "Linus"], &["1", "Ada"], &["2", "Grace"]]);

    let result = compare_rows(&expected, &actual, false);
    assert!(result.equal);
    assert_eq!(result.difference, 0);
    assert!(result.messages.is_empty());
}

#[test]
fn shuffled_rows_differ_when_order_is_checked() {
    let expected = grid(&[&["1"], &["2"]]);
    let actual = grid(&[&["2"], &["1"]]);

    let result = compare_rows(&expected, &actual, true);
    assert!(!result.equal);
}

#[test]
fn superset_is_a_subset_match_but_not_equal() {
    let expected = grid(&[&["1"], &["2"]]);
    let actual = grid(&[&["1"], &["2"], &["3"]]);

    let result = compare_rows(&expected, &actual, false);
    assert!(result.subset);
    assert!(!result.equal);
    assert_eq!(result.difference, 1);
    assert!(result.messages[0].starts_with("⚠️"));
}

#[test]
fn empty_row_sets_are_equal() {
    let result = compare_rows(&[], &[], true);
    assert!(result.equal);
}

#[test]
fn extra_deletion_is_reported() {
    let expected = vec![DiffEntry::new("employees", "removed", "101, 'Ann'")];
    let actual = vec![
        DiffEntry::new("employees", "removed", "101, 'Ann'"),
        DiffEntry::new("employees", "removed", "202, 'Bob'"),
    ];

    let result = compare_changes(&expected, &actual);
    assert!(!result.equal);
    assert!(result.subset);
    assert_eq!(result.difference, 1);
    assert_eq!(
        result.messages,
        vec![
            "⚠️ You deleted a row from 'employees' that shouldn’t have been removed: 202, 'Bob'."
                .to_string()
        ]
    );
}

#[test]
fn missing_constraint_violation_is_reported() {
    let violation =
        DiffEntry::from_execution_error("duplicate key value violates unique constraint \"book_pkey\"")
            .expect("constraint entry");
    let result = compare_changes(&[violation], &[]);

    assert!(!result.equal);
    assert_eq!(
        result.messages,
        vec!["❌ Your query should have violated a unique constraint, but it did not.".to_string()]
    );
}

#[test]
fn changes_match_as_a_multiset() {
    let a = DiffEntry::new("book", "added", "1");
    let b = DiffEntry::new("book", "added", "2");
    let result = compare_changes(&[a.clone(), b.clone()], &[b, a]);
    assert!(result.equal);
}

#[test]
fn extra_column_sorting_between_expected_columns_hides_the_superset() {
    let expected = grid(&[&["1", "b"], &["2", "a"]]);
    let actual = grid(&[&["2", "a", "0"], &["1", "b", "9"]]);

    let result = compare_rows(&expected, &actual, false);
    assert!(!result.equal);
    assert!(!result.subset);
    assert!(result.messages[0].starts_with("❌"));
}

#[test]
fn empty_result_is_fully_credited_when_nothing_is_expected() {
    let result = compare_rows(&[], &[], false);
    assert!(result.equal);
    assert!(result.subset);
    assert_eq!(result.difference, 0);
    assert!(result.messages.is_empty());
}
