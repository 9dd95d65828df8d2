#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{Result, bail};
use serde_json::{Value, json};
use sqlgrade::{
    backend::{ExecutionBackend, NonSelectOutcome, ParseError, ParsedStatement, SqlParser},
    sql::ParseNode,
    types::{DiffEntry, QueryOutput},
};

/// Canonical lookup key for SQL text: lower-case, single spaces, no `;`.
pub fn normalize(sql: &str) -> String {
    sql.trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn statement(kind: &str, body: Value) -> Value {
    json!({"version": 170004, "stmts": [{"stmt": {kind: body}}]})
}

pub fn tree(kind: &str, body: Value) -> Arc<ParseNode> {
    ParseNode::from_json(&statement(kind, body))
}

pub fn column(name: &str) -> Value {
    json!({"ColumnRef": {"fields": [{"String": {"sval": name}}]}})
}

pub fn int(value: i64) -> Value {
    json!({"A_Const": {"ival": {"ival": value}}})
}

pub fn equals(left: Value, right: Value) -> Value {
    operator("=", left, right)
}

pub fn operator(op: &str, left: Value, right: Value) -> Value {
    json!({"A_Expr": {"kind": "AEXPR_OP", "name": [{"String": {"sval": op}}], "lexpr": left, "rexpr": right}})
}

fn names(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|n| json!({"String": {"sval": n}})).collect())
}

pub fn relation(name: &str) -> Value {
    json!({"relname": name, "inh": true, "relpersistence": "p"})
}

pub fn select_star(table: &str, filter: Option<Value>) -> Value {
    statement("SelectStmt", select_body(table, filter))
}

pub fn select_body(table: &str, filter: Option<Value>) -> Value {
    let mut body = json!({
        "targetList": [{"ResTarget": {"val": {"ColumnRef": {"fields": [{"A_Star": {}}]}}}}],
        "fromClause": [{"RangeVar": relation(table)}],
        "limitOption": "LIMIT_OPTION_DEFAULT",
        "op": "SETOP_NONE"
    });
    if let Some(filter) = filter {
        body["whereClause"] = filter;
    }
    body
}

pub fn select_ordered(table: &str, column_name: &str) -> Value {
    statement(
        "SelectStmt",
        json!({
            "targetList": [{"ResTarget": {"val": column(column_name)}}],
            "fromClause": [{"RangeVar": relation(table)}],
            "sortClause": [{"SortBy": {"node": column(column_name), "sortby_dir": "SORTBY_DEFAULT", "sortby_nulls": "SORTBY_NULLS_DEFAULT"}}],
            "limitOption": "LIMIT_OPTION_DEFAULT",
            "op": "SETOP_NONE"
        }),
    )
}

pub fn delete_where(table: &str, id: i64) -> Value {
    statement(
        "DeleteStmt",
        json!({"relation": relation(table), "whereClause": equals(column("emp_id"), int(id))}),
    )
}

pub fn update_set(pairs: &[(&str, i64)], id: i64) -> Value {
    let targets: Vec<Value> = pairs
        .iter()
        .map(|(name, value)| json!({"ResTarget": {"name": name, "val": int(*value)}}))
        .collect();
    statement(
        "UpdateStmt",
        json!({
            "relation": relation("employees"),
            "targetList": targets,
            "whereClause": equals(column("emp_id"), int(id))
        }),
    )
}

pub fn create_book(primary_key: &str) -> Value {
    let column_def = |name: &str, ty: &str| {
        json!({"ColumnDef": {
            "colname": name,
            "typeName": {"names": [{"String": {"sval": "pg_catalog"}}, {"String": {"sval": ty}}]},
            "is_local": true
        }})
    };
    statement(
        "CreateStmt",
        json!({
            "relation": relation("book"),
            "tableElts": [
                column_def("isbn", "bpchar"),
                column_def("title", "varchar"),
                {"Constraint": {"contype": "CONSTR_PRIMARY", "keys": [{"String": {"sval": primary_key}}]}}
            ],
            "oncommit": "ONCOMMIT_NOOP"
        }),
    )
}

pub fn insert_values(table: &str, columns: &[&str], rows: &[&[i64]]) -> Value {
    let cols: Vec<Value> = columns
        .iter()
        .map(|name| json!({"ResTarget": {"name": name}}))
        .collect();
    let lists: Vec<Value> = rows
        .iter()
        .map(|row| json!({"List": {"items": row.iter().map(|v| int(*v)).collect::<Vec<_>>()}}))
        .collect();
    statement(
        "InsertStmt",
        json!({
            "relation": relation(table),
            "cols": cols,
            "selectStmt": {"SelectStmt": {"valuesLists": lists, "limitOption": "LIMIT_OPTION_DEFAULT", "op": "SETOP_NONE"}},
            "override": "OVERRIDING_NOT_SET"
        }),
    )
}

pub fn create_assertion(name: &str, check: Value) -> Value {
    statement("CreateAssertionStmt", json!({"assertion_name": name, "check_expr": check}))
}

pub fn alter_add_column(table: &str, column: &str, ty: &str) -> Value {
    alter_table(
        table,
        json!({"AlterTableCmd": {
            "subtype": "AT_AddColumn",
            "def": {"ColumnDef": {"colname": column, "typeName": {"names": names(&["pg_catalog", ty])}, "is_local": true}},
            "behavior": "DROP_RESTRICT"
        }}),
    )
}

pub fn alter_add_check(table: &str, name: &str, check: Value) -> Value {
    alter_table(
        table,
        json!({"AlterTableCmd": {
            "subtype": "AT_AddConstraint",
            "def": {"Constraint": {"contype": "CONSTR_CHECK", "conname": name, "raw_expr": check, "initially_valid": true}},
            "behavior": "DROP_RESTRICT"
        }}),
    )
}

fn alter_table(table: &str, command: Value) -> Value {
    statement(
        "AlterTableStmt",
        json!({"relation": relation(table), "cmds": [command], "objtype": "OBJECT_TABLE"}),
    )
}

pub fn create_view(name: &str, columns: &[&str], table: &str, filter: Option<Value>) -> Value {
    statement(
        "ViewStmt",
        json!({
            "view": relation(name),
            "aliases": names(columns),
            "query": {"SelectStmt": select_body(table, filter)},
            "withCheckOption": "NO_CHECK_OPTION"
        }),
    )
}

/// Parser that knows a fixed set of statements and rejects everything else.
#[derive(Default, Clone)]
pub struct FixtureParser {
    known: HashMap<String, Value>,
}

impl FixtureParser {
    pub fn with(mut self, sql: &str, tree: Value) -> Self {
        self.known.insert(normalize(sql), tree);
        self
    }
}

impl SqlParser for FixtureParser {
    async fn parse(&self, sql: &str) -> Result<ParsedStatement, ParseError> {
        let key = normalize(sql);
        match self.known.get(&key) {
            Some(tree) => Ok(ParsedStatement {
                tree:        ParseNode::from_json(tree),
                fingerprint: format!("fp:{key}"),
            }),
            None => Err(ParseError::Syntax(format!("syntax error in {sql:?}"))),
        }
    }
}

/// Backend returning canned outputs per statement.
///
/// Outputs registered with `rows_exact` are keyed by the untouched text and
/// win over the normalized lookup.
#[derive(Default, Clone)]
pub struct FixtureBackend {
    outputs: HashMap<String, QueryOutput>,
    exact:   HashMap<String, Vec<Vec<String>>>,
    errors:  HashMap<String, String>,
    panics:  HashSet<String>,
}

fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

impl FixtureBackend {
    pub fn rows(mut self, sql: &str, rows: &[&[&str]]) -> Self {
        self.outputs.insert(normalize(sql), QueryOutput::Rows(grid(rows)));
        self
    }

    pub fn rows_exact(mut self, sql: &str, rows: &[&[&str]]) -> Self {
        self.exact.insert(sql.trim().to_string(), grid(rows));
        self
    }

    pub fn changes(mut self, sql: &str, changes: Vec<DiffEntry>) -> Self {
        self.outputs.insert(normalize(sql), QueryOutput::Changes(changes));
        self
    }

    pub fn failing(mut self, sql: &str, error: &str) -> Self {
        self.errors.insert(normalize(sql), error.to_string());
        self
    }

    pub fn panicking(mut self, sql: &str) -> Self {
        self.panics.insert(normalize(sql));
        self
    }

    fn lookup(&self, sql: &str) -> String {
        let key = normalize(sql);
        if self.panics.contains(&key) {
            panic!("backend fixture crashed on {sql:?}");
        }
        key
    }
}

impl ExecutionBackend for FixtureBackend {
    async fn execute_select(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let key = self.lookup(sql);
        if let Some(rows) = self.exact.get(sql.trim()) {
            return Ok(rows.clone());
        }
        if let Some(error) = self.errors.get(&key) {
            bail!("{error}");
        }
        match self.outputs.get(&key) {
            Some(QueryOutput::Rows(rows)) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute_non_select(&self, sql: &str) -> Result<NonSelectOutcome> {
        let key = self.lookup(sql);
        let mut changes = match self.outputs.get(&key) {
            Some(QueryOutput::Changes(changes)) => changes.clone(),
            _ => Vec::new(),
        };
        let error = self.errors.get(&key).cloned();
        if let Some(entry) = error.as_deref().and_then(DiffEntry::from_execution_error) {
            changes.push(entry);
        }
        Ok(NonSelectOutcome { changes, error })
    }

    fn parallel_safe(&self) -> bool {
        false
    }
}
