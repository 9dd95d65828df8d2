#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use serde_json::Value;

/// Keys that carry no grading signal; their children are hoisted into the
/// parent when the tree is built.
const PRUNED_KEYS: [&str; 7] = [
    "location",
    "stmt_len",
    "version",
    "inh",
    "relpersistence",
    "limitOption",
    "op",
];

/// Key given to the synthetic root node of every parse tree.
pub const ROOT_KEY: &str = "root";

/// A labeled node in a parse tree.
///
/// The `key` is the node kind (`SelectStmt`, `whereClause`, `sval`, ...) and
/// `value` holds the JSON rendering of primitive leaves, so string leaves keep
/// their surrounding double quotes. Inner nodes have an empty value.
///
/// Nodes are immutable once built and are shared through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    /// Kind tag of the node.
    key:      String,
    /// Rendered primitive value, empty for inner nodes.
    value:    String,
    /// Ordered children.
    children: Vec<Arc<ParseNode>>,
}

impl ParseNode {
    /// Creates a node from its parts.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        children: Vec<Arc<ParseNode>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            value: value.into(),
            children,
        })
    }

    /// Creates a childless node.
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Arc<Self> {
        Self::new(key, value, Vec::new())
    }

    /// Builds a pruned parse tree from the parser's JSON output.
    pub fn from_json(json: &Value) -> Arc<Self> {
        Self::new(ROOT_KEY, "", build_children(json))
    }

    /// Parses raw JSON text and builds a tree from it.
    pub fn from_json_str(text: &str) -> Result<Arc<Self>> {
        let json: Value = serde_json::from_str(text).context("Parse tree is not valid JSON")?;
        Ok(Self::from_json(&json))
    }

    /// Returns the kind tag of this node.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the raw value of this node.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the ordered children of this node.
    pub fn children(&self) -> &[Arc<ParseNode>] {
        &self.children
    }

    /// Returns true when the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the first child with the given key.
    pub fn child(&self, key: &str) -> Option<&Arc<ParseNode>> {
        self.children.iter().find(|c| c.key == key)
    }

    /// Follows a path of child keys.
    pub fn path(&self, keys: &[&str]) -> Option<&Arc<ParseNode>> {
        let (first, rest) = keys.split_first()?;
        let mut node = self.child(first)?;
        for key in rest {
            node = node.child(key)?;
        }
        Some(node)
    }

    /// Returns the value of the first child with the given key, with one pair
    /// of surrounding double quotes removed. Missing children yield an empty
    /// string.
    pub fn value_of(&self, key: &str) -> String {
        match self.child(key) {
            Some(child) => unquote(&child.value).to_string(),
            None => String::new(),
        }
    }

    /// Returns every `stmt` node under this tree.
    pub fn statements(self: &Arc<Self>) -> Vec<Arc<ParseNode>> {
        let mut out = Vec::new();
        collect_statements(self, &mut out);
        out
    }

    /// Returns the node of the first statement, e.g. the `DeleteStmt` node.
    pub fn statement_node(self: &Arc<Self>) -> Option<Arc<ParseNode>> {
        if self.key == "stmt" {
            return self.children.first().cloned();
        }
        self.children.iter().find_map(|c| c.statement_node())
    }

    /// Returns the kind of the first statement (`SelectStmt`, `InsertStmt`,
    /// ...), or an empty string when the tree holds no statement.
    pub fn statement_type(self: &Arc<Self>) -> String {
        self.statement_node()
            .map(|n| n.key.clone())
            .unwrap_or_default()
    }

    /// Number of nodes in the tree rooted here.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }

    /// Renders the tree with box-drawing connectors, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_into(self, "", true, &mut out);
        out
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Builds the children contributed by a JSON value.
///
/// Object members become keyed nodes. Array elements contribute their own
/// members to the array node; primitive elements become unkeyed leaves.
fn build_children(json: &Value) -> Vec<Arc<ParseNode>> {
    let mut children = Vec::new();
    match json {
        Value::Object(map) => {
            for (key, value) in map {
                children.push(build_member(key, value));
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::Array(_) => children.push(build_member(&index.to_string(), item)),
                    _ => children.extend(build_children(item)),
                }
            }
        }
        primitive => children.push(ParseNode::leaf("", primitive.to_string())),
    }
    prune(children)
}

/// Builds the node for a single keyed JSON member.
fn build_member(key: &str, value: &Value) -> Arc<ParseNode> {
    match value {
        Value::Object(_) | Value::Array(_) => ParseNode::new(key, "", build_children(value)),
        primitive => ParseNode::leaf(key, primitive.to_string()),
    }
}

/// Drops nodes whose key is in [`PRUNED_KEYS`], splicing their children in
/// their place.
fn prune(children: Vec<Arc<ParseNode>>) -> Vec<Arc<ParseNode>> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if PRUNED_KEYS.contains(&child.key.as_str()) {
            out.extend(child.children.iter().cloned());
        } else {
            out.push(child);
        }
    }
    out
}

/// Collects `stmt` nodes, treating a `stmts` node as a flat list.
fn collect_statements(node: &Arc<ParseNode>, out: &mut Vec<Arc<ParseNode>>) {
    if node.key == "stmt" && !node.children.is_empty() {
        out.push(Arc::clone(node));
    } else if node.key == "stmts" {
        out.extend(node.children.iter().filter(|c| c.key == "stmt").cloned());
    } else {
        for child in &node.children {
            collect_statements(child, out);
        }
    }
}

/// Appends one rendered line per node.
fn render_into(node: &ParseNode, prefix: &str, last: bool, out: &mut String) {
    let connector = if last { "└──" } else { "├──" };
    out.push_str(&format!("{prefix}{connector}{}: {}\n", node.key, node.value));
    let next = format!("{prefix}{}", if last { "    " } else { "│   " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_into(child, &next, i + 1 == count, out);
    }
}

/// Removes one pair of surrounding double quotes, if present.
pub fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Removes every double quote character.
pub fn strip_quotes(value: &str) -> String {
    value.replace('"', "")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pruned_keys_hoist_their_children() {
        let tree = ParseNode::from_json(&json!({
            "version": 160001,
            "stmts": [{"stmt": {"DeleteStmt": {"relation": {"relname": "t", "location": 12}}}, "stmt_len": 15}]
        }));
        let stmts = tree.child("stmts").expect("stmts");
        assert_eq!(stmts.children().len(), 1);
        let relation = tree
            .statement_node()
            .and_then(|n| n.child("relation").cloned())
            .expect("relation");
        assert_eq!(relation.children().len(), 1);
        assert_eq!(relation.value_of("relname"), "t");
        assert!(tree.child("version").is_none());
    }

    #[test]
    fn primitive_array_items_are_unkeyed_leaves() {
        let tree = ParseNode::from_json(&json!({"vals": [1, 2]}));
        let vals = tree.child("vals").expect("vals");
        assert_eq!(vals.children().len(), 2);
        assert_eq!(vals.children()[1].key(), "");
        assert_eq!(vals.children()[1].value(), "2");
    }
}
