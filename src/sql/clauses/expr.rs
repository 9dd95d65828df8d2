#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rendering of scalar expressions into the short textual forms used in
//! feedback and in structural comparisons.

use std::sync::Arc;

use crate::sql::tree::{ParseNode, strip_quotes};

/// Placeholder rendered for a missing operand.
pub const NULL_OPERAND: &str = "(null)";
/// Rendering of any subquery.
pub const SUBQUERY: &str = "(subquery)";
/// Rendering of expression kinds that are not understood.
pub const UNKNOWN_EXPRESSION: &str = "(unknown expression)";

/// Names visible while rendering expressions: table aliases from the FROM
/// clause and output aliases from the select list.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// `(alias, table name)` pairs.
    tables:         Vec<(String, String)>,
    /// `(output alias, rendered expression)` pairs.
    select_aliases: Vec<(String, String)>,
}

impl Scope {
    /// An empty scope with nothing to resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table alias.
    pub fn with_table(mut self, alias: impl Into<String>, table: impl Into<String>) -> Self {
        let alias = alias.into();
        if !alias.is_empty() {
            self.tables.push((alias, table.into()));
        }
        self
    }

    /// Adds a select-list output alias.
    pub fn with_select_alias(mut self, alias: impl Into<String>, rendered: impl Into<String>) -> Self {
        let alias = alias.into();
        if !alias.is_empty() {
            self.select_aliases.push((alias, rendered.into()));
        }
        self
    }

    /// Maps a table alias to its table name; unknown names pass through.
    pub fn resolve_table<'a>(&'a self, name: &'a str) -> &'a str {
        self.tables
            .iter()
            .rev()
            .find(|(alias, _)| alias == name)
            .map(|(_, table)| table.as_str())
            .unwrap_or(name)
    }

    /// Maps a select-list alias to the expression it names.
    fn resolve_select_alias(&self, name: &str) -> Option<&str> {
        self.select_aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, rendered)| rendered.as_str())
    }
}

/// Collects the `sval` of every `String` child, in order.
pub fn string_values(list: &ParseNode) -> Vec<String> {
    list.children()
        .iter()
        .filter(|c| c.key() == "String")
        .filter_map(|c| c.child("sval"))
        .map(|s| strip_quotes(s.value()))
        .collect()
}

/// Same as [`string_values`] for an optional list.
pub fn string_values_of(list: Option<&Arc<ParseNode>>) -> Vec<String> {
    list.map(|l| string_values(l)).unwrap_or_default()
}

/// Returns the first operator name under an `A_Expr` `name` list.
pub fn operator_name(name: Option<&Arc<ParseNode>>) -> String {
    string_values_of(name).into_iter().next().unwrap_or_default()
}

/// Quotes each element and joins them, e.g. `'a', 'b'`.
pub fn join_quoted(items: &[String], delimiter: &str) -> String {
    items
        .iter()
        .map(|i| format!("'{i}'"))
        .collect::<Vec<_>>()
        .join(&format!("{delimiter} "))
}

/// Raw value of an `A_Const`, quotes removed.
///
/// Zero and false are serialized as empty objects by the parser and render
/// as `0` and `false`.
pub fn constant(node: &ParseNode) -> String {
    fn walk(node: &ParseNode, found: &mut Option<String>) {
        if matches!(node.key(), "ival" | "sval" | "fval" | "boolval") {
            if !node.value().is_empty() {
                *found = Some(strip_quotes(node.value()));
            } else if node.is_leaf() && found.is_none() {
                match node.key() {
                    "ival" => *found = Some("0".to_string()),
                    "boolval" => *found = Some("false".to_string()),
                    _ => {}
                }
            }
        }
        for child in node.children() {
            walk(child, found);
        }
    }

    if node.child("isnull").is_some_and(|n| n.value() == "true") {
        return "NULL".to_string();
    }
    let mut found = None;
    walk(node, &mut found);
    found.unwrap_or_default()
}

/// Renders a `ColumnRef` as `column` or `table.column`, resolving table
/// aliases through `scope`.
pub fn column_name(column_ref: &ParseNode, scope: &Scope) -> String {
    let fields: Vec<String> = column_ref
        .child("fields")
        .map(|f| {
            f.children()
                .iter()
                .filter_map(|field| match field.key() {
                    "String" => field.child("sval").map(|s| strip_quotes(s.value())),
                    "A_Star" => Some("*".to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    match fields.as_slice() {
        [table, column] => format!("{}.{column}", scope.resolve_table(table)),
        [column] => column.clone(),
        [.., schema_table, column] => format!("{}.{column}", scope.resolve_table(schema_table)),
        [] => String::new(),
    }
}

/// Renders a `FuncCall` as `name(arg, ...)`.
pub fn function_call(func: &ParseNode, scope: &Scope) -> String {
    let name = string_values_of(func.child("funcname"))
        .pop()
        .unwrap_or_default();
    if func.child("agg_star").is_some_and(|n| n.value() == "true") {
        return format!("{name}(*)");
    }
    let args_scope = Scope {
        tables:         scope.tables.clone(),
        select_aliases: Vec::new(),
    };
    let args = func
        .child("args")
        .map(|a| {
            a.children()
                .iter()
                .map(|arg| render(arg, &args_scope))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let distinct = if func.child("agg_distinct").is_some_and(|n| n.value() == "true") {
        "DISTINCT "
    } else {
        ""
    };
    format!("{name}({distinct}{})", args.join(", "))
}

/// Renders the single expression wrapped by a field node such as `lexpr`.
pub fn render_wrapped(wrapper: Option<&Arc<ParseNode>>, scope: &Scope) -> String {
    match wrapper.and_then(|w| w.children().first()) {
        Some(expr) => render(expr, scope),
        None => NULL_OPERAND.to_string(),
    }
}

/// Renders an expression node.
pub fn render(expr: &ParseNode, scope: &Scope) -> String {
    match expr.key() {
        "ColumnRef" => {
            let name = column_name(expr, scope);
            scope
                .resolve_select_alias(&name)
                .map(str::to_string)
                .unwrap_or(name)
        }
        "FuncCall" => function_call(expr, scope),
        "A_Const" => constant(expr),
        "A_Expr" => {
            let left = render_wrapped(expr.child("lexpr"), scope);
            let op = operator_name(expr.child("name"));
            let right = render_wrapped(expr.child("rexpr"), scope);
            format!("({left} {op} {right})")
        }
        "TypeCast" => {
            let arg = render_wrapped(expr.child("arg"), scope);
            let type_name = expr
                .path(&["typeName", "names"])
                .map(|n| string_values(n))
                .and_then(|mut names| names.pop())
                .unwrap_or_default();
            format!("{arg}::{type_name}")
        }
        "SubLink" => SUBQUERY.to_string(),
        "CollateClause" => {
            let arg = render_wrapped(expr.child("arg"), scope);
            let collation = string_values_of(expr.child("collname")).join(".");
            format!("{arg} COLLATE \"{collation}\"")
        }
        "BoolExpr" => {
            let delimiter = if expr.value_of("boolop") == "AND_EXPR" {
                " and "
            } else {
                " or "
            };
            let parts = expr
                .child("args")
                .map(|a| a.children().iter().map(|c| render(c, scope)).collect::<Vec<_>>())
                .unwrap_or_default();
            format!("({})", parts.join(delimiter))
        }
        "List" => {
            let items = expr
                .child("items")
                .map(|i| i.children().iter().map(|c| render(c, scope)).collect::<Vec<_>>())
                .unwrap_or_default();
            format!("({})", items.join(", "))
        }
        "SetToDefault" => "DEFAULT".to_string(),
        other => {
            tracing::debug!("Unexpected expression node: {other}");
            UNKNOWN_EXPRESSION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node(value: serde_json::Value) -> Arc<ParseNode> {
        let root = ParseNode::from_json(&value);
        root.children()[0].clone()
    }

    #[test]
    fn column_alias_resolves_to_table() {
        let col = node(json!({"ColumnRef": {"fields": [{"String": {"sval": "e"}}, {"String": {"sval": "id"}}]}}));
        let scope = Scope::new().with_table("e", "employees");
        assert_eq!(render(&col, &scope), "employees.id");
    }

    #[test]
    fn zero_integer_constant() {
        let c = node(json!({"A_Const": {"ival": {}}}));
        assert_eq!(render(&c, &Scope::new()), "0");
        let s = node(json!({"A_Const": {"sval": {"sval": "Bob"}}}));
        assert_eq!(render(&s, &Scope::new()), "Bob");
    }

    #[test]
    fn count_star() {
        let f = node(json!({"FuncCall": {"funcname": [{"String": {"sval": "count"}}], "agg_star": true}}));
        assert_eq!(render(&f, &Scope::new()), "count(*)");
    }

    #[test]
    fn join_quoted_items() {
        assert_eq!(join_quoted(&["a".into(), "b".into()], ","), "'a', 'b'");
    }
}
