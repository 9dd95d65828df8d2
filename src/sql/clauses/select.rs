#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! SELECT statements: the select list, GROUP BY, HAVING and ORDER BY, plus
//! the statement-level comparison that ties them to FROM and WHERE.

use itertools::Itertools;

use super::{
    comparison::{ClauseComparison, ClauseOutcome, ComparisonResult},
    condition::{self, ConditionNode},
    expr::{self, Scope},
    from::{self, FromInfo},
    sorted_difference,
};
use crate::sql::tree::{ParseNode, strip_quotes};

/// Rendering of an ORDER BY position that does not name a select item.
pub const INVALID_POSITION: &str = "<Invalid Position Reference>";

/// Category of a select-list or GROUP BY item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ItemKind {
    /// A column reference, including `*`.
    Column,
    /// A function call.
    Function,
    /// Any other expression.
    Expression,
}

impl ItemKind {
    /// Classifies an expression node.
    fn of(node: &ParseNode) -> Self {
        match node.key() {
            "ColumnRef" => Self::Column,
            "FuncCall" => Self::Function,
            _ => Self::Expression,
        }
    }

    /// Plural noun used in messages.
    fn plural(self) -> &'static str {
        match self {
            Self::Column => "columns",
            Self::Function => "functions",
            Self::Expression => "expressions",
        }
    }
}

/// One rendered item of a select list or GROUP BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Category of the item.
    pub kind:  ItemKind,
    /// Rendered expression.
    pub text:  String,
    /// Output alias, empty when none.
    pub alias: String,
}

/// Sorted texts of the items of one kind.
fn texts_of(items: &[Projection], kind: ItemKind) -> Vec<String> {
    items
        .iter()
        .filter(|i| i.kind == kind)
        .map(|i| i.text.clone())
        .sorted()
        .collect()
}

/// Joins items as `a, b, and c`.
fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

/// Select list of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectList {
    /// True for `SELECT DISTINCT`.
    pub distinct: bool,
    /// Items in source order.
    pub items:    Vec<Projection>,
}

impl SelectList {
    /// Extracts the select list of a `SelectStmt` node.
    pub fn extract(statement: &ParseNode, from: &FromInfo) -> Self {
        let scope = from.scope();
        let items = statement
            .child("targetList")
            .map(|list| {
                list.children()
                    .iter()
                    .filter(|t| t.key() == "ResTarget")
                    .filter_map(|target| {
                        let value = target.child("val")?.children().first()?;
                        Some(Projection {
                            kind:  ItemKind::of(value),
                            text:  expr::render(value, &scope),
                            alias: strip_quotes(&target.value_of("name")),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            distinct: statement.child("distinctClause").is_some(),
            items,
        }
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Scope that resolves both the FROM aliases and this list's output
    /// aliases.
    pub fn scope(&self, from: &FromInfo) -> Scope {
        self.items
            .iter()
            .fold(from.scope(), |scope, item| scope.with_select_alias(&item.alias, &item.text))
    }

    /// Goal sentence for the select list.
    pub fn describe(&self) -> String {
        let prefix = if self.distinct {
            "Return distinct data from "
        } else {
            "Return data from "
        };
        let texts: Vec<String> = [ItemKind::Column, ItemKind::Function, ItemKind::Expression]
            .into_iter()
            .flat_map(|kind| self.items.iter().filter(move |i| i.kind == kind))
            .map(|i| i.text.clone())
            .collect();
        match texts.len() {
            0 => format!("{prefix}0 columns"),
            1 => format!("{prefix}1 column: {}", texts[0]),
            n => format!("{prefix}{n} columns: {}", join_with_and(&texts)),
        }
    }
}

/// Compares two select lists.
pub fn compare_select(reference: &SelectList, submission: &SelectList) -> ClauseComparison {
    if reference.is_empty() && submission.is_empty() {
        return ClauseComparison::absent("Both queries have no SELECT clause.");
    }

    let mut message = String::new();
    let mut next_steps = Vec::new();

    if reference.distinct && !submission.distinct {
        message.push_str("● Missing DISTINCT keyword.\n");
        next_steps.push("💡 Add the DISTINCT keyword to eliminate duplicate rows in your SELECT clause.".to_string());
    } else if !reference.distinct && submission.distinct {
        message.push_str("● Unexpected DISTINCT keyword.\n");
        next_steps
            .push("💡 Remove the DISTINCT keyword from your SELECT clause if duplicates are acceptable.".to_string());
    }

    for kind in [ItemKind::Column, ItemKind::Function, ItemKind::Expression] {
        let expected = texts_of(&reference.items, kind);
        let found = texts_of(&submission.items, kind);
        if expected == found {
            continue;
        }
        let noun = kind.plural();
        message.push_str(&format!("\n● Mismatch in selected {noun}.\n"));
        let missing = sorted_difference(&expected, &found);
        let extra = sorted_difference(&found, &expected);
        if kind == ItemKind::Expression {
            if !missing.is_empty() {
                message.push_str(&format!("● Missing expressions: {}.\n", missing.join(", ")));
            }
            if !extra.is_empty() {
                message.push_str(&format!("● Extra expressions: {}.\n", extra.join(", ")));
            }
            continue;
        }
        if !missing.is_empty() {
            let list = expr::join_quoted(&missing, ",");
            message.push_str(&format!("● Missing {noun}: {list}.\n"));
            next_steps.push(format!("💡 Add the missing {noun}: {list} to your SELECT clause."));
        }
        if !extra.is_empty() {
            let list = expr::join_quoted(&extra, ",");
            message.push_str(&format!("● Extra {noun}: {list}.\n"));
            next_steps.push(format!("💡 Remove the extra {noun}: {list} from your SELECT clause."));
        }
    }

    ClauseComparison::from_message(message, next_steps)
}

/// Grouping construct wrapping the GROUP BY items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingKind {
    /// `GROUPING SETS (...)`.
    Sets,
    /// `ROLLUP (...)`.
    Rollup,
    /// `CUBE (...)`.
    Cube,
}

impl GroupingKind {
    /// Reads the parser's `GroupingSet.kind` value.
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "GROUPING_SET_SETS" | "GROUPING SETS" => Some(Self::Sets),
            "GROUPING_SET_ROLLUP" | "ROLLUP" => Some(Self::Rollup),
            "GROUPING_SET_CUBE" | "CUBE" => Some(Self::Cube),
            _ => None,
        }
    }

    /// SQL spelling.
    fn as_str(self) -> &'static str {
        match self {
            Self::Sets => "GROUPING SETS",
            Self::Rollup => "ROLLUP",
            Self::Cube => "CUBE",
        }
    }
}

/// GROUP BY clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupBy {
    /// Grouping constructs used, in order of appearance.
    pub grouping: Vec<GroupingKind>,
    /// Grouping items, flattened out of any grouping construct.
    pub items:    Vec<Projection>,
}

impl GroupBy {
    /// Extracts the GROUP BY clause of a `SelectStmt` node.
    pub fn extract(statement: &ParseNode, from: &FromInfo) -> Self {
        let mut info = Self::default();
        if let Some(clause) = statement.child("groupClause") {
            info.add_items(clause, &from.scope());
        }
        info
    }

    /// Adds the items of a list, descending into grouping sets.
    fn add_items(&mut self, list: &ParseNode, scope: &Scope) {
        for item in list.children() {
            if item.key() == "GroupingSet" {
                if let Some(kind) = GroupingKind::parse(&item.value_of("kind")) {
                    self.grouping.push(kind);
                }
                if let Some(content) = item.child("content") {
                    self.add_items(content, scope);
                }
                continue;
            }
            self.items.push(Projection {
                kind:  ItemKind::of(item),
                text:  expr::render(item, scope),
                alias: String::new(),
            });
        }
    }

    /// True when there is no GROUP BY clause.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.grouping.is_empty()
    }

    /// Goal sentence for the clause.
    pub fn describe(&self) -> String {
        let texts: Vec<String> = [ItemKind::Column, ItemKind::Function, ItemKind::Expression]
            .into_iter()
            .flat_map(|kind| self.items.iter().filter(move |i| i.kind == kind))
            .map(|i| i.text.clone())
            .collect();
        if let Some(kind) = self.grouping.first() {
            return format!("Group the result using {} on {}", kind.as_str(), join_with_and(&texts));
        }
        match texts.len() {
            0 => "No grouping applied.".to_string(),
            1 => format!("Group the result by 1 element: {}", texts[0]),
            n => format!("Group the result by {n} elements: {}", join_with_and(&texts)),
        }
    }
}

/// Compares two GROUP BY clauses.
pub fn compare_group_by(reference: &GroupBy, submission: &GroupBy) -> ClauseComparison {
    match (reference.is_empty(), submission.is_empty()) {
        (true, true) => return ClauseComparison::absent("Both queries have no GROUP BY clause."),
        (false, true) => return ClauseComparison::from_message("GROUP BY clause missing".to_string(), Vec::new()),
        (true, false) => {
            return ClauseComparison::from_message("GROUP BY clause unexpected".to_string(), Vec::new());
        }
        (false, false) => {}
    }

    let mut message = String::new();
    let has = |g: &GroupBy, kind| g.grouping.contains(&kind);
    if has(reference, GroupingKind::Sets) != has(submission, GroupingKind::Sets) {
        message.push_str("\n ● Grouping Sets: Mismatch.\n");
    }
    if has(reference, GroupingKind::Rollup) != has(submission, GroupingKind::Rollup) {
        message.push_str("● Rollup: Mismatch.\n");
    }
    if has(reference, GroupingKind::Cube) != has(submission, GroupingKind::Cube) {
        message.push_str("● Cube: Mismatch.\n");
    }
    for (kind, label) in [
        (ItemKind::Column, "● Columns: Mismatch in GROUP BY columns.\n"),
        (ItemKind::Function, "● Functions: Mismatch in GROUP BY functions.\n"),
        (ItemKind::Expression, "● Expressions: Mismatch in GROUP BY expressions.\n"),
    ] {
        if texts_of(&reference.items, kind) != texts_of(&submission.items, kind) {
            message.push_str(label);
        }
    }
    ClauseComparison::from_message(message, Vec::new())
}

/// Goal sentence for a HAVING clause.
pub fn describe_having(condition: Option<&ConditionNode>) -> String {
    match condition {
        Some(c) => format!("To filter grouped data having {c}"),
        None => "No conditions in HAVING clause".to_string(),
    }
}

/// Sort direction of an ORDER BY item. The parser's default direction is
/// ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// `ASC` or unspecified.
    Ascending,
    /// `DESC`.
    Descending,
    /// `USING op`.
    Using,
}

/// Placement of NULLs in an ORDER BY item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    /// Not specified.
    Default,
    /// `NULLS FIRST`.
    First,
    /// `NULLS LAST`.
    Last,
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Sorted-on expression, positions resolved against the select list.
    pub expression: String,
    /// Direction.
    pub direction:  SortDirection,
    /// NULL placement.
    pub nulls:      NullsOrder,
    /// Collation name, empty when none.
    pub collation:  String,
}

/// Extracts the ORDER BY items of a `SelectStmt` node.
pub fn extract_order_by(statement: &ParseNode, select: &SelectList, scope: &Scope) -> Vec<OrderItem> {
    let Some(clause) = statement.child("sortClause") else {
        return Vec::new();
    };
    clause
        .children()
        .iter()
        .filter(|c| c.key() == "SortBy")
        .map(|sort| {
            let expression = match sort.child("node").and_then(|n| n.children().first()) {
                Some(node) if node.key() == "A_Const" => expr::constant(node)
                    .parse::<usize>()
                    .ok()
                    .and_then(|pos| pos.checked_sub(1))
                    .and_then(|i| select.items.get(i))
                    .map(|item| item.text.clone())
                    .unwrap_or_else(|| INVALID_POSITION.to_string()),
                Some(node) => expr::render(node, scope),
                None => String::new(),
            };
            let direction = match sort.value_of("sortby_dir").as_str() {
                "SORTBY_DESC" => SortDirection::Descending,
                "SORTBY_USING" => SortDirection::Using,
                _ => SortDirection::Ascending,
            };
            let nulls = match sort.value_of("sortby_nulls").as_str() {
                "SORTBY_NULLS_FIRST" => NullsOrder::First,
                "SORTBY_NULLS_LAST" => NullsOrder::Last,
                _ => NullsOrder::Default,
            };
            OrderItem {
                expression,
                direction,
                nulls,
                collation: expr::string_values_of(sort.child("collation")).join("."),
            }
        })
        .collect()
}

/// Goal sentence for an ORDER BY clause.
pub fn describe_order_by(items: &[OrderItem]) -> String {
    if items.is_empty() {
        return "No ORDER BY clause present".to_string();
    }
    let parts: Vec<String> = items
        .iter()
        .map(|item| {
            let mut text = item.expression.clone();
            match item.direction {
                SortDirection::Ascending => text.push_str(" ascending"),
                SortDirection::Descending => text.push_str(" descending"),
                SortDirection::Using => {}
            }
            match item.nulls {
                NullsOrder::First => text.push_str(" nulls first"),
                NullsOrder::Last => text.push_str(" nulls last"),
                NullsOrder::Default => {}
            }
            if !item.collation.is_empty() {
                text.push_str(&format!(" collate \"{}\"", item.collation));
            }
            text
        })
        .collect();
    format!("Sort the output data by {}", join_with_and(&parts))
}

/// Compares two ORDER BY clauses item by item.
pub fn compare_order_by(reference: &[OrderItem], submission: &[OrderItem]) -> ClauseComparison {
    if reference.is_empty() && submission.is_empty() {
        return ClauseComparison::absent("Both queries have no ORDER BY clause.");
    }
    let mut message = String::new();
    if reference.len() != submission.len() {
        message.push_str("\n ● Order By: Different number of order items.\n");
    }
    for (i, (r, s)) in reference.iter().zip(submission).enumerate() {
        let n = i + 1;
        if r.expression != s.expression {
            message.push_str(&format!("● Order Item {n}: Mismatch in expressions.\n"));
        }
        if r.direction != s.direction {
            message.push_str(&format!("● Order Item {n}: Mismatch in sorting direction.\n"));
        }
        if r.nulls != s.nulls {
            message.push_str(&format!("● Order Item {n}: Mismatch in NULLS ordering.\n"));
        }
        if r.collation != s.collation {
            message.push_str(&format!("● Order Item {n}: Mismatch in collation.\n"));
        }
    }
    if reference.len() > submission.len() {
        message.push_str("● Order By: Reference has additional order items.\n");
    } else if submission.len() > reference.len() {
        message.push_str("● Order By: Other query has additional order items.\n");
    }
    ClauseComparison::from_message(message, Vec::new())
}

/// Everything extracted from a `SelectStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectInfo {
    /// Sources.
    pub from:     FromInfo,
    /// Select list.
    pub select:   SelectList,
    /// WHERE condition.
    pub filter:   Option<ConditionNode>,
    /// GROUP BY clause.
    pub group_by: GroupBy,
    /// HAVING condition.
    pub having:   Option<ConditionNode>,
    /// ORDER BY items.
    pub order_by: Vec<OrderItem>,
}

impl SelectInfo {
    /// Extracts every clause of a `SelectStmt` node.
    pub fn extract(statement: &ParseNode) -> Self {
        let from = FromInfo::extract(statement);
        let select = SelectList::extract(statement, &from);
        let scope = select.scope(&from);
        let filter = condition::extract_clause(statement.child("whereClause"), &scope);
        let group_by = GroupBy::extract(statement, &from);
        let having = condition::extract_clause(statement.child("havingClause"), &scope);
        let order_by = extract_order_by(statement, &select, &scope);
        Self {
            from,
            select,
            filter,
            group_by,
            having,
            order_by,
        }
    }

    /// Goal sentences, one per clause that is present.
    pub fn describe(&self) -> Vec<String> {
        let mut goals = vec![self.from.describe(), self.select.describe()];
        if self.filter.is_some() {
            goals.push(condition::describe_where(self.filter.as_ref()));
        }
        if !self.group_by.is_empty() {
            goals.push(self.group_by.describe());
        }
        if self.having.is_some() {
            goals.push(describe_having(self.having.as_ref()));
        }
        if !self.order_by.is_empty() {
            goals.push(describe_order_by(&self.order_by));
        }
        goals
    }

    /// Bullet summary used as the general goal of a query.
    pub fn summarize(&self) -> String {
        /// `n noun` or `n nouns`.
        fn counted(n: usize, noun: &str) -> String {
            if n == 1 { format!("{n} {noun}") } else { format!("{n} {noun}s") }
        }

        let mut out = String::new();
        if !self.from.tables.is_empty() {
            out.push_str(&format!("\n ● Retrieve data from {}; ", counted(self.from.tables.len(), "table")));
        }
        if !self.select.is_empty() {
            out.push_str(&format!("\n ● Select {}; ", counted(self.select.items.len(), "column")));
        }
        if self.filter.is_some() {
            out.push_str("\n ● Filter data based on certain conditions; ");
        }
        if !self.group_by.items.is_empty() {
            out.push_str(&format!("\n ● Group the results by {}; ", counted(self.group_by.items.len(), "element")));
        }
        if self.having.is_some() {
            out.push_str("\n ● Filter grouped data based on certain conditions; ");
        }
        if !self.order_by.is_empty() {
            out.push_str(&format!("\n ● Sort the output data by {}; ", counted(self.order_by.len(), "column")));
        }
        out
    }
}

/// Clauses of a SELECT statement in reporting order, with the hint raised
/// when the clause is wrong.
const CLAUSE_HINTS: [(&str, Option<&str>); 6] = [
    ("SELECT clause", None),
    (
        "FROM clause",
        Some("Check the FROM clause to ensure you are using the correct tables and joins as required."),
    ),
    ("WHERE clause", None),
    (
        "GROUP BY clause",
        Some("Review the GROUP BY clause to ensure you are grouping by the correct columns or expressions."),
    ),
    (
        "HAVING clause",
        Some("Check the HAVING clause to make sure the conditions applied to the grouped data are correct."),
    ),
    ("ORDER BY clause", Some("Adjust the ORDER BY clause to sort the results as specified.")),
];

/// Compares two SELECT statements clause by clause.
///
/// The returned message is the sectioned report (correct clauses, issues,
/// problem details, next steps).
pub fn compare(reference: &SelectInfo, submission: &SelectInfo) -> ComparisonResult {
    let comparisons = [
        compare_select(&reference.select, &submission.select),
        from::compare(&reference.from, &submission.from),
        condition::compare_clause("WHERE", reference.filter.as_ref(), submission.filter.as_ref()),
        compare_group_by(&reference.group_by, &submission.group_by),
        condition::compare_clause("HAVING", reference.having.as_ref(), submission.having.as_ref()),
        compare_order_by(&reference.order_by, &submission.order_by),
    ];

    let mut result = ComparisonResult::new();
    let mut details = Vec::new();
    for ((label, hint), clause) in CLAUSE_HINTS.iter().zip(comparisons) {
        match clause.outcome {
            ClauseOutcome::Absent => {}
            ClauseOutcome::Correct => result.correct(*label),
            ClauseOutcome::Incorrect => {
                result.incorrect_parts.push(label.to_string());
                result.equal = false;
                details.push(format!("{label}: {}", clause.message));
                result.next_steps.extend(clause.next_steps);
                if let Some(hint) = hint {
                    result.hint(*hint);
                }
            }
        }
    }

    let mut report = String::from("2️⃣ Correct Clauses:\n");
    if result.correct_parts.is_empty() {
        report.push_str("●  None.\n");
    }
    for clause in &result.correct_parts {
        report.push_str(&format!("✅ {clause}\n"));
    }
    report.push('\n');

    if !result.incorrect_parts.is_empty() {
        report.push_str("3️⃣ Issues found in the following clauses:\n");
        for clause in &result.incorrect_parts {
            report.push_str(&format!("❌ {clause}\n"));
        }
        report.push_str("\n❗ Problem Details:\n");
        for (i, detail) in details.iter().enumerate() {
            report.push_str(&format!("{}. {detail}\n", i + 1));
        }
        report.push('\n');
    }

    if result.next_steps.is_empty() {
        report.push_str("Excellent! Your query matches the reference query.\n");
    } else {
        report.push_str("4️⃣ Next steps:\n");
        for step in &result.next_steps {
            report.push_str(&format!("➡️ {step}\n"));
        }
    }

    result.message = report;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_oxford_and() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(join_with_and(&items), "a, b, and c");
        assert_eq!(join_with_and(&items[..1]), "a");
    }

    #[test]
    fn distinct_mismatch_is_reported() {
        let reference = SelectList {
            distinct: true,
            items:    vec![Projection {
                kind:  ItemKind::Column,
                text:  "name".into(),
                alias: String::new(),
            }],
        };
        let submission = SelectList {
            distinct: false,
            ..reference.clone()
        };
        let result = compare_select(&reference, &submission);
        assert!(result.outcome.is_incorrect());
        assert_eq!(result.message, "● Missing DISTINCT keyword.\n");
    }
}
