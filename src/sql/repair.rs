#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Edit distances and the text-level repairs attempted on unparseable
//! submissions.
//!
//! Everything here is pure: callers decide whether a candidate is accepted by
//! running it through the parser.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::keywords::{SQL_2016_KEYWORDS, is_keyword};

/// Characters that separate words when queries are tokenized.
const WORD_SEPARATORS: [char; 5] = [' ', '\t', '\n', ';', ','];

/// Largest absolute distance a keyword correction may span.
const KEYWORD_MAX_DISTANCE: usize = 2;

/// Largest normalized distance a keyword correction may span.
const KEYWORD_MAX_NORMALIZED: f64 = 0.27;

/// Unit costs used by the character-level Levenshtein distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditCosts {
    /// Cost of inserting a character.
    pub insert:  usize,
    /// Cost of deleting a character.
    pub delete:  usize,
    /// Cost of replacing a character.
    pub replace: usize,
}

impl Default for EditCosts {
    fn default() -> Self {
        Self {
            insert:  1,
            delete:  1,
            replace: 1,
        }
    }
}

/// Character-level Levenshtein distance with unit costs.
pub fn edit_distance(source: &str, target: &str) -> usize {
    edit_distance_with(source, target, EditCosts::default())
}

/// Character-level Levenshtein distance with the given costs.
pub fn edit_distance_with(source: &str, target: &str, costs: EditCosts) -> usize {
    let s: Vec<char> = source.chars().collect();
    let t: Vec<char> = target.chars().collect();

    let mut row: Vec<usize> = (0..=s.len()).map(|i| i * costs.delete).collect();
    for (j, tc) in t.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = (j + 1) * costs.insert;
        for i in 1..=s.len() {
            let above = row[i];
            row[i] = if s[i - 1] == *tc {
                diagonal
            } else {
                (row[i - 1] + costs.delete)
                    .min(above + costs.insert)
                    .min(diagonal + costs.replace)
            };
            diagonal = above;
        }
    }
    row[s.len()]
}

/// Normalized Levenshtein distance `2d / (alpha * (|a| + |b|) + d)` where
/// `alpha` is the larger of the insert and delete costs.
pub fn normalized_edit_distance(source: &str, target: &str) -> f64 {
    let costs = EditCosts::default();
    let d = edit_distance_with(source, target, costs) as f64;
    let alpha = costs.insert.max(costs.delete) as f64;
    let total = (source.chars().count() + target.chars().count()) as f64;
    let denominator = alpha * total + d;
    if denominator == 0.0 {
        0.0
    } else {
        2.0 * d / denominator
    }
}

/// Kind of a single step in a word-level edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordOp {
    /// Words are identical.
    Equal,
    /// Source word is removed.
    Delete,
    /// Target word is added.
    Insert,
    /// Source word becomes the target word.
    Replace,
}

/// One step of a word-level edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEdit {
    /// Operation performed.
    pub op:     WordOp,
    /// Word taken from the source, empty for inserts.
    pub source: String,
    /// Word taken from the target, empty for deletes.
    pub target: String,
}

/// Word-level Levenshtein distance and its edit script, in source order.
///
/// Backtracking prefers delete, then insert, then the diagonal step.
pub fn word_edit_distance(source: &[&str], target: &[&str]) -> (usize, Vec<WordEdit>) {
    let (m, n) = (source.len(), target.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for i in 0..=m {
        for j in 0..=n {
            dp[i][j] = if i == 0 {
                j
            } else if j == 0 {
                i
            } else if source[i - 1] == target[j - 1] {
                dp[i - 1][j - 1]
            } else {
                (dp[i - 1][j] + 1)
                    .min(dp[i][j - 1] + 1)
                    .min(dp[i - 1][j - 1] + 1)
            };
        }
    }

    let mut path = Vec::new();
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && dp[i][j] == dp[i - 1][j] + 1 {
            path.push(WordEdit {
                op:     WordOp::Delete,
                source: source[i - 1].to_string(),
                target: String::new(),
            });
            i -= 1;
        } else if j > 0 && dp[i][j] == dp[i][j - 1] + 1 {
            path.push(WordEdit {
                op:     WordOp::Insert,
                source: String::new(),
                target: target[j - 1].to_string(),
            });
            j -= 1;
        } else {
            let op = if source[i - 1] == target[j - 1] {
                WordOp::Equal
            } else {
                WordOp::Replace
            };
            path.push(WordEdit {
                op,
                source: source[i - 1].to_string(),
                target: target[j - 1].to_string(),
            });
            i -= 1;
            j -= 1;
        }
    }
    path.reverse();
    (dp[m][n], path)
}

/// Collapses runs of spaces and lowercases the query.
pub fn preprocess_query(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut previous_space = false;
    for c in query.chars() {
        if c == ' ' && previous_space {
            continue;
        }
        previous_space = c == ' ';
        out.push(c);
    }
    out.to_lowercase()
}

/// Splits a query into its non-empty words.
pub fn tokenize(query: &str) -> Vec<&str> {
    query
        .split(WORD_SEPARATORS)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Byte spans of every word in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if WORD_SEPARATORS.contains(&c) {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Replaces every whole word matching `matches` with `replacement`.
fn replace_words(text: &str, replacement: &str, matches: impl Fn(&str) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (s, e) in word_spans(text) {
        if matches(&text[s..e]) {
            out.push_str(&text[cursor..s]);
            out.push_str(replacement);
            cursor = e;
        }
    }
    out.push_str(&text[cursor..]);
    out
}

/// Removes every whole occurrence of `word`, along with one adjacent comma.
fn remove_word(text: &str, word: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (s, e) in word_spans(text) {
        if &text[s..e] != word {
            continue;
        }
        let (mut start, mut end) = (s, e);
        if text[e..].starts_with(',') {
            end = e + 1;
        } else if text[..s].ends_with(',') {
            start = s - 1;
        }
        start = start.max(cursor);
        out.push_str(&text[cursor..start]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Alphanumeric cores of a word, ignoring quotes and punctuation.
fn word_core(word: &str) -> BTreeSet<&str> {
    word.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect()
}

/// A repair derived from a reference query, pending a parse check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRepair {
    /// Reference text with the submission's identifiers substituted in.
    pub text:          String,
    /// Summed character cost of the keyword-level edits.
    pub syntax_cost:   usize,
    /// Word-level distance between submission and reference.
    pub word_distance: usize,
}

/// Derives a parse candidate for `submission` from `reference`.
///
/// Both inputs are expected to be preprocessed. Keyword edits are charged by
/// their character cost while identifier edits are free and are instead
/// carried into the candidate: an identifier only present in the reference is
/// removed from it, and a replaced identifier takes the submission's
/// spelling. Returns `None` when the keyword cost exceeds `threshold`.
pub fn repair_from_reference(
    submission: &str,
    reference: &str,
    threshold: usize,
) -> Option<ReferenceRepair> {
    let source = tokenize(submission);
    let target = tokenize(reference);
    let (word_distance, path) = word_edit_distance(&source, &target);

    let mut candidate = reference.to_string();
    let mut syntax_cost = 0;
    for edit in &path {
        match edit.op {
            WordOp::Equal => {}
            WordOp::Delete => syntax_cost += edit.source.chars().count(),
            WordOp::Insert => {
                if is_keyword(&edit.target) {
                    syntax_cost += edit.target.chars().count();
                } else {
                    candidate = remove_word(&candidate, &edit.target);
                }
            }
            WordOp::Replace => {
                if is_keyword(&edit.target) {
                    syntax_cost += edit_distance(&edit.source, &edit.target);
                } else if word_core(&edit.source) != word_core(&edit.target) {
                    candidate = replace_words(&candidate, &edit.source, |w| w == edit.target);
                }
            }
        }
    }

    if syntax_cost > threshold {
        return None;
    }
    Some(ReferenceRepair {
        text: candidate,
        syntax_cost,
        word_distance,
    })
}

/// Returns the closest keyword within the correction limits, if any.
pub fn closest_keyword(token: &str) -> Option<&'static str> {
    let upper = token.to_ascii_uppercase();
    SQL_2016_KEYWORDS
        .iter()
        .filter_map(|k| {
            let d = edit_distance(&upper, k);
            let normalized = normalized_edit_distance(&upper, k);
            (d <= KEYWORD_MAX_DISTANCE && normalized <= KEYWORD_MAX_NORMALIZED).then_some((d, *k))
        })
        .min_by_key(|(d, _)| *d)
        .map(|(_, k)| k)
}

/// Replaces each non-keyword word with its closest keyword, when one lies
/// within the correction limits. Returns the trimmed text when anything
/// changed.
pub fn repair_with_keywords(query: &str) -> Option<String> {
    let corrections = tokenize(query)
        .into_iter()
        .filter(|t| !is_keyword(t))
        .filter_map(|t| closest_keyword(t).map(|k| (t.to_ascii_uppercase(), k)))
        .unique_by(|(t, _)| t.clone())
        .collect::<Vec<_>>();

    if corrections.is_empty() {
        return None;
    }

    let mut text = query.to_string();
    for (token, keyword) in corrections {
        text = replace_words(&text, keyword, |w| w.eq_ignore_ascii_case(&token));
    }
    Some(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_word_takes_adjacent_comma() {
        assert_eq!(remove_word("select a, b from t", "a"), "select  b from t");
        assert_eq!(remove_word("select a,b from t", "b"), "select a from t");
    }

    #[test]
    fn replace_words_is_whole_word() {
        let out = replace_words("select * from t", "emp", |w| w == "t");
        assert_eq!(out, "select * from emp");
    }

    #[test]
    fn preprocess_collapses_spaces() {
        assert_eq!(preprocess_query("SELECT  *   FROM T"), "select * from t");
    }
}
