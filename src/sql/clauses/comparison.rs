#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::Serialize;

/// Outcome of comparing a single optional clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseOutcome {
    /// Neither statement has the clause.
    Absent,
    /// The clauses match.
    Correct,
    /// The clauses differ, or only one side has the clause.
    Incorrect,
}

impl ClauseOutcome {
    /// Returns true for [`ClauseOutcome::Incorrect`].
    pub fn is_incorrect(self) -> bool {
        self == Self::Incorrect
    }
}

/// Result of comparing one optional clause of a reference statement with the
/// same clause of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseComparison {
    /// Tri-state verdict.
    pub outcome:    ClauseOutcome,
    /// Diagnostic text, a sentinel sentence when the clause is absent.
    pub message:    String,
    /// Remediation hints raised by this clause.
    pub next_steps: Vec<String>,
}

impl ClauseComparison {
    /// Both sides lack the clause.
    pub fn absent(message: impl Into<String>) -> Self {
        Self {
            outcome:    ClauseOutcome::Absent,
            message:    message.into(),
            next_steps: Vec::new(),
        }
    }

    /// Builds a comparison from a mismatch message; an empty message means
    /// the clauses match.
    pub fn from_message(message: String, next_steps: Vec<String>) -> Self {
        let outcome = if message.is_empty() {
            ClauseOutcome::Correct
        } else {
            ClauseOutcome::Incorrect
        };
        Self {
            outcome,
            message,
            next_steps,
        }
    }
}

/// Structured verdict produced by every statement-level comparator.
///
/// The reference side is always "what is required"; labels in
/// `correct_parts` and `incorrect_parts` name components of the statement
/// (`Target table`, `WHERE clause`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    /// True when no component was found incorrect.
    pub equal:           bool,
    /// Components that match the reference.
    pub correct_parts:   Vec<String>,
    /// Components that differ from the reference.
    pub incorrect_parts: Vec<String>,
    /// Remediation hints, in the order they were raised.
    pub next_steps:      Vec<String>,
    /// Accumulated diagnostic text.
    pub message:         String,
}

impl Default for ComparisonResult {
    fn default() -> Self {
        Self {
            equal:           true,
            correct_parts:   Vec::new(),
            incorrect_parts: Vec::new(),
            next_steps:      Vec::new(),
            message:         String::new(),
        }
    }
}

impl ComparisonResult {
    /// Creates an empty, matching result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a matching component.
    pub fn correct(&mut self, part: impl Into<String>) {
        self.correct_parts.push(part.into());
    }

    /// Records a mismatching component with its diagnostic line.
    pub fn incorrect(&mut self, part: impl Into<String>, message: impl AsRef<str>) {
        self.incorrect_parts.push(part.into());
        self.message.push_str(message.as_ref());
        self.equal = false;
    }

    /// Appends a remediation hint.
    pub fn hint(&mut self, step: impl Into<String>) {
        self.next_steps.push(step.into());
    }

    /// Folds an optional clause comparison into this result under `label`.
    ///
    /// Absent clauses are neither correct nor incorrect.
    pub fn record_clause(&mut self, label: &str, clause: ClauseComparison) {
        match clause.outcome {
            ClauseOutcome::Absent => {}
            ClauseOutcome::Correct => self.correct(label),
            ClauseOutcome::Incorrect => self.incorrect(label, &clause.message),
        }
        self.next_steps.extend(clause.next_steps);
    }

    /// Merges another result into this one: lists are concatenated, messages
    /// appended, and the result stays equal only if both were.
    pub fn merge(&mut self, other: ComparisonResult) {
        self.equal &= other.equal;
        self.correct_parts.extend(other.correct_parts);
        self.incorrect_parts.extend(other.incorrect_parts);
        self.next_steps.extend(other.next_steps);
        self.message.push_str(&other.message);
    }
}
