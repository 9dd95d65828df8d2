#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use typed_builder::TypedBuilder;

use super::session::{PropertyOrder, PropertyState, SessionConfig, property_state_to_string};
use crate::{sql::ParseNode, types::QueryOutput};

/// One student statement as handed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionInput {
    /// Student or submission identifier.
    pub id:       String,
    /// Attempt number for this question.
    #[serde(default = "first_attempt")]
    pub attempt:  u32,
    /// Question the statement answers.
    #[serde(default)]
    pub question: String,
    /// Raw SQL text.
    pub query:    String,
}

/// Serde default for [`SubmissionInput::attempt`].
fn first_attempt() -> u32 {
    1
}

/// Everything needed to grade one question: policy, reference statements
/// and the submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Grading policy; the default session when omitted.
    #[serde(default)]
    pub session:     SessionConfig,
    /// Reference statements; the first one defines the expected output.
    pub models:      Vec<String>,
    /// Statements to grade.
    pub submissions: Vec<SubmissionInput>,
}

/// A parsed and executed reference statement.
#[derive(Debug, Clone)]
pub struct ModelQuery {
    /// SQL text.
    pub text:        String,
    /// Parse tree.
    pub tree:        Arc<ParseNode>,
    /// Canonical fingerprint.
    pub fingerprint: String,
    /// Output of executing the statement.
    pub output:      QueryOutput,
}

/// Grading state of one submission, filled in stage by stage.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Student or submission identifier.
    pub id:                 String,
    /// Attempt number.
    pub attempt:            u32,
    /// Question number.
    pub question:           String,
    /// Current statement text; replaced when a syntax repair succeeds.
    pub text:               String,
    /// Text as handed in, kept only when `text` was repaired.
    pub original_text:      Option<String>,
    /// Whether `text` parses.
    pub parseable:          bool,
    /// Parse tree of `text`.
    pub tree:               Option<Arc<ParseNode>>,
    /// Canonical fingerprint of `text`.
    pub fingerprint:        String,
    /// Output of executing `text`.
    pub output:             QueryOutput,
    /// Error reported while executing `text`.
    pub execution_error:    Option<String>,
    /// Syntax verdict.
    pub syntax:             PropertyState,
    /// Semantics verdict.
    pub semantics:          PropertyState,
    /// Results verdict.
    pub results:            PropertyState,
    /// Character distance to the nearest candidate statement.
    pub text_edit_distance: Option<usize>,
    /// Tree-edit distance to the nearest candidate statement.
    pub tree_edit_distance: Option<usize>,
    /// Syntax analysis explanation.
    pub syntax_message:     String,
    /// Semantics analysis explanation.
    pub semantics_message:  String,
    /// Results analysis explanation.
    pub results_message:    String,
    /// Running notes appended by every stage, including failures.
    pub feedback:           String,
    /// 1-based correctness level.
    pub correctness_level:  usize,
    /// Correctness level mapped onto `[0, 1]`.
    pub normalized_value:   f64,
    /// Final grade out of 1.
    pub grade:              f64,
    /// Final student-facing message.
    pub message:            String,
}

impl Submission {
    /// Creates an ungraded record.
    pub fn new(input: SubmissionInput) -> Self {
        Self {
            id:                 input.id,
            attempt:            input.attempt,
            question:           input.question,
            text:               input.query,
            original_text:      None,
            parseable:          false,
            tree:               None,
            fingerprint:        String::new(),
            output:             QueryOutput::default(),
            execution_error:    None,
            syntax:             PropertyState::Invalid,
            semantics:          PropertyState::Invalid,
            results:            PropertyState::Invalid,
            text_edit_distance: None,
            tree_edit_distance: None,
            syntax_message:     String::new(),
            semantics_message:  String::new(),
            results_message:    String::new(),
            feedback:           String::new(),
            correctness_level:  0,
            normalized_value:   0.0,
            grade:              0.0,
            message:            String::new(),
        }
    }

    /// Appends a note to the running feedback.
    pub fn add_feedback(&mut self, note: impl AsRef<str>) {
        self.feedback.push_str(note.as_ref());
    }

    /// True once the results verdict is correct.
    pub fn is_correct(&self) -> bool {
        self.results == PropertyState::Correct
    }

    /// Builds the student-facing message from the analysis explanations.
    pub fn construct_message(&self) -> String {
        if self.grade == 1.0 {
            return "🟢 Correct.".to_string();
        }

        let mut message = self.semantics_message.clone();
        if !self.syntax_message.is_empty() || !self.results_message.is_empty() {
            message.push_str("5️⃣ Additional Information:\n");
            if !self.syntax_message.is_empty() {
                message.push_str(&format!("● Syntax Analysis: {}\n", self.syntax_message));
            }
            if !self.results_message.is_empty() {
                message.push_str(&format!("● Results Analysis: {}", self.results_message));
            }
        }
        message
    }

    /// Exportable record of the finished grading.
    pub fn output_record(&self, order: PropertyOrder) -> OutputRecord {
        let original = self.original_text.clone().unwrap_or_else(|| self.text.clone());
        let corrected = self.original_text.as_ref().map(|_| self.text.clone());
        OutputRecord::builder()
            .id(self.id.clone())
            .attempt(self.attempt)
            .question(self.question.clone())
            .query(original)
            .corrected_query(corrected)
            .syntax(property_state_to_string(self.syntax))
            .semantics(property_state_to_string(self.semantics))
            .results(property_state_to_string(self.results))
            .correctness_level(self.correctness_level)
            .normalized_value(self.normalized_value)
            .grade(self.grade)
            .fingerprint(self.fingerprint.clone())
            .text_edit_distance(self.text_edit_distance)
            .tree_edit_distance(self.tree_edit_distance)
            .execution_error(self.execution_error.clone())
            .feedback(self.message.clone())
            .notes(self.feedback.trim().to_string())
            .grader_comment(order.grader_comment())
            .build()
    }
}

/// Graded submission as written out by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
pub struct OutputRecord {
    /// Student or submission identifier.
    pub id:                 String,
    /// Attempt number.
    pub attempt:            u32,
    /// Question number.
    pub question:           String,
    /// Statement as handed in.
    pub query:              String,
    /// Statement after an automatic syntax repair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_query:    Option<String>,
    /// Syntax verdict.
    pub syntax:             String,
    /// Semantics verdict.
    pub semantics:          String,
    /// Results verdict.
    pub results:            String,
    /// 1-based correctness level.
    pub correctness_level:  usize,
    /// Correctness level mapped onto `[0, 1]`.
    pub normalized_value:   f64,
    /// Grade received.
    pub grade:              f64,
    /// Maximum grade.
    #[builder(default = 1.0)]
    pub out_of:             f64,
    /// Canonical fingerprint of the graded statement.
    pub fingerprint:        String,
    /// Character distance to the nearest candidate statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_edit_distance: Option<usize>,
    /// Tree-edit distance to the nearest candidate statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_edit_distance: Option<usize>,
    /// Database error raised by the statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_error:    Option<String>,
    /// Student-facing feedback.
    pub feedback:           String,
    /// Short per-stage notes.
    pub notes:              String,
    /// How the session weighs the graded axes.
    pub grader_comment:     String,
}

/// One line of the CLI summary table.
#[derive(Tabled, Clone, Debug)]
pub struct SummaryRow {
    #[tabled(rename = "Id")]
    /// Submission identifier.
    pub id:        String,
    #[tabled(rename = "Question")]
    /// Question number.
    pub question:  String,
    #[tabled(rename = "Syntax")]
    /// Syntax verdict.
    pub syntax:    String,
    #[tabled(rename = "Semantics")]
    /// Semantics verdict.
    pub semantics: String,
    #[tabled(rename = "Results")]
    /// Results verdict.
    pub results:   String,
    #[tabled(rename = "Level")]
    /// Correctness level.
    pub level:     usize,
    #[tabled(rename = "Grade")]
    /// Grade out of 1.
    pub grade:     String,
}

impl From<&OutputRecord> for SummaryRow {
    fn from(record: &OutputRecord) -> Self {
        Self {
            id:        record.id.clone(),
            question:  record.question.clone(),
            syntax:    record.syntax.clone(),
            semantics: record.semantics.clone(),
            results:   record.results.clone(),
            level:     record.correctness_level,
            grade:     format!("{:.2}/{:.2}", record.grade, record.out_of),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        Submission::new(SubmissionInput {
            id:       "s1".into(),
            attempt:  1,
            question: "1".into(),
            query:    "select * from t".into(),
        })
    }

    #[test]
    fn full_grade_gets_short_message() {
        let mut sub = submission();
        sub.grade = 1.0;
        sub.semantics_message = "ignored".into();
        assert_eq!(sub.construct_message(), "🟢 Correct.");
    }

    #[test]
    fn message_appends_additional_information() {
        let mut sub = submission();
        sub.semantics_message = "Semantics minor error.\n".into();
        sub.results_message = "Correct results are contained within the query results.\n".into();
        let message = sub.construct_message();
        assert!(message.starts_with("Semantics minor error.\n5️⃣ Additional Information:\n"));
        assert!(message.contains("● Results Analysis: Correct results"));
        assert!(!message.contains("Syntax Analysis"));
    }

    #[test]
    fn record_keeps_original_and_corrected_text() {
        let mut sub = submission();
        sub.original_text = Some("selec * from t".into());
        let record = sub.output_record(PropertyOrder::SySmRe);
        assert_eq!(record.query, "selec * from t");
        assert_eq!(record.corrected_query.as_deref(), Some("select * from t"));
        assert_eq!(record.out_of, 1.0);
        assert!(record.grader_comment.contains("introductory"));
    }
}
