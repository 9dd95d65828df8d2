#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Per-submission syntax, results and semantics analyses.
pub mod analysis;
/// Correctness matrix and level classification.
pub mod matrix;
/// Staged grading pipeline.
pub mod pipeline;
/// Row-set and table-change comparison.
pub mod results;
/// Grading session policy.
pub mod session;
/// Submission, reference and output records.
pub mod submission;

pub use analysis::{Analyzer, PeerView, Stage};
pub use matrix::{CorrectnessMatrix, GradeError, MatrixRow, Properties};
pub use pipeline::{Pipeline, PipelineError, grade_assignment};
pub use results::{OutputComparison, compare_changes, compare_outputs, compare_rows};
pub use session::{
    Axis, PropertyLevel, PropertyOrder, PropertyState, SessionConfig, default_session,
    property_state_to_string,
};
pub use submission::{
    Assignment, ModelQuery, OutputRecord, Submission, SubmissionInput, SummaryRow,
};
