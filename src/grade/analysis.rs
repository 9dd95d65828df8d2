#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Per-submission analyses run by the pipeline stages.

use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::{
    matrix::{CorrectnessMatrix, Properties},
    results::compare_outputs,
    session::{PropertyLevel, PropertyState, SessionConfig},
    submission::{ModelQuery, Submission},
};
use crate::{
    backend::{ExecutionBackend, ParseError, ParsedStatement, SqlParser},
    sql::{
        ComparisonResult, ParseNode, compare_queries,
        repair::{edit_distance, preprocess_query, repair_from_reference, repair_with_keywords},
        tree_edit_distance,
    },
    types::QueryOutput,
};

/// Tree distance a candidate must beat to be considered at all.
const INITIAL_TREE_BOUND: usize = 100;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Parse, fingerprint and execute.
    Preprocess,
    /// Classify parseability, repairing minor syntax errors.
    Syntax,
    /// Compare outputs with the reference output.
    Results,
    /// Compare meaning with references and correct peers.
    Semantics,
    /// Compute the correctness level and the grade.
    Finalize,
}

impl Stage {
    /// Every stage after preprocessing, in order.
    pub const ANALYSES: [Stage; 4] = [Self::Syntax, Self::Results, Self::Semantics, Self::Finalize];

    /// Lower-case stage name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::Syntax => "syntax",
            Self::Results => "results",
            Self::Semantics => "semantics",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of another submission, taken before a stage starts.
#[derive(Debug, Clone)]
pub struct PeerView {
    /// Submission identifier.
    pub id:         String,
    /// Current statement text.
    pub text:       String,
    /// Parse tree, when the statement parses.
    pub tree:       Option<Arc<ParseNode>>,
    /// Whether the statement parses.
    pub parseable:  bool,
    /// Whether the results verdict was correct.
    pub correct:    bool,
    /// Whether executing the statement produced any output.
    pub has_output: bool,
}

impl From<&Submission> for PeerView {
    fn from(sub: &Submission) -> Self {
        Self {
            id:         sub.id.clone(),
            text:       sub.text.clone(),
            tree:       sub.tree.clone(),
            parseable:  sub.parseable,
            correct:    sub.is_correct(),
            has_output: !sub.output.is_empty(),
        }
    }
}

/// A statement a submission can be measured against.
struct Candidate<'a> {
    /// Statement text.
    text:       &'a str,
    /// Parse tree.
    tree:       &'a Arc<ParseNode>,
    /// Whether executing the statement produced any output.
    has_output: bool,
}

/// What executing a statement produced.
struct Execution {
    /// Rows or changes.
    output: QueryOutput,
    /// Database error message.
    error:  Option<String>,
    /// Note for the running feedback.
    note:   Option<String>,
}

/// Shared state of one grading run: policy, collaborators and references.
pub struct Analyzer<P, B> {
    /// Grading policy.
    session:      SessionConfig,
    /// Correctness matrix built from `session`.
    matrix:       CorrectnessMatrix,
    /// SQL parser.
    parser:       P,
    /// Execution backend.
    backend:      B,
    /// Serializes execution on backends that are not parallel-safe.
    backend_lock: Mutex<()>,
    /// Parsed and executed reference statements.
    models:       Vec<ModelQuery>,
}

impl<P: SqlParser, B: ExecutionBackend> Analyzer<P, B> {
    /// Creates an analyzer without reference statements.
    pub fn new(session: SessionConfig, parser: P, backend: B) -> Result<Self> {
        let matrix = CorrectnessMatrix::new(&session).context("Invalid grading session")?;
        Ok(Self {
            session,
            matrix,
            parser,
            backend,
            backend_lock: Mutex::new(()),
            models: Vec::new(),
        })
    }

    /// Grading policy.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Correctness matrix of the session.
    pub fn matrix(&self) -> &CorrectnessMatrix {
        &self.matrix
    }

    /// Reference statements.
    pub fn models(&self) -> &[ModelQuery] {
        &self.models
    }

    /// Replaces the reference statements.
    pub fn set_models(&mut self, models: Vec<ModelQuery>) {
        self.models = models;
    }

    /// Parses `text`, returning `None` when it is not valid SQL.
    async fn try_parse(&self, text: &str) -> Result<Option<ParsedStatement>> {
        match self.parser.parse(text).await {
            Ok(parsed) => Ok(Some(parsed)),
            Err(ParseError::Syntax(reason)) => {
                debug!("not parseable: {reason}");
                Ok(None)
            }
            Err(ParseError::Helper(e)) => Err(e.context("SQL parser unavailable")),
        }
    }

    /// Parses and executes a reference statement.
    pub async fn load_model(&self, text: &str) -> Result<ModelQuery, ParseError> {
        let parsed = self.parser.parse(text).await?;
        let execution = self.execute(text, &parsed.tree).await;
        if let Some(error) = &execution.error {
            warn!("reference statement reported an error: {error}");
        }
        Ok(ModelQuery {
            text:        text.to_string(),
            tree:        parsed.tree,
            fingerprint: parsed.fingerprint,
            output:      execution.output,
        })
    }

    /// Runs `text` on the backend, serialized when the backend requires it.
    ///
    /// Backend failures never propagate; they yield an empty output and a
    /// feedback note.
    async fn execute(&self, text: &str, tree: &Arc<ParseNode>) -> Execution {
        let _guard = if self.backend.parallel_safe() {
            None
        } else {
            Some(self.backend_lock.lock().await)
        };

        let is_select = tree.statement_type() == "SelectStmt";
        let result = if is_select {
            self.backend
                .execute_select(text)
                .await
                .map(|rows| (QueryOutput::Rows(rows), None))
        } else {
            self.backend
                .execute_non_select(text)
                .await
                .map(|outcome| (QueryOutput::Changes(outcome.changes), outcome.error))
        };

        match result {
            Ok((output, error)) => Execution {
                note: error.as_ref().map(|e| format!(" Query error: {e}")),
                output,
                error,
            },
            Err(e) => {
                warn!("execution failed: {e:#}");
                let output = if is_select {
                    QueryOutput::Rows(Vec::new())
                } else {
                    QueryOutput::Changes(Vec::new())
                };
                Execution {
                    output,
                    error: Some(format!("{e:#}")),
                    note: Some("DBMS crashed.".to_string()),
                }
            }
        }
    }

    /// Stores a parse result on `sub` and executes it.
    async fn adopt(&self, sub: &mut Submission, parsed: ParsedStatement) {
        let execution = self.execute(&sub.text, &parsed.tree).await;
        sub.parseable = true;
        sub.tree = Some(parsed.tree);
        sub.fingerprint = parsed.fingerprint;
        sub.output = execution.output;
        sub.execution_error = execution.error;
        if let Some(note) = execution.note {
            sub.add_feedback(note);
        }
    }

    /// Runs one stage on `sub`.
    pub async fn run(&self, stage: Stage, sub: &mut Submission, peers: &[PeerView]) -> Result<()> {
        match stage {
            Stage::Preprocess => self.preprocess(sub).await,
            Stage::Syntax => self.syntax(sub, peers).await,
            Stage::Results => {
                self.results(sub);
                Ok(())
            }
            Stage::Semantics => {
                self.semantics(sub, peers);
                Ok(())
            }
            Stage::Finalize => {
                self.finalize(sub);
                Ok(())
            }
        }
    }

    /// Parses, fingerprints and executes the submission.
    pub async fn preprocess(&self, sub: &mut Submission) -> Result<()> {
        let trimmed = sub.text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("select") {
            sub.parseable = false;
            sub.syntax = PropertyState::Incorrect;
            return Ok(());
        }

        match self.try_parse(&sub.text).await? {
            Some(parsed) => self.adopt(sub, parsed).await,
            None => {
                sub.parseable = false;
                sub.syntax = PropertyState::Incorrect;
            }
        }
        Ok(())
    }

    /// Best parseable repair of `sub` derived from `candidates`, as
    /// `(text, parse, word distance)`.
    async fn repair_from<'a>(
        &self,
        submission: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Result<Option<(String, ParsedStatement, usize)>> {
        let mut best: Option<(String, ParsedStatement, usize)> = None;
        for candidate in candidates {
            let Some(repair) = repair_from_reference(
                submission,
                &preprocess_query(candidate),
                self.session.syntax_minor_threshold,
            ) else {
                continue;
            };
            if best.as_ref().is_some_and(|(_, _, d)| *d <= repair.word_distance) {
                continue;
            }
            if let Some(parsed) = self.try_parse(&repair.text).await? {
                best = Some((repair.text, parsed, repair.word_distance));
            }
        }
        Ok(best)
    }

    /// Classifies parseability; unparseable statements get a repair attempt
    /// from the references, then the keyword dictionary, then parseable peers.
    pub async fn syntax(&self, sub: &mut Submission, peers: &[PeerView]) -> Result<()> {
        if self.session.syntax_level == PropertyLevel::Absent {
            sub.syntax = PropertyState::Invalid;
            return Ok(());
        }
        if sub.parseable {
            sub.add_feedback(" SYNTAX: Correct! Well done. ");
            sub.syntax = PropertyState::Correct;
            return Ok(());
        }

        sub.add_feedback(" SYNTAX: The query is not parseable. ");
        let submission = preprocess_query(&sub.text);

        let mut repaired = self
            .repair_from(&submission, self.models.iter().map(|m| m.text.as_str()).collect::<Vec<_>>())
            .await?
            .map(|(text, parsed, d)| (text, parsed, Some(d)));

        if repaired.is_none()
            && let Some(text) = repair_with_keywords(&sub.text)
            && let Some(parsed) = self.try_parse(&text).await?
        {
            repaired = Some((text, parsed, None));
        }

        if repaired.is_none() {
            let others = peers
                .iter()
                .filter(|p| p.parseable && p.id != sub.id)
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>();
            repaired = self
                .repair_from(&submission, others)
                .await?
                .map(|(text, parsed, d)| (text, parsed, Some(d)));
        }

        let Some((text, parsed, word_distance)) = repaired else {
            sub.syntax = PropertyState::Incorrect;
            return Ok(());
        };

        debug!(id = %sub.id, "syntax repaired to {text:?}");
        sub.add_feedback(format!(
            " SYNTAX MINOR ERROR: To make the query parseable, it was changed to, '{text}'. "
        ));
        sub.syntax_message =
            format!("Syntax minor error. The query was changed to '{text}' make it parseable.\n");
        sub.original_text = Some(std::mem::replace(&mut sub.text, text));
        if word_distance.is_some() {
            sub.text_edit_distance = word_distance;
        }
        self.adopt(sub, parsed).await;
        sub.syntax = if self.session.syntax_level == PropertyLevel::ThreeLevels {
            PropertyState::MinorIncorrect
        } else {
            PropertyState::Incorrect
        };
        Ok(())
    }

    /// Compares the submission's output with the first reference's output.
    pub fn results(&self, sub: &mut Submission) {
        if self.session.results_level == PropertyLevel::Absent {
            sub.results = PropertyState::Invalid;
            return;
        }
        if !sub.parseable {
            sub.results = PropertyState::Incorrect;
            return;
        }
        let Some(model) = self.models.first() else {
            sub.results = PropertyState::Incorrect;
            return;
        };

        let comparison = compare_outputs(&model.output, &sub.output, self.session.check_order);
        if comparison.equal {
            sub.add_feedback(" RESULTS: Correct! Well done. ");
            sub.results = PropertyState::Correct;
        } else if comparison.subset && comparison.difference > 0 {
            sub.results = if self.session.results_level == PropertyLevel::ThreeLevels {
                PropertyState::MinorIncorrect
            } else {
                PropertyState::Incorrect
            };
            sub.add_feedback(
                " RESULTS: Not correct! Though, the correct results are contained within the query results, they were not correctly filtered. ",
            );
            sub.results_message =
                "Correct results are contained within the query results.\n".to_string();
        } else {
            let mut message = String::new();
            for (line, hint) in comparison.messages.iter().zip(&comparison.hints) {
                message.push_str(&format!("{line}\n💡 {hint}\n"));
            }
            sub.results_message = message;
            sub.results = PropertyState::Incorrect;
            sub.add_feedback(" RESULTS: The output of the query is not correct. ");
        }
    }

    /// Classifies meaning: nearest-neighbour search for minor fixes, then a
    /// clause-level comparison for feedback and partial credit.
    pub fn semantics(&self, sub: &mut Submission, peers: &[PeerView]) {
        let session = &self.session;
        if session.semantics_level == PropertyLevel::Absent {
            sub.semantics = PropertyState::Invalid;
            return;
        }
        if sub.is_correct() {
            sub.add_feedback(" SEMANTICS: Correct! Well done. ");
            sub.semantics_message = "Correct semantics.\n".to_string();
            sub.semantics = PropertyState::Correct;
            return;
        }
        let (true, Some(tree)) = (sub.parseable, sub.tree.clone()) else {
            sub.add_feedback(
                " SEMANTICS: Since the query is not parseable, we could not verify the semantics. ",
            );
            sub.semantics = PropertyState::Incorrect;
            sub.semantics_message =
                "The query is not parseable. Therefore, the semantics could not be verified.\n"
                    .to_string();
            return;
        };

        let correct_peers: Vec<&PeerView> = peers
            .iter()
            .filter(|p| p.id != sub.id && p.correct)
            .collect();
        let candidates: Vec<Candidate<'_>> = self
            .models
            .iter()
            .map(|m| Candidate {
                text:       &m.text,
                tree:       &m.tree,
                has_output: !m.output.is_empty(),
            })
            .chain(correct_peers.iter().filter_map(|p| {
                Some(Candidate {
                    text:       &p.text,
                    tree:       p.tree.as_ref()?,
                    has_output: p.has_output,
                })
            }))
            .collect();

        let text = preprocess_query(&sub.text);
        let mut min_tree = INITIAL_TREE_BOUND;
        let mut closest: Option<(&str, bool)> = None;
        for candidate in &candidates {
            let tree_distance = tree_edit_distance(&tree, candidate.tree);
            if tree_distance >= min_tree {
                continue;
            }
            let text_distance = edit_distance(&text, &preprocess_query(candidate.text));
            if text_distance == 0 && candidate.has_output {
                if session.results_level == PropertyLevel::Absent {
                    sub.semantics = PropertyState::Correct;
                    sub.semantics_message = "Correct semantics.\n".to_string();
                    return;
                }
                sub.text_edit_distance = Some(0);
                sub.tree_edit_distance = Some(tree_distance);
                closest = Some((candidate.text, true));
                break;
            }
            if tree_distance <= session.semantics_minor_threshold
                && text_distance <= session.syntax_minor_threshold
            {
                min_tree = tree_distance;
                sub.text_edit_distance = Some(text_distance);
                sub.tree_edit_distance = Some(tree_distance);
                closest = Some((candidate.text, false));
            }
        }

        if let Some((closest, case_only)) = closest {
            sub.semantics_message = format!("Semantics minor error. Maybe you meant '{closest}'?\n");
            sub.results = PropertyState::Correct;
            sub.semantics = if case_only {
                sub.add_feedback(format!(
                    " SEMANTICS MINOR ERROR: To make the query have correct semantics, it was changed to, '{closest}'. "
                ));
                PropertyState::Correct
            } else if session.semantics_level.has_minor() {
                PropertyState::MinorIncorrect
            } else {
                sub.semantics_message.clear();
                PropertyState::Incorrect
            };
            return;
        }

        let comparison = self.best_clause_comparison(&tree, &correct_peers);
        sub.semantics_message = if comparison.message.is_empty() {
            "2️⃣3️⃣\nNo detailed feedback.\n".to_string()
        } else {
            comparison.message.clone()
        };
        sub.add_feedback(" SEMANTICS: The query does not have correct semantics. ");

        sub.semantics = if session.semantics_level == PropertyLevel::SixLevels {
            let correct = comparison.correct_parts.len();
            let total = correct + comparison.incorrect_parts.len();
            if total == 0 {
                PropertyState::Incorrect
            } else if correct == total {
                if session.results_level != PropertyLevel::Absent {
                    sub.results = PropertyState::Correct;
                }
                PropertyState::Correct
            } else {
                partial_credit(correct as f64 / total as f64)
            }
        } else {
            PropertyState::Incorrect
        };
    }

    /// Clause comparison against same-kind references, then same-kind
    /// correct peers; all of them when none share the kind. The result with
    /// the most correct parts wins, then the one with the most incorrect
    /// parts.
    fn best_clause_comparison(
        &self,
        tree: &Arc<ParseNode>,
        correct_peers: &[&PeerView],
    ) -> ComparisonResult {
        let kind = tree.statement_type();
        let mut best = ComparisonResult::new();
        let mut consider = |reference: &Arc<ParseNode>| {
            let comparison = compare_queries(reference, tree);
            let (c, i) = (comparison.correct_parts.len(), comparison.incorrect_parts.len());
            let (bc, bi) = (best.correct_parts.len(), best.incorrect_parts.len());
            if c > bc || (c == bc && i > bi) {
                best = comparison;
            }
        };

        let same_models: Vec<&Arc<ParseNode>> = self
            .models
            .iter()
            .map(|m| &m.tree)
            .filter(|t| t.statement_type() == kind)
            .collect();
        if same_models.is_empty() {
            self.models.iter().for_each(|m| consider(&m.tree));
        } else {
            same_models.into_iter().for_each(&mut consider);
        }

        let peer_trees: Vec<&Arc<ParseNode>> = correct_peers
            .iter()
            .filter_map(|p| p.tree.as_ref())
            .collect();
        let same_peers: Vec<&Arc<ParseNode>> = peer_trees
            .iter()
            .copied()
            .filter(|t| t.statement_type() == kind)
            .collect();
        if same_peers.is_empty() {
            peer_trees.into_iter().for_each(&mut consider);
        } else {
            same_peers.into_iter().for_each(&mut consider);
        }
        best
    }

    /// Computes the correctness level, grade and message.
    pub fn finalize(&self, sub: &mut Submission) {
        if self.session.results_level == PropertyLevel::Absent {
            sub.results = PropertyState::Invalid;
        }
        let observed = Properties::new(sub.syntax, sub.semantics, sub.results);
        let (level, normalized) = match self.matrix.calculate_correctness_level(observed) {
            Ok(found) => found,
            Err(e) => {
                error!(id = %sub.id, "{e}");
                sub.add_feedback(format!(" Grading consistency error: {e}. "));
                (1, self.matrix.normalized_value(1))
            }
        };
        sub.correctness_level = level;
        sub.normalized_value = normalized;
        sub.grade = normalized;
        sub.message = sub.construct_message();
    }
}

/// Maps a correct-part ratio onto the partial-credit bands.
fn partial_credit(ratio: f64) -> PropertyState {
    match (ratio * 5.0).round() as i64 {
        i64::MIN..=0 => PropertyState::Incorrect,
        1 => PropertyState::Sm1,
        2 => PropertyState::Sm2,
        3 => PropertyState::Sm3,
        4 => PropertyState::Sm4,
        _ => PropertyState::Sm5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_credit_rounds_to_nearest_band() {
        assert_eq!(partial_credit(0.05), PropertyState::Incorrect);
        assert_eq!(partial_credit(0.5), PropertyState::Sm3);
        assert_eq!(partial_credit(0.75), PropertyState::Sm4);
        assert_eq!(partial_credit(0.95), PropertyState::Sm5);
    }
}
