#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::{
    analysis::{Analyzer, PeerView, Stage},
    session::SessionConfig,
    submission::{Assignment, OutputRecord, Submission, SubmissionInput},
};
use crate::backend::{ExecutionBackend, ParseError, SqlParser};

/// Failures that abort a whole grading run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A reference statement does not parse.
    #[error("model query {index} is not parseable: {error}")]
    ModelNotParseable {
        /// Position of the reference statement, starting at 0.
        index: usize,
        /// Parser message.
        error: String,
    },
    /// No reference statements were given.
    #[error("at least one model query is required")]
    NoModels,
    /// A collaborator needed by every submission is unavailable.
    #[error("backend unavailable: {0:#}")]
    Backend(anyhow::Error),
}

/// Staged fork-join grading over a batch of submissions.
///
/// Every stage runs one task per submission on at most `workers` tasks at a
/// time and finishes completely before the next stage starts.
pub struct Pipeline<P, B> {
    /// Shared analysis state.
    analyzer: Arc<Analyzer<P, B>>,
    /// Concurrent task bound per stage.
    workers:  usize,
}

impl<P: SqlParser, B: ExecutionBackend> Pipeline<P, B> {
    /// Parses and executes the reference statements and prepares the run.
    pub async fn new(
        session: SessionConfig,
        parser: P,
        backend: B,
        models: &[String],
        workers: usize,
    ) -> Result<Self> {
        if models.is_empty() {
            return Err(PipelineError::NoModels.into());
        }
        let mut analyzer = Analyzer::new(session, parser, backend)?;

        let mut loaded = Vec::with_capacity(models.len());
        for (index, text) in models.iter().enumerate() {
            let model = analyzer.load_model(text).await.map_err(|e| match e {
                ParseError::Syntax(error) => PipelineError::ModelNotParseable { index, error },
                ParseError::Helper(e) => PipelineError::Backend(e),
            })?;
            loaded.push(model);
        }
        analyzer.set_models(loaded);
        info!("loaded {} model queries", models.len());

        Ok(Self {
            analyzer: Arc::new(analyzer),
            workers:  workers.max(1),
        })
    }

    /// Grading policy of this run.
    pub fn session(&self) -> &SessionConfig {
        self.analyzer.session()
    }

    /// Grades every submission, returning them in input order.
    pub async fn run(&self, inputs: Vec<SubmissionInput>) -> Vec<Submission> {
        let run_id = Uuid::new_v4();
        let span = info_span!("grading", %run_id, submissions = inputs.len());
        async move {
            let mut submissions: Vec<Submission> = inputs.into_iter().map(Submission::new).collect();
            submissions = self.run_stage(Stage::Preprocess, submissions).await;
            for stage in Stage::ANALYSES {
                submissions = self.run_stage(stage, submissions).await;
            }
            submissions
        }
        .instrument(span)
        .await
    }

    /// Runs `stage` on every submission and waits for all of them.
    ///
    /// Peers are read from a snapshot taken before the stage starts. A task
    /// that fails or panics leaves its submission as it was, with the failure
    /// appended to its feedback.
    async fn run_stage(&self, stage: Stage, submissions: Vec<Submission>) -> Vec<Submission> {
        info!("{stage} analysis started...");
        let peers: Arc<[PeerView]> = submissions.iter().map(PeerView::from).collect();
        let permits = Arc::new(Semaphore::new(self.workers));

        let handles = submissions
            .iter()
            .cloned()
            .map(|mut sub| {
                let analyzer = Arc::clone(&self.analyzer);
                let peers = Arc::clone(&peers);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .context("worker pool closed")?;
                    debug!(id = %sub.id, "{stage} analysis");
                    analyzer.run(stage, &mut sub, &peers).await?;
                    Ok::<Submission, anyhow::Error>(sub)
                })
            })
            .collect::<Vec<_>>();

        let finished = join_all(handles).await;
        let submissions = submissions
            .into_iter()
            .zip(finished)
            .map(|(mut previous, finished)| match finished {
                Ok(Ok(sub)) => sub,
                Ok(Err(e)) => {
                    warn!(id = %previous.id, "{stage} analysis failed: {e:#}");
                    previous.add_feedback(format!(" {stage} analysis failed: {e:#}. "));
                    previous
                }
                Err(e) => {
                    warn!(id = %previous.id, "{stage} analysis panicked: {e}");
                    previous.add_feedback(format!(" {stage} analysis crashed: {e}. "));
                    previous
                }
            })
            .collect();
        info!("{stage} analysis finished.");
        submissions
    }
}

/// Grades an assignment bundle end to end and returns the output records.
pub async fn grade_assignment<P: SqlParser, B: ExecutionBackend>(
    assignment: Assignment,
    parser: P,
    backend: B,
    workers: usize,
) -> Result<Vec<OutputRecord>> {
    let order = assignment.session.order;
    let pipeline = Pipeline::new(
        assignment.session,
        parser,
        backend,
        &assignment.models,
        workers,
    )
    .await?;
    let graded = pipeline.run(assignment.submissions).await;
    Ok(graded.iter().map(|sub| sub.output_record(order)).collect())
}
