//! Review orchestrator use case
//!
//! Drives the correction loop: implement, review, aggregate, and fold
//! rejected issues into the next attempt until consensus is reached or the
//! retry budget is spent.
//!
//! ```text
//!  Instruction ──► run_implementation ──► run_review × N ──┐
//!       ▲                                     gatekeeper ──┤
//!       │                                                  ▼
//!  FeedbackInjector ◄──── rejected ◄──── MergeGateway::evaluate ──► approved
//! ```

use crate::ports::agent_runner::{AgentRunner, AgentRunnerError};
use crate::ports::gatekeeper::Gatekeeper;
use crate::ports::progress::{CorrectionProgressNotifier, CorrectionStatus, NoProgress};
use futures::future::try_join_all;
use kanon_domain::{
    AggregationResult, ConsensusCondition, CorrectionEvent, CorrectionPhase, CorrectionState,
    DomainError, FeedbackInjector, Instruction, MergeGateway, ReviewFeedback,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Attempts allowed when the caller does not say otherwise
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Errors that abort the correction loop
#[derive(Error, Debug)]
pub enum CorrectionLoopError {
    #[error("Agent runner failed: {0}")]
    Runner(#[from] AgentRunnerError),

    #[error("Correction loop state error: {0}")]
    State(#[from] DomainError),
}

/// Input for a correction loop run
#[derive(Clone)]
pub struct CorrectionLoopInput {
    /// Agent that implements each attempt
    pub developer_id: String,
    /// Sandbox the agents work in
    pub sandbox_path: PathBuf,
    pub instruction: Instruction,
    pub condition: ConsensusCondition,
    pub max_retries: usize,
    /// Optional mechanical validation run after the reviewers
    pub gatekeeper: Option<Arc<dyn Gatekeeper>>,
}

impl CorrectionLoopInput {
    pub fn new(
        developer_id: impl Into<String>,
        sandbox_path: impl Into<PathBuf>,
        instruction: Instruction,
        condition: ConsensusCondition,
    ) -> Self {
        Self {
            developer_id: developer_id.into(),
            sandbox_path: sandbox_path.into(),
            instruction,
            condition,
            max_retries: DEFAULT_MAX_RETRIES,
            gatekeeper: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_gatekeeper(mut self, gatekeeper: Arc<dyn Gatekeeper>) -> Self {
        self.gatekeeper = Some(gatekeeper);
        self
    }
}

impl std::fmt::Debug for CorrectionLoopInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionLoopInput")
            .field("developer_id", &self.developer_id)
            .field("sandbox_path", &self.sandbox_path)
            .field("instruction", &self.instruction)
            .field("condition", &self.condition)
            .field("max_retries", &self.max_retries)
            .field("gatekeeper", &self.gatekeeper.is_some())
            .finish()
    }
}

/// Use case coordinating implementation and review agents
pub struct ReviewOrchestrator<R: AgentRunner + 'static> {
    runner: Arc<R>,
    gateway: MergeGateway,
    injector: FeedbackInjector,
}

impl<R: AgentRunner + 'static> ReviewOrchestrator<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            gateway: MergeGateway::new(),
            injector: FeedbackInjector::new(),
        }
    }

    /// Run every distinct reviewer concurrently and collect one feedback each.
    ///
    /// The result is in `reviewers` order with repeats skipped. The first
    /// runner error wins.
    pub async fn start_reviews(
        &self,
        sandbox_path: &Path,
        instruction: &Instruction,
        reviewers: &[String],
    ) -> Result<Vec<ReviewFeedback>, AgentRunnerError> {
        let mut seen = HashSet::new();
        let reviews = reviewers
            .iter()
            .filter(|reviewer| seen.insert(reviewer.as_str()))
            .map(|reviewer| self.runner.run_review(reviewer, sandbox_path, instruction));
        try_join_all(reviews).await
    }

    pub fn evaluate_feedbacks(
        &self,
        feedbacks: &[ReviewFeedback],
        condition: &ConsensusCondition,
    ) -> AggregationResult {
        self.gateway.evaluate(condition, feedbacks)
    }

    /// Run the loop with default (no-op) progress
    pub async fn run_correction_loop(
        &self,
        input: CorrectionLoopInput,
    ) -> Result<bool, CorrectionLoopError> {
        self.run_correction_loop_with_progress(input, &NoProgress)
            .await
    }

    /// Run the loop, returning `true` on approval and `false` once the
    /// retry budget is spent.
    pub async fn run_correction_loop_with_progress(
        &self,
        input: CorrectionLoopInput,
        progress: &dyn CorrectionProgressNotifier,
    ) -> Result<bool, CorrectionLoopError> {
        let mut state = CorrectionState::new(input.max_retries);
        let mut instruction = input.instruction.clone();
        let mut last_result: Option<AggregationResult> = None;
        let mut feedbacks: Vec<ReviewFeedback> = Vec::new();

        info!(
            "Starting correction loop for {} (max {} attempts, {} reviewers)",
            input.developer_id,
            input.max_retries,
            input.condition.reviewers.len()
        );

        loop {
            let status = |phase: CorrectionPhase, message: String| {
                CorrectionStatus::new(state.attempt_number(), state.max_retries(), phase, message)
            };

            match state.phase() {
                CorrectionPhase::Implement => {
                    progress.on_status(&status(
                        CorrectionPhase::Implement,
                        format!(
                            "Starting implementation attempt {}/{}",
                            state.attempt_number(),
                            state.max_retries()
                        ),
                    ));
                    self.runner
                        .run_implementation(&input.developer_id, &input.sandbox_path, &instruction)
                        .await?;
                    state.advance(CorrectionEvent::Implemented)?;
                }
                CorrectionPhase::Review => {
                    progress.on_status(&status(
                        CorrectionPhase::Review,
                        "Implementation complete. Starting parallel reviews...".to_string(),
                    ));
                    feedbacks = self
                        .start_reviews(&input.sandbox_path, &instruction, &input.condition.reviewers)
                        .await?;

                    if let Some(gatekeeper) = &input.gatekeeper {
                        progress.on_status(&status(
                            CorrectionPhase::Review,
                            "Running gatekeeper validation...".to_string(),
                        ));
                        let issues = gatekeeper.check(&input.sandbox_path).await;
                        if issues.is_empty() {
                            progress.on_status(&status(
                                CorrectionPhase::Review,
                                "Gatekeeper passed.".to_string(),
                            ));
                        } else {
                            warn!("Gatekeeper found {} issues", issues.len());
                            progress.on_status(&status(
                                CorrectionPhase::Review,
                                format!("Gatekeeper found {} issues.", issues.len()),
                            ));
                            feedbacks.push(ReviewFeedback::from_gatekeeper(
                                input.developer_id.clone(),
                                issues,
                            ));
                        }
                    }
                    state.advance(CorrectionEvent::Reviewed)?;
                }
                CorrectionPhase::Aggregate => {
                    let result = self.evaluate_feedbacks(&feedbacks, &input.condition);
                    debug!(
                        "Aggregation: resolved={} approved={} pending={:?}",
                        result.is_resolved, result.is_approved, result.pending_agents
                    );
                    progress.on_status(
                        &status(
                            CorrectionPhase::Aggregate,
                            format!(
                                "Review aggregation complete. Status: {}",
                                if result.is_approved { "APPROVED" } else { "REJECTED" }
                            ),
                        )
                        .with_verdict(result.is_approved, result.issue_count()),
                    );
                    state.advance(CorrectionEvent::Aggregated {
                        approved: result.is_approved,
                    })?;
                    last_result = Some(result);
                }
                CorrectionPhase::Retry => {
                    let issues = last_result
                        .take()
                        .map(|result| result.merged_issues)
                        .unwrap_or_default();
                    info!(
                        "Attempt {} rejected with {} issues",
                        state.attempt_number(),
                        issues.len()
                    );
                    instruction = self
                        .injector
                        .inject_issues(std::mem::take(&mut instruction), &issues);
                    state.advance(CorrectionEvent::Retried)?;
                }
                CorrectionPhase::Done => {
                    info!("Correction loop approved on attempt {}", state.attempt_number());
                    return Ok(true);
                }
                CorrectionPhase::Failed => {
                    warn!("Correction loop exhausted {} attempts", state.max_retries());
                    progress.on_status(&status(
                        CorrectionPhase::Failed,
                        "Max retries reached without approval.".to_string(),
                    ));
                    return Ok(false);
                }
            }
        }
    }
}
