//! Execute task use case
//!
//! Runs one task end to end: open a sandbox, drive the correction loop in
//! it, then merge the result on approval or throw the sandbox away.

use crate::ports::agent_runner::AgentRunner;
use crate::ports::gatekeeper::Gatekeeper;
use crate::ports::progress::{CorrectionProgressNotifier, NoProgress};
use crate::use_cases::review_orchestrator::{
    CorrectionLoopError, CorrectionLoopInput, DEFAULT_MAX_RETRIES, ReviewOrchestrator,
};
use crate::use_cases::worktree_manager::WorktreeManager;
use kanon_domain::{ConsensusCondition, Instruction, SandboxError, SandboxRepository};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while executing a task
#[derive(Error, Debug)]
pub enum ExecuteTaskError {
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Correction loop failed: {0}")]
    CorrectionLoop(#[from] CorrectionLoopError),

    #[error("Task was not approved after {attempts} attempts; changes discarded")]
    Exhausted { attempts: usize },
}

/// Input for the ExecuteTask use case
#[derive(Clone)]
pub struct ExecuteTaskInput {
    pub task_id: String,
    pub base_branch: String,
    pub developer_id: String,
    pub instruction: Instruction,
    pub condition: ConsensusCondition,
    pub max_retries: usize,
    /// Defaults to `feat: Implement task <task_id>`
    pub commit_message: Option<String>,
    pub gatekeeper: Option<Arc<dyn Gatekeeper>>,
}

impl ExecuteTaskInput {
    pub fn new(
        task_id: impl Into<String>,
        instruction: Instruction,
        condition: ConsensusCondition,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            base_branch: "main".to_string(),
            developer_id: "developer".to_string(),
            instruction,
            condition,
            max_retries: DEFAULT_MAX_RETRIES,
            commit_message: None,
            gatekeeper: None,
        }
    }

    pub fn with_base_branch(mut self, base_branch: impl Into<String>) -> Self {
        self.base_branch = base_branch.into();
        self
    }

    pub fn with_developer(mut self, developer_id: impl Into<String>) -> Self {
        self.developer_id = developer_id.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    pub fn with_gatekeeper(mut self, gatekeeper: Arc<dyn Gatekeeper>) -> Self {
        self.gatekeeper = Some(gatekeeper);
        self
    }

    fn commit_message(&self) -> String {
        self.commit_message
            .clone()
            .unwrap_or_else(|| format!("feat: Implement task {}", self.task_id))
    }
}

/// Outcome of an approved task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteTaskOutput {
    pub task_id: String,
    /// Where the sandbox lived (it no longer exists)
    pub sandbox_path: PathBuf,
    /// Whether anything was committed and merged
    pub committed: bool,
}

/// Use case tying the environment manager to the correction loop
pub struct ExecuteTaskUseCase<R: AgentRunner + 'static, S: SandboxRepository + ?Sized> {
    orchestrator: ReviewOrchestrator<R>,
    worktrees: WorktreeManager<S>,
}

impl<R: AgentRunner + 'static, S: SandboxRepository + ?Sized> ExecuteTaskUseCase<R, S> {
    pub fn new(runner: Arc<R>, worktrees: WorktreeManager<S>) -> Self {
        Self {
            orchestrator: ReviewOrchestrator::new(runner),
            worktrees,
        }
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(
        &self,
        input: ExecuteTaskInput,
    ) -> Result<ExecuteTaskOutput, ExecuteTaskError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: ExecuteTaskInput,
        progress: &dyn CorrectionProgressNotifier,
    ) -> Result<ExecuteTaskOutput, ExecuteTaskError> {
        let sandbox_path = self
            .worktrees
            .setup_task_environment(&input.task_id, &input.base_branch)
            .await?;

        let mut loop_input = CorrectionLoopInput::new(
            input.developer_id.clone(),
            sandbox_path.clone(),
            input.instruction.clone(),
            input.condition.clone(),
        )
        .with_max_retries(input.max_retries);
        if let Some(gatekeeper) = &input.gatekeeper {
            loop_input = loop_input.with_gatekeeper(Arc::clone(gatekeeper));
        }

        let outcome = self
            .orchestrator
            .run_correction_loop_with_progress(loop_input, progress)
            .await;

        match outcome {
            Ok(true) => {
                info!("Task {} approved; merging changes", input.task_id);
                let committed = self
                    .worktrees
                    .save_and_cleanup(&sandbox_path, &input.commit_message())
                    .await?;
                Ok(ExecuteTaskOutput {
                    task_id: input.task_id,
                    sandbox_path,
                    committed,
                })
            }
            Ok(false) => {
                warn!("Task {} exhausted its retries; aborting", input.task_id);
                self.worktrees.abort_and_cleanup(&sandbox_path).await?;
                Err(ExecuteTaskError::Exhausted {
                    attempts: input.max_retries,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.worktrees.abort_and_cleanup(&sandbox_path).await {
                    warn!(
                        "Failed to discard sandbox {}: {}",
                        sandbox_path.display(),
                        cleanup
                    );
                }
                Err(e.into())
            }
        }
    }
}
