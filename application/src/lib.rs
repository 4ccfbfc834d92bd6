//! Application layer for kanon
//!
//! This crate contains use cases and port definitions.
//! It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    agent_runner::{AgentRunner, AgentRunnerError},
    gatekeeper::Gatekeeper,
    progress::{BatchProgressNotifier, CorrectionProgressNotifier, CorrectionStatus, NoProgress},
};
pub use use_cases::execute_task::{
    ExecuteTaskError, ExecuteTaskInput, ExecuteTaskOutput, ExecuteTaskUseCase,
};
pub use use_cases::review_orchestrator::{
    CorrectionLoopError, CorrectionLoopInput, DEFAULT_MAX_RETRIES, ReviewOrchestrator,
};
pub use use_cases::worktree_manager::{DEFAULT_NAME_PREFIX, WorktreeManager};
