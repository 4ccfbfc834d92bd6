//! Agent runner port
//!
//! Defines how the application layer drives coding agents inside a sandbox.

use async_trait::async_trait;
use kanon_domain::{Instruction, ReviewFeedback};
use std::path::Path;
use thiserror::Error;

/// Errors raised while running an agent
#[derive(Error, Debug)]
pub enum AgentRunnerError {
    #[error("Agent {agent} ({skill}) exited with code {exit_code:?}: {stderr}")]
    ProcessFailed {
        agent: String,
        skill: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to spawn agent {agent}: {message}")]
    Spawn { agent: String, message: String },

    #[error("No tool configured for agent {0}")]
    UnknownTool(String),
}

/// Port for running implementation and review agents
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Ask `agent_id` to implement `instruction` inside `sandbox_path`.
    async fn run_implementation(
        &self,
        agent_id: &str,
        sandbox_path: &Path,
        instruction: &Instruction,
    ) -> Result<(), AgentRunnerError>;

    /// Ask `agent_id` to review the work in `sandbox_path`.
    ///
    /// The returned feedback carries `agent_id` as its reviewer.
    async fn run_review(
        &self,
        agent_id: &str,
        sandbox_path: &Path,
        instruction: &Instruction,
    ) -> Result<ReviewFeedback, AgentRunnerError>;
}
