//! Batch tasks and their results.

use super::command::CommandSpec;
use super::entities::{AgentProcess, ProcessStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_tool() -> String {
    "shell".to_string()
}

/// A declarative unit of scheduled work. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTask {
    pub skill: String,
    pub command: CommandSpec,
    #[serde(default = "default_tool", alias = "cli")]
    pub tool: String,
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<String>,
}

impl BatchTask {
    pub fn new(skill: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            skill: skill.into(),
            command,
            tool: default_tool(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn depends_on<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(skills.into_iter().map(Into::into));
        self
    }
}

/// Why a batch task ended unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchFailure {
    /// Failed on every attempt the backoff schedule allowed
    RetryExhausted { status: ProcessStatus },
    /// Skipped because a prerequisite permanently failed
    DependencyFailed { dependencies: Vec<String> },
    /// Dependencies can never complete (unknown skill or cycle)
    UnsatisfiableDependencies { dependencies: Vec<String> },
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchFailure::RetryExhausted { status } => {
                write!(f, "retries exhausted (last status: {})", status)
            }
            BatchFailure::DependencyFailed { dependencies } => {
                write!(f, "dependency failed: {}", dependencies.join(", "))
            }
            BatchFailure::UnsatisfiableDependencies { dependencies } => {
                write!(f, "unsatisfiable dependencies: {}", dependencies.join(", "))
            }
        }
    }
}

/// Final outcome of one batch task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub skill: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub retry_count: u32,
    pub stdout: String,
    pub stderr: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<BatchFailure>,
}

impl BatchResult {
    /// Result for a task that ran (successfully or not) as `process`.
    pub fn from_process(process: &AgentProcess) -> Self {
        let success = process.status.is_success();
        Self {
            skill: process.skill.clone(),
            success,
            exit_code: process.exit_code,
            duration_ms: process.elapsed().as_millis() as u64,
            retry_count: process.retry_count,
            stdout: process.stdout.as_str().to_string(),
            stderr: process.stderr.as_str().to_string(),
            started_at: Some(process.started_at),
            finished_at: Some(process.finished_at.unwrap_or_else(Utc::now)),
            failure: (!success).then_some(BatchFailure::RetryExhausted {
                status: process.status,
            }),
        }
    }

    /// Synthetic result for a task that was never spawned.
    pub fn skipped(skill: impl Into<String>, failure: BatchFailure) -> Self {
        let stderr = match &failure {
            BatchFailure::DependencyFailed { dependencies } => format!(
                "Skipped because dependency failed: {}",
                dependencies.join(", ")
            ),
            other => format!("Skipped: {}", other),
        };
        Self {
            skill: skill.into(),
            success: false,
            exit_code: None,
            duration_ms: 0,
            retry_count: 0,
            stdout: String::new(),
            stderr,
            started_at: None,
            finished_at: None,
            failure: Some(failure),
        }
    }
}
