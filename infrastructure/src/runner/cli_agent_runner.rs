//! [`AgentRunner`] that drives agent CLIs through the process scheduler.

use super::tool::AgentCatalog;
use crate::process::{OutputLine, ProcessScheduler, SpawnRequest};
use async_trait::async_trait;
use kanon_application::{AgentRunner, AgentRunnerError};
use kanon_domain::{
    AgentProcess, Instruction, ProcessStatus, PromptTemplate, ReviewFeedback, parse_review_output,
};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Buffered output lines per run before lines are dropped
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

const IMPLEMENT_ROLE: &str = "developer";
const REVIEW_ROLE: &str = "reviewer";

pub struct CliAgentRunner {
    scheduler: ProcessScheduler,
    catalog: AgentCatalog,
    session: String,
    developer_id: String,
    timeout: Duration,
}

impl CliAgentRunner {
    pub fn new(scheduler: ProcessScheduler, catalog: AgentCatalog) -> Self {
        Self {
            scheduler,
            catalog,
            session: format!("agents-{}", Uuid::new_v4()),
            developer_id: IMPLEMENT_ROLE.to_string(),
            timeout: Duration::ZERO,
        }
    }

    /// Session id the runner's processes are registered under
    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }

    /// Agent that reviews are attributed to as their target
    pub fn with_developer(mut self, developer_id: impl Into<String>) -> Self {
        self.developer_id = developer_id.into();
        self
    }

    /// Per-run time budget; zero means unbounded
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `agent_id` with `prompt` in `sandbox_path`, returning its stdout.
    async fn execute(
        &self,
        agent_id: &str,
        role: &str,
        prompt: &str,
        sandbox_path: &Path,
    ) -> Result<String, AgentRunnerError> {
        let (tool_name, tool) = self.catalog.resolve(agent_id)?;
        let command = tool.build_command(prompt, self.catalog.model(agent_id));

        let (tx, mut rx) = mpsc::channel::<OutputLine>(OUTPUT_CHANNEL_CAPACITY);
        let request = SpawnRequest::new(agent_id, &self.session, command)
            .with_tool(tool_name)
            .with_working_dir(sandbox_path)
            .with_output(tx);

        let mut handle = self
            .scheduler
            .spawn(request)
            .map_err(|e| AgentRunnerError::Spawn {
                agent: agent_id.to_string(),
                message: e.to_string(),
            })?;
        info!(agent = agent_id, tool = tool_name, pid = ?handle.pid(), "Agent started");

        let log_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if !line.line.trim().is_empty() {
                    debug!(skill = %line.skill, stderr = line.is_stderr, "{}", line.line);
                }
            }
        });

        let finished = if self.timeout.is_zero() {
            handle.wait().await
        } else {
            match tokio::time::timeout(self.timeout, handle.wait()).await {
                Ok(done) => done,
                Err(_) => {
                    warn!(agent = agent_id, "Agent exceeded {:?}", self.timeout);
                    self.scheduler.kill_timed_out(&self.session, agent_id);
                    handle.wait().await
                }
            }
        };
        let _ = log_task.await;

        let process = finished.ok_or_else(|| AgentRunnerError::Spawn {
            agent: agent_id.to_string(),
            message: "process record disappeared".to_string(),
        })?;
        check_success(agent_id, role, &process)?;
        Ok(process.stdout.as_str().to_string())
    }
}

fn check_success(agent_id: &str, role: &str, process: &AgentProcess) -> Result<(), AgentRunnerError> {
    if process.status.is_success() {
        return Ok(());
    }
    if process.status == ProcessStatus::Failed && process.pid.is_none() {
        return Err(AgentRunnerError::Spawn {
            agent: agent_id.to_string(),
            message: process.stderr.as_str().trim().to_string(),
        });
    }
    Err(AgentRunnerError::ProcessFailed {
        agent: agent_id.to_string(),
        skill: role.to_string(),
        exit_code: process.exit_code,
        stderr: process.stderr.as_str().to_string(),
    })
}

#[async_trait]
impl AgentRunner for CliAgentRunner {
    async fn run_implementation(
        &self,
        agent_id: &str,
        sandbox_path: &Path,
        instruction: &Instruction,
    ) -> Result<(), AgentRunnerError> {
        let prompt = PromptTemplate::implementation(instruction);
        self.execute(agent_id, IMPLEMENT_ROLE, &prompt, sandbox_path)
            .await?;
        Ok(())
    }

    async fn run_review(
        &self,
        agent_id: &str,
        sandbox_path: &Path,
        instruction: &Instruction,
    ) -> Result<ReviewFeedback, AgentRunnerError> {
        let prompt = PromptTemplate::review(instruction);
        let stdout = self
            .execute(agent_id, REVIEW_ROLE, &prompt, sandbox_path)
            .await?;
        let feedback = parse_review_output(agent_id, &self.developer_id, &stdout);
        info!(agent = agent_id, status = %feedback.status, issues = feedback.issues.len(), "Review finished");
        Ok(feedback)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::tool::ToolDefinition;
    use kanon_domain::ReviewStatus;
    use std::collections::HashMap;

    /// A "tool" that ignores its prompt and runs a shell snippet.
    fn shell_tool(script: &str) -> ToolDefinition {
        ToolDefinition::new("sh").with_args(["-c", script, "agent"])
    }

    fn runner(tools: Vec<(&str, ToolDefinition)>) -> CliAgentRunner {
        let tools: HashMap<String, ToolDefinition> = tools
            .into_iter()
            .map(|(name, tool)| (name.to_string(), tool))
            .collect();
        let catalog = AgentCatalog::new("default", tools)
            .with_skill("reviewer-1", "approve")
            .with_skill("reviewer-2", "reject")
            .with_skill("reviewer-3", "json");
        CliAgentRunner::new(ProcessScheduler::default(), catalog)
    }

    fn instruction() -> Instruction {
        Instruction::new("Add a feature")
    }

    #[tokio::test]
    async fn test_implementation_runs_in_sandbox_and_receives_prompt() {
        let dir = tempfile::tempdir().unwrap();
        // $1 is the prompt (the trailing positional argument)
        let runner = runner(vec![("default", shell_tool("printf '%s' \"$1\" > prompt.txt"))]);

        runner
            .run_implementation("developer", dir.path(), &instruction())
            .await
            .unwrap();

        let prompt = std::fs::read_to_string(dir.path().join("prompt.txt")).unwrap();
        assert!(prompt.contains("## Objective\nAdd a feature"));
    }

    #[tokio::test]
    async fn test_failed_implementation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(vec![("default", shell_tool("echo broken >&2; exit 4"))]);

        let err = runner
            .run_implementation("developer", dir.path(), &instruction())
            .await
            .unwrap_err();

        match err {
            AgentRunnerError::ProcessFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(4));
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(vec![("default", ToolDefinition::new("/no/such/agent-cli"))]);

        let err = runner
            .run_implementation("developer", dir.path(), &instruction())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentRunnerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_review_verdicts() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(vec![
            ("approve", shell_tool("echo 'Looks good to me.'")),
            ("reject", shell_tool("echo '[REJECT] missing tests'")),
            (
                "json",
                shell_tool(
                    r#"echo '{"status":"needs_work","issues":[{"level":"warning","description":"rename x"}]}'"#,
                ),
            ),
        ]);

        let approved = runner
            .run_review("reviewer-1", dir.path(), &instruction())
            .await
            .unwrap();
        assert_eq!(approved.status, ReviewStatus::Approved);
        assert_eq!(approved.reviewer_id, "reviewer-1");
        assert_eq!(approved.target_agent_id, "developer");

        let rejected = runner
            .run_review("reviewer-2", dir.path(), &instruction())
            .await
            .unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);
        assert_eq!(rejected.issues.len(), 1);

        let structured = runner
            .run_review("reviewer-3", dir.path(), &instruction())
            .await
            .unwrap();
        assert_eq!(structured.status, ReviewStatus::NeedsWork);
        assert_eq!(structured.issues[0].description, "rename x");
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(vec![("default", shell_tool("sleep 30"))])
            .with_timeout(Duration::from_millis(100));

        let err = runner
            .run_implementation("developer", dir.path(), &instruction())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentRunnerError::ProcessFailed { .. }));
        let process = runner.scheduler.get_status(runner.session(), "developer").unwrap();
        assert_eq!(process.status, ProcessStatus::Timeout);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(vec![]);

        let err = runner
            .run_implementation("developer", dir.path(), &instruction())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentRunnerError::UnknownTool(_)));
    }
}
