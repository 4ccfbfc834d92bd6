//! Agent process records.

use super::output::OutputBuffer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle status of a spawned process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Completed,
    Failed,
    Timeout,
    Killed,
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Completed => "completed",
            ProcessStatus::Failed => "failed",
            ProcessStatus::Timeout => "timeout",
            ProcessStatus::Killed => "killed",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One execution of an external command, owned by the process registry.
#[derive(Debug, Clone)]
pub struct AgentProcess {
    /// Logical skill name (e.g. "developer", "reviewer-1")
    pub skill: String,
    /// Session the process belongs to
    pub session: String,
    /// CLI tool name, recorded for display
    pub tool: String,
    /// OS process id (None if the process never started)
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Literal command line
    pub command: String,
    pub status: ProcessStatus,
    /// Exit code (None while running, when killed by a signal, or on spawn failure)
    pub exit_code: Option<i32>,
    pub retry_count: u32,
    pub stdout: OutputBuffer,
    pub stderr: OutputBuffer,
}

impl AgentProcess {
    pub fn new(
        skill: impl Into<String>,
        session: impl Into<String>,
        tool: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            skill: skill.into(),
            session: session.into(),
            tool: tool.into(),
            pid: None,
            started_at: Utc::now(),
            finished_at: None,
            command: command.into(),
            status: ProcessStatus::Running,
            exit_code: None,
            retry_count: 0,
            stdout: OutputBuffer::new(),
            stderr: OutputBuffer::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Record a natural exit.
    ///
    /// The exit code is always kept, but a status already set by
    /// `kill`/timeout is preserved so the cause stays visible.
    pub fn record_exit(&mut self, exit_code: Option<i32>) {
        self.exit_code = exit_code;
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
        if self.status.is_running() {
            self.status = if exit_code == Some(0) {
                ProcessStatus::Completed
            } else {
                ProcessStatus::Failed
            };
        }
    }

    /// Record that the OS could not start the process.
    pub fn record_spawn_failure(&mut self, message: &str) {
        self.status = ProcessStatus::Failed;
        self.exit_code = None;
        self.finished_at = Some(Utc::now());
        self.stderr.push(&format!("\nspawn error: {}", message));
    }

    /// Elapsed wall-clock time, up to now for a running process.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Utc::now())
    }

    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        let end = self.finished_at.unwrap_or(now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    /// Whether this process has exceeded `timeout` as of `now`.
    pub fn is_timed_out_at(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        if !self.is_running() || timeout.is_zero() {
            return false;
        }
        (now - self.started_at).to_std().unwrap_or_default() > timeout
    }
}

/// True only if `process` is still running and has run longer than `timeout`.
///
/// A zero timeout never expires.
pub fn check_timeout(process: &AgentProcess, timeout: Duration) -> bool {
    process.is_timed_out_at(timeout, Utc::now())
}
