//! Gatekeeper that runs build/test commands inside the sandbox.

use crate::process::{ProcessScheduler, SpawnRequest};
use async_trait::async_trait;
use kanon_application::Gatekeeper;
use kanon_domain::{CommandSpec, Issue};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Output kept in an issue's suggested fix
const OUTPUT_TAIL_BYTES: usize = 2000;

/// Runs each configured command in order; every failure becomes one
/// `error` issue.
pub struct CommandGatekeeper {
    scheduler: ProcessScheduler,
    commands: Vec<CommandSpec>,
    session: String,
    timeout: Duration,
}

impl CommandGatekeeper {
    pub fn new(scheduler: ProcessScheduler, commands: Vec<CommandSpec>) -> Self {
        Self {
            scheduler,
            commands,
            session: format!("gatekeeper-{}", Uuid::new_v4()),
            timeout: Duration::ZERO,
        }
    }

    /// Per-command time budget; zero means unbounded
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    async fn run_one(&self, index: usize, command: &CommandSpec, sandbox_path: &Path) -> Option<Issue> {
        let skill = format!("check-{}", index + 1);
        let request = SpawnRequest::new(&skill, &self.session, command.clone())
            .with_tool("gatekeeper")
            .with_working_dir(sandbox_path);

        let mut handle = match self.scheduler.spawn(request) {
            Ok(handle) => handle,
            Err(e) => {
                return Some(failure_issue(command, &e.to_string()));
            }
        };

        let finished = if self.timeout.is_zero() {
            handle.wait().await
        } else {
            match tokio::time::timeout(self.timeout, handle.wait()).await {
                Ok(done) => done,
                Err(_) => {
                    self.scheduler.kill_timed_out(&self.session, &skill);
                    handle.wait().await
                }
            }
        };
        // Checks are independent runs; keep the registry from growing.
        let _ = self.scheduler.deregister(&self.session, &skill);

        let Some(process) = finished else {
            return Some(failure_issue(command, "process record disappeared"));
        };
        if process.status.is_success() {
            info!(command = %command, "Gatekeeper check passed");
            return None;
        }

        warn!(command = %command, status = %process.status, exit_code = ?process.exit_code, "Gatekeeper check failed");
        let mut output = process.stdout.as_str().to_string();
        if !process.stderr.is_empty() {
            if !output.is_empty() {
                output.push_str("\n--- stderr ---\n");
            }
            output.push_str(process.stderr.as_str());
        }
        let summary = format!(
            "status {}, exit code {}\n{}",
            process.status,
            process
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".to_string()),
            tail(&output, OUTPUT_TAIL_BYTES)
        );
        Some(failure_issue(command, &summary))
    }
}

fn failure_issue(command: &CommandSpec, details: &str) -> Issue {
    Issue::error(format!(
        "Gatekeeper validation failed: `{}`. Fix the code so the check passes.",
        command
    ))
    .with_suggested_fix(details.trim_end())
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[async_trait]
impl Gatekeeper for CommandGatekeeper {
    async fn check(&self, sandbox_path: &Path) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (index, command) in self.commands.iter().enumerate() {
            if let Some(issue) = self.run_one(index, command, sandbox_path).await {
                issues.push(issue);
            }
        }
        issues
    }
}
