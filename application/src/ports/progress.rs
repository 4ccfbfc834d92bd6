//! Progress notification ports
//!
//! Presentation-layer adapters implement these to render the correction loop
//! and batch execution as they happen.

use kanon_domain::{AgentProcess, BatchResult, CorrectionPhase};

/// A status update emitted by the correction loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionStatus {
    /// 1-based attempt number
    pub attempt: usize,
    pub max_retries: usize,
    pub phase: CorrectionPhase,
    pub message: String,
    /// Set once aggregation has produced a verdict
    pub approved: Option<bool>,
    pub issue_count: Option<usize>,
}

impl CorrectionStatus {
    pub fn new(
        attempt: usize,
        max_retries: usize,
        phase: CorrectionPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_retries,
            phase,
            message: message.into(),
            approved: None,
            issue_count: None,
        }
    }

    pub fn with_verdict(mut self, approved: bool, issue_count: usize) -> Self {
        self.approved = Some(approved);
        self.issue_count = Some(issue_count);
        self
    }
}

/// Callback for correction loop status updates
pub trait CorrectionProgressNotifier: Send + Sync {
    fn on_status(&self, status: &CorrectionStatus);
}

/// Callback for batch execution events
pub trait BatchProgressNotifier: Send + Sync {
    /// Called after a process has been spawned (including retries).
    fn on_spawn(&self, _process: &AgentProcess) {}

    /// Called when a task reaches its final result.
    fn on_result(&self, _result: &BatchResult) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl CorrectionProgressNotifier for NoProgress {
    fn on_status(&self, _status: &CorrectionStatus) {}
}

impl BatchProgressNotifier for NoProgress {}
