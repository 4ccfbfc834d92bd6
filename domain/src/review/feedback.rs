//! A single reviewer's verdict for one attempt.

use super::issue::Issue;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Reviewer identity used for feedback synthesized from mechanical validation.
pub const GATEKEEPER_ID: &str = "gatekeeper";

/// Task id recorded on feedback for the attempt under review.
pub const CURRENT_TASK_ID: &str = "current";

/// Verdict status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    Rejected,
    NeedsWork,
}

impl ReviewStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewStatus::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::NeedsWork => "needs_work",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "approved" | "approve" => Ok(ReviewStatus::Approved),
            "rejected" | "reject" => Ok(ReviewStatus::Rejected),
            "needs_work" => Ok(ReviewStatus::NeedsWork),
            other => Err(DomainError::InvalidReviewStatus(other.to_string())),
        }
    }
}

/// One reviewer's feedback for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFeedback {
    pub reviewer_id: String,
    pub target_agent_id: String,
    pub task_id: String,
    pub status: ReviewStatus,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl ReviewFeedback {
    pub fn new(
        reviewer_id: impl Into<String>,
        target_agent_id: impl Into<String>,
        status: ReviewStatus,
    ) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            target_agent_id: target_agent_id.into(),
            task_id: CURRENT_TASK_ID.to_string(),
            status,
            issues: Vec::new(),
        }
    }

    pub fn approved(reviewer_id: impl Into<String>, target_agent_id: impl Into<String>) -> Self {
        Self::new(reviewer_id, target_agent_id, ReviewStatus::Approved)
    }

    pub fn rejected(reviewer_id: impl Into<String>, target_agent_id: impl Into<String>) -> Self {
        Self::new(reviewer_id, target_agent_id, ReviewStatus::Rejected)
    }

    /// Rejection on behalf of the gatekeeper, carrying its findings.
    pub fn from_gatekeeper(target_agent_id: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self::rejected(GATEKEEPER_ID, target_agent_id).with_issues(issues)
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn is_approved(&self) -> bool {
        self.status.is_approved()
    }
}
