//! Configuration validation issues.
//!
//! Validation never fails hard on its own; it reports issues with a
//! severity and lets the caller decide whether to continue.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// `max_parallel = 0`: no batch task could ever start.
    ZeroParallelism,
    /// `max_retries = 0`: the correction loop fails without trying.
    ZeroRetries,
    /// No reviewers: ALL approves vacuously, ANY can never approve.
    NoReviewers,
    /// A skill maps to a tool with no definition.
    UndefinedTool { skill: String, tool: String },
    /// The same reviewer listed twice.
    DuplicateReviewer(String),
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
