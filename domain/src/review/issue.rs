//! Issues reported by reviewers and the gatekeeper.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Severity of a reported issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Error,
    Warning,
    Suggestion,
}

impl IssueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueLevel::Error => "error",
            IssueLevel::Warning => "warning",
            IssueLevel::Suggestion => "suggestion",
        }
    }
}

impl std::fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IssueLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(IssueLevel::Error),
            "warning" | "warn" => Ok(IssueLevel::Warning),
            "suggestion" | "info" => Ok(IssueLevel::Suggestion),
            other => Err(DomainError::InvalidSeverity(other.to_string())),
        }
    }
}

/// A defect reported against an attempt.
///
/// # Example
///
/// ```
/// use kanon_domain::review::{Issue, IssueLevel};
///
/// let issue = Issue::error("Missing null check")
///     .with_files(["src/lib.rs"])
///     .with_line(42)
///     .with_suggested_fix("Return early when the input is empty");
/// assert_eq!(issue.level, IssueLevel::Error);
/// assert_eq!(issue.line_number, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub level: IssueLevel,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty", alias = "files")]
    pub file_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "line")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Issue {
    pub fn new(level: IssueLevel, description: impl Into<String>) -> Self {
        Self {
            level,
            description: description.into(),
            file_paths: Vec::new(),
            line_number: None,
            suggested_fix: None,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(IssueLevel::Error, description)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(IssueLevel::Warning, description)
    }

    pub fn suggestion(description: impl Into<String>) -> Self {
        Self::new(IssueLevel::Suggestion, description)
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_paths = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("ERROR".parse::<IssueLevel>().unwrap(), IssueLevel::Error);
        assert_eq!("warn".parse::<IssueLevel>().unwrap(), IssueLevel::Warning);
        assert_eq!(
            "suggestion".parse::<IssueLevel>().unwrap(),
            IssueLevel::Suggestion
        );
        assert!("fatal".parse::<IssueLevel>().is_err());
    }

    #[test]
    fn test_issue_deserialize_with_aliases() {
        let json = r#"{"level": "warning", "description": "unused import", "files": ["a.rs"], "line": 3}"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.level, IssueLevel::Warning);
        assert_eq!(issue.file_paths, vec!["a.rs".to_string()]);
        assert_eq!(issue.line_number, Some(3));
        assert!(issue.suggested_fix.is_none());
    }
}
