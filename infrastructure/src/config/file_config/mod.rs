//! Raw TOML configuration data types
//!
//! These structs mirror the config file layout. They are deserialized
//! directly and converted into domain values at the edges.

mod agents;
mod review;
mod sandbox;
mod scheduler;

pub use agents::FileAgentsConfig;
pub use review::FileReviewConfig;
pub use sandbox::{FileGatekeeperConfig, FileSandboxConfig};
pub use scheduler::FileSchedulerConfig;

use crate::runner::{AgentCatalog, ToolDefinition, default_tools};
use kanon_domain::{ConfigIssue, ConfigIssueCode, ConsensusType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Batch scheduling
    pub scheduler: FileSchedulerConfig,
    /// Review participants and consensus rule
    pub review: FileReviewConfig,
    /// Task environments
    pub sandbox: FileSandboxConfig,
    /// Validation commands run after each attempt
    pub gatekeeper: FileGatekeeperConfig,
    /// Agent → tool mapping
    pub agents: FileAgentsConfig,
    /// Tool definitions by name; merged over the built-in set
    pub tools: HashMap<String, ToolDefinition>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            scheduler: FileSchedulerConfig::default(),
            review: FileReviewConfig::default(),
            sandbox: FileSandboxConfig::default(),
            gatekeeper: FileGatekeeperConfig::default(),
            agents: FileAgentsConfig::default(),
            tools: default_tools(),
        }
    }
}

impl FileConfig {
    pub fn agent_catalog(&self) -> AgentCatalog {
        self.agents.agent_catalog(&self.tools)
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks scheduler limits, the review roster against its consensus
    /// rule, and that every referenced tool has a definition.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.scheduler.max_parallel == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroParallelism,
                "scheduler.max_parallel = 0; batches will run one task at a time",
            ));
        }

        if self.review.max_retries == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroRetries,
                "review.max_retries = 0; every task fails without an attempt",
            ));
        }

        if self.review.reviewers.is_empty() {
            match self.review.consensus {
                ConsensusType::All => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::NoReviewers,
                    "review.reviewers is empty; ALL consensus approves every attempt",
                )),
                ConsensusType::Any => issues.push(ConfigIssue::error(
                    ConfigIssueCode::NoReviewers,
                    "review.reviewers is empty; ANY consensus can never approve",
                )),
            }
        }

        let mut seen = HashSet::new();
        for reviewer in &self.review.reviewers {
            if !seen.insert(reviewer.as_str()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateReviewer(reviewer.clone()),
                    format!("reviewer '{}' is listed more than once", reviewer),
                ));
            }
        }

        if !self.tools.contains_key(&self.agents.default_tool) {
            issues.push(undefined_tool("default_tool", &self.agents.default_tool));
        }
        let mut mapped: Vec<_> = self.agents.skills.iter().collect();
        mapped.sort();
        for (skill, tool) in mapped {
            if !self.tools.contains_key(tool) {
                issues.push(undefined_tool(skill, tool));
            }
        }

        issues
    }
}

fn undefined_tool(skill: &str, tool: &str) -> ConfigIssue {
    ConfigIssue::error(
        ConfigIssueCode::UndefinedTool {
            skill: skill.to_string(),
            tool: tool.to_string(),
        },
        format!("'{}' uses tool '{}', which has no [tools.{}] definition", skill, tool, tool),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_domain::{CommandSpec, Severity};
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.tools.contains_key("claude"));
        assert_eq!(config.review.condition().reviewers, vec!["reviewer-1"]);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[scheduler]
max_parallel = 5
poll_interval_ms = 100
retry_delays_ms = [10]
timeout_ms = 0

[review]
developer = "dev"
reviewers = ["r1", "r2"]
consensus = "ANY"
max_retries = 2

[sandbox]
base_branch = "develop"
worktree_dir = "/tmp/trees"

[gatekeeper]
commands = ["cargo test", { program = "cargo", args = ["fmt", "--check"] }]

[agents]
default_tool = "codex"

[agents.skills]
r2 = "gemini"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();

        let scheduler = config.scheduler.to_scheduler_config();
        assert_eq!(scheduler.max_parallel, 5);
        assert_eq!(scheduler.poll_interval, Duration::from_millis(100));
        assert_eq!(scheduler.max_retries(), 1);
        assert_eq!(scheduler.timeout, Duration::ZERO);

        assert_eq!(config.review.consensus, ConsensusType::Any);
        assert_eq!(config.review.condition().reviewers, vec!["r1", "r2"]);
        assert_eq!(config.sandbox.base_branch, "develop");
        assert_eq!(config.sandbox.name_prefix, "kanon-task-");
        assert_eq!(
            config.gatekeeper.commands,
            vec![
                CommandSpec::shell("cargo test"),
                CommandSpec::exec("cargo", ["fmt", "--check"]),
            ]
        );

        let catalog = config.agent_catalog();
        assert_eq!(catalog.tool_name("r2"), "gemini");
        assert_eq!(catalog.tool_name("dev"), "codex");
    }

    #[test]
    fn test_unknown_consensus_is_rejected() {
        let result: Result<FileConfig, _> = toml::from_str(
            r#"
[review]
consensus = "majority"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut config = FileConfig::default();
        config.scheduler.max_parallel = 0;
        config.review.max_retries = 0;
        config.review.reviewers = vec!["a".into(), "a".into()];
        config.agents.skills.insert("a".into(), "nope".into());

        let issues = config.validate();
        let codes: Vec<_> = issues.iter().map(|i| i.code.clone()).collect();
        assert!(codes.contains(&ConfigIssueCode::ZeroParallelism));
        assert!(codes.contains(&ConfigIssueCode::ZeroRetries));
        assert!(codes.contains(&ConfigIssueCode::DuplicateReviewer("a".into())));
        assert!(codes.contains(&ConfigIssueCode::UndefinedTool {
            skill: "a".into(),
            tool: "nope".into(),
        }));
        assert_eq!(issues.iter().filter(|i| i.is_error()).count(), 1);
    }

    #[test]
    fn test_empty_reviewers_severity_depends_on_rule() {
        let mut config = FileConfig::default();
        config.review.reviewers.clear();
        assert_eq!(config.validate()[0].severity, Severity::Warning);

        config.review.consensus = ConsensusType::Any;
        assert_eq!(config.validate()[0].severity, Severity::Error);
    }

    #[test]
    fn test_undefined_default_tool() {
        let mut config = FileConfig::default();
        config.agents.default_tool = "missing".into();
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }
}
