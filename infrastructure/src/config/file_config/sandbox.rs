//! Sandbox and gatekeeper configuration from TOML

use kanon_domain::CommandSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw sandbox configuration (`[sandbox]` section)
///
/// ```toml
/// [sandbox]
/// base_branch = "main"
/// worktree_dir = "/tmp/kanon-worktrees"   # default: next to the repository
/// name_prefix = "kanon-task-"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSandboxConfig {
    pub base_branch: String,
    pub worktree_dir: Option<PathBuf>,
    pub name_prefix: String,
}

impl Default for FileSandboxConfig {
    fn default() -> Self {
        Self {
            base_branch: "main".to_string(),
            worktree_dir: None,
            name_prefix: "kanon-task-".to_string(),
        }
    }
}

/// Raw gatekeeper configuration (`[gatekeeper]` section)
///
/// Each command runs inside the sandbox after an implementation attempt.
/// A non-zero exit becomes a blocking issue for the next attempt.
///
/// ```toml
/// [gatekeeper]
/// commands = ["cargo test", { program = "cargo", args = ["clippy"] }]
/// timeout_ms = 300000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatekeeperConfig {
    pub commands: Vec<CommandSpec>,
    /// 0 = unbounded
    pub timeout_ms: u64,
}

impl Default for FileGatekeeperConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            timeout_ms: 300_000,
        }
    }
}

impl FileGatekeeperConfig {
    pub fn is_enabled(&self) -> bool {
        !self.commands.is_empty()
    }
}
