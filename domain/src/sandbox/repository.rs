//! Sandbox repository trait

use super::entities::EnvironmentConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from sandbox operations
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown sandbox environment: {0}")]
    UnknownEnvironment(PathBuf),
}

/// Isolated, branch-backed copies of a source tree.
///
/// Each environment is transactional on its own: its changes are either
/// committed and merged into its base branch, or thrown away. Nothing is
/// coordinated across environments; callers that complete several
/// environments sharing one base repository at once must serialize those
/// completions themselves.
#[async_trait]
pub trait SandboxRepository: Send + Sync {
    /// Create an environment branched from `config.base_branch`; returns its absolute path.
    async fn create_environment(&self, config: &EnvironmentConfig) -> Result<PathBuf, SandboxError>;

    /// Commit all changes and merge them into the base branch.
    ///
    /// Returns `false` when there was nothing to commit.
    async fn commit_changes(&self, path: &Path, message: &str) -> Result<bool, SandboxError>;

    /// Remove the environment and any unmerged changes. Idempotent.
    async fn discard_environment(&self, path: &Path) -> Result<(), SandboxError>;

    /// Whether the environment has uncommitted changes.
    async fn is_dirty(&self, path: &Path) -> Result<bool, SandboxError>;
}
