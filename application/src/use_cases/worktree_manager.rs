//! Environment manager use case
//!
//! Task-scoped façade over a [`SandboxRepository`]: open one sandbox per
//! task, then either save it (commit, merge, discard) or abort it (discard).

use kanon_domain::sandbox::sanitize_task_id;
use kanon_domain::{EnvironmentConfig, SandboxError, SandboxRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of every environment name (branch and directory)
pub const DEFAULT_NAME_PREFIX: &str = "kanon-task-";

pub struct WorktreeManager<S: SandboxRepository + ?Sized> {
    repository: Arc<S>,
    name_prefix: String,
}

impl<S: SandboxRepository + ?Sized> WorktreeManager<S> {
    pub fn new(repository: Arc<S>) -> Self {
        Self {
            repository,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Name of the environment a task id maps to.
    pub fn environment_name(&self, task_id: &str) -> String {
        format!("{}{}", self.name_prefix, sanitize_task_id(task_id))
    }

    /// Create the task's sandbox branched from `base_branch`.
    pub async fn setup_task_environment(
        &self,
        task_id: &str,
        base_branch: &str,
    ) -> Result<PathBuf, SandboxError> {
        let config = EnvironmentConfig::new(base_branch, self.environment_name(task_id));
        let path = self.repository.create_environment(&config).await?;
        info!(
            "Created sandbox {} from {} at {}",
            config.environment_name,
            base_branch,
            path.display()
        );
        Ok(path)
    }

    /// Commit pending changes (if any), then discard the sandbox.
    ///
    /// The sandbox is discarded even when committing fails; the commit
    /// error is returned after cleanup.
    pub async fn save_and_cleanup(
        &self,
        sandbox_path: &Path,
        commit_message: &str,
    ) -> Result<bool, SandboxError> {
        let saved = self.commit_if_dirty(sandbox_path, commit_message).await;
        let discarded = self.repository.discard_environment(sandbox_path).await;

        if let Err(e) = &saved {
            warn!("Commit failed for {}: {}", sandbox_path.display(), e);
        }
        let saved = saved?;
        discarded?;

        info!(
            "Sandbox {} cleaned up (committed: {})",
            sandbox_path.display(),
            saved
        );
        Ok(saved)
    }

    /// Discard the sandbox without committing.
    pub async fn abort_and_cleanup(&self, sandbox_path: &Path) -> Result<(), SandboxError> {
        self.repository.discard_environment(sandbox_path).await?;
        info!("Sandbox {} discarded", sandbox_path.display());
        Ok(())
    }

    async fn commit_if_dirty(
        &self,
        sandbox_path: &Path,
        commit_message: &str,
    ) -> Result<bool, SandboxError> {
        if !self.repository.is_dirty(sandbox_path).await? {
            debug!("Sandbox {} has no changes", sandbox_path.display());
            return Ok(false);
        }
        self.repository
            .commit_changes(sandbox_path, commit_message)
            .await
    }
}
