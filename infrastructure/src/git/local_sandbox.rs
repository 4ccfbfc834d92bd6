//! Git worktree sandbox.
//!
//! Every environment is a `git worktree` on its own branch, created next to
//! the base repository (or under a configured directory):
//!
//! ```text
//!   parent/
//!   ├── repo/                 base repository (merge target)
//!   └── kanon-task-login/     worktree on branch kanon-task-login
//! ```
//!
//! Commit stages everything, commits on the environment branch, then checks
//! out the base branch in the base repository and merges. Discard removes the
//! worktree and deletes its branch.

use async_trait::async_trait;
use kanon_domain::{EnvironmentConfig, SandboxEnvironment, SandboxError, SandboxRepository};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// [`SandboxRepository`] backed by git worktrees of a local repository
pub struct LocalGitSandbox {
    repo_root: PathBuf,
    worktree_dir: Option<PathBuf>,
    environments: std::sync::Mutex<HashMap<PathBuf, SandboxEnvironment>>,
    /// Only one branch can be checked out in the base repository at a time.
    merge_lock: Mutex<()>,
}

impl LocalGitSandbox {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            worktree_dir: None,
            environments: std::sync::Mutex::new(HashMap::new()),
            merge_lock: Mutex::new(()),
        }
    }

    /// Place worktrees under `dir` (relative paths resolve against the
    /// repository root) instead of next to the repository.
    pub fn with_worktree_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.worktree_dir = Some(dir.into());
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Environments created by this instance and not yet discarded
    pub fn environments(&self) -> Vec<SandboxEnvironment> {
        self.lock_environments().values().cloned().collect()
    }

    fn lock_environments(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<PathBuf, SandboxEnvironment>> {
        self.environments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn environment(&self, path: &Path) -> Option<SandboxEnvironment> {
        self.lock_environments().get(path).cloned()
    }

    async fn resolved_root(&self) -> Result<PathBuf, SandboxError> {
        Ok(tokio::fs::canonicalize(&self.repo_root).await?)
    }

    fn worktree_parent(&self, root: &Path) -> PathBuf {
        match &self.worktree_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.parent().unwrap_or(root).to_path_buf(),
        }
    }

    async fn branch_exists(&self, root: &Path, branch: &str) -> bool {
        let reference = format!("refs/heads/{}", branch);
        git(root, ["show-ref", "--verify", "--quiet", reference.as_str()])
            .await
            .is_ok()
    }

    async fn merge_into_base(&self, env: &SandboxEnvironment) -> Result<(), SandboxError> {
        let root = self.resolved_root().await?;
        let _guard = self.merge_lock.lock().await;

        git(&root, ["checkout", env.base_branch()]).await?;
        if let Err(e) = git(&root, ["merge", "--no-edit", env.name()]).await {
            warn!(branch = env.name(), "Merge failed, aborting: {}", e);
            let _ = git(&root, ["merge", "--abort"]).await;
            return Err(e);
        }
        info!(
            branch = env.name(),
            base = env.base_branch(),
            "Merged sandbox branch"
        );
        Ok(())
    }
}

#[async_trait]
impl SandboxRepository for LocalGitSandbox {
    async fn create_environment(&self, config: &EnvironmentConfig) -> Result<PathBuf, SandboxError> {
        let root = self.resolved_root().await?;
        let parent = self.worktree_parent(&root);
        tokio::fs::create_dir_all(&parent).await?;
        let path = parent.join(&config.environment_name);
        let name = config.environment_name.as_str();

        if self.branch_exists(&root, name).await {
            debug!(branch = name, "Reusing existing branch");
            git(&root, [OsStr::new("worktree"), OsStr::new("add"), path.as_os_str(), OsStr::new(name)])
                .await?;
        } else {
            git(
                &root,
                [
                    OsStr::new("worktree"),
                    OsStr::new("add"),
                    OsStr::new("-b"),
                    OsStr::new(name),
                    path.as_os_str(),
                    OsStr::new(&config.base_branch),
                ],
            )
            .await?;
        }

        info!(path = %path.display(), base = %config.base_branch, "Created worktree");
        self.lock_environments().insert(
            path.clone(),
            SandboxEnvironment::new(path.clone(), name, &config.base_branch),
        );
        Ok(path)
    }

    async fn commit_changes(&self, path: &Path, message: &str) -> Result<bool, SandboxError> {
        let env = self
            .environment(path)
            .ok_or_else(|| SandboxError::UnknownEnvironment(path.to_path_buf()))?;

        git(path, ["add", "-A"]).await?;
        let status = git(path, ["status", "--porcelain"]).await?;
        if status.trim().is_empty() {
            debug!(path = %path.display(), "Nothing to commit");
            return Ok(false);
        }
        git(path, ["commit", "-q", "-m", message]).await?;

        self.merge_into_base(&env).await?;
        Ok(true)
    }

    async fn discard_environment(&self, path: &Path) -> Result<(), SandboxError> {
        let root = self.resolved_root().await?;
        let env = self.lock_environments().remove(path);

        if path.exists() {
            git(&root, [OsStr::new("worktree"), OsStr::new("remove"), OsStr::new("-f"), path.as_os_str()])
                .await?;
        }
        let _ = git(&root, ["worktree", "prune"]).await;

        if let Some(env) = env
            && self.branch_exists(&root, env.name()).await
        {
            git(&root, ["branch", "-D", env.name()]).await?;
        }

        info!(path = %path.display(), "Discarded worktree");
        Ok(())
    }

    async fn is_dirty(&self, path: &Path) -> Result<bool, SandboxError> {
        let status = git(path, ["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }
}

/// Run git in `cwd`, returning stdout or the failure's stderr.
async fn git<I, S>(cwd: &Path, args: I) -> Result<String, SandboxError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let command = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(cwd = %cwd.display(), "git {}", command);

    let output = Command::new("git")
        .args(&args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(SandboxError::Git {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
