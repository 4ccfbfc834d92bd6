//! Sandbox environment value objects

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Request to create an isolated environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Branch the environment is created from and merged back into
    pub base_branch: String,
    /// Unique name, used for both the branch and the directory
    pub environment_name: String,
}

impl EnvironmentConfig {
    pub fn new(base_branch: impl Into<String>, environment_name: impl Into<String>) -> Self {
        Self {
            base_branch: base_branch.into(),
            environment_name: environment_name.into(),
        }
    }
}

/// A live sandbox: its absolute path and the branch it merges into.
///
/// The merge target is fixed at creation; there is deliberately no setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxEnvironment {
    path: PathBuf,
    name: String,
    base_branch: String,
}

impl SandboxEnvironment {
    pub fn new(path: PathBuf, name: impl Into<String>, base_branch: impl Into<String>) -> Self {
        Self {
            path,
            name: name.into(),
            base_branch: base_branch.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_branch(&self) -> &str {
        &self.base_branch
    }
}

/// Sanitize a task id into a branch- and directory-safe fragment.
///
/// ```
/// use kanon_domain::sandbox::sanitize_task_id;
///
/// assert_eq!(sanitize_task_id("Add login/logout!"), "add-login-logout");
/// assert_eq!(sanitize_task_id("???"), "task");
/// ```
pub fn sanitize_task_id(task_id: &str) -> String {
    let mut out = String::with_capacity(task_id.len());
    for c in task_id.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "task".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_separators() {
        assert_eq!(sanitize_task_id("feat: calc -- v2"), "feat-calc-v2");
        assert_eq!(sanitize_task_id("task_42"), "task_42");
    }

    #[test]
    fn test_environment_accessors() {
        let env = SandboxEnvironment::new(PathBuf::from("/tmp/kanon-task-1"), "kanon-task-1", "main");
        assert_eq!(env.path(), Path::new("/tmp/kanon-task-1"));
        assert_eq!(env.name(), "kanon-task-1");
        assert_eq!(env.base_branch(), "main");
    }
}
