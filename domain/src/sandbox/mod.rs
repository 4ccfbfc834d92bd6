//! Sandbox domain
//!
//! Disposable, version-control-backed workspaces with all-or-nothing
//! commit/discard semantics. The git worktree adapter lives in the
//! infrastructure layer.

pub mod entities;
pub mod repository;

pub use entities::{EnvironmentConfig, SandboxEnvironment, sanitize_task_id};
pub use repository::{SandboxError, SandboxRepository};
