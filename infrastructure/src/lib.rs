//! Infrastructure layer for kanon
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer:
//!
//! - [`ProcessScheduler`]: spawns and tracks agent processes, runs batches
//! - [`CliAgentRunner`]: drives agent CLIs through the scheduler
//! - [`CommandGatekeeper`]: runs validation commands inside a sandbox
//! - [`LocalGitSandbox`]: git worktrees as task environments
//!
//! plus configuration file loading.

pub mod config;
pub mod gatekeeper;
pub mod git;
pub mod process;
pub mod runner;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use gatekeeper::CommandGatekeeper;
pub use git::LocalGitSandbox;
pub use process::{
    OutputLine, ProcessHandle, ProcessKey, ProcessRegistry, ProcessScheduler, SchedulerError,
    SpawnRequest,
};
pub use runner::{AgentCatalog, CliAgentRunner, ToolDefinition, default_tools};
