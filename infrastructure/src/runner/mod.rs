//! CLI agent runner and tool definitions

pub mod cli_agent_runner;
pub mod tool;

pub use cli_agent_runner::CliAgentRunner;
pub use tool::{AgentCatalog, ToolDefinition, default_tools};
