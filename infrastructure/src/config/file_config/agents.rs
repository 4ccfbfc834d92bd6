//! Agent → tool mapping from TOML (`[agents]` section)

use crate::runner::{AgentCatalog, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw agent configuration from TOML
///
/// ```toml
/// [agents]
/// default_tool = "claude"
///
/// [agents.skills]
/// reviewer-1 = "gemini"
///
/// [agents.models]
/// developer = "opus"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentsConfig {
    /// Tool used by agents without an explicit mapping
    pub default_tool: String,
    /// Agent id → tool name
    pub skills: HashMap<String, String>,
    /// Agent id → model passed through the tool's model flag
    pub models: HashMap<String, String>,
    /// Per-agent timeout in milliseconds (0 = unbounded)
    pub timeout_ms: u64,
}

impl Default for FileAgentsConfig {
    fn default() -> Self {
        Self {
            default_tool: "claude".to_string(),
            skills: HashMap::new(),
            models: HashMap::new(),
            timeout_ms: 0,
        }
    }
}

impl FileAgentsConfig {
    pub fn agent_catalog(&self, tools: &HashMap<String, ToolDefinition>) -> AgentCatalog {
        let mut catalog = AgentCatalog::new(self.default_tool.clone(), tools.clone());
        catalog.skills = self.skills.clone();
        catalog.models = self.models.clone();
        catalog
    }
}
