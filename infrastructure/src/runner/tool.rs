//! Agent CLI tool definitions and agent → tool resolution.
//!
//! ```toml
//! [agents]
//! default_tool = "claude"
//! [agents.skills]
//! reviewer-1 = "gemini"
//! [agents.models]
//! developer = "opus"
//!
//! [tools.gemini]
//! program = "gemini"
//! prompt_flag = "-p"
//! auto_approve = "--yolo"
//! model_flag = "--model"
//! ```

use kanon_application::AgentRunnerError;
use kanon_domain::CommandSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How to invoke one agent CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolDefinition {
    /// Executable name or path
    pub program: String,
    /// Arguments placed before everything else (e.g. a subcommand)
    pub args: Vec<String>,
    /// Flag preceding the prompt; `None` passes the prompt positionally
    pub prompt_flag: Option<String>,
    /// Flag that lets the agent act without confirmation
    pub auto_approve: Option<String>,
    /// Flag preceding the model name
    pub model_flag: Option<String>,
}

impl ToolDefinition {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_prompt_flag(mut self, flag: impl Into<String>) -> Self {
        self.prompt_flag = Some(flag.into());
        self
    }

    pub fn with_auto_approve(mut self, flag: impl Into<String>) -> Self {
        self.auto_approve = Some(flag.into());
        self
    }

    pub fn with_model_flag(mut self, flag: impl Into<String>) -> Self {
        self.model_flag = Some(flag.into());
        self
    }

    /// Build the argv for one run. The prompt always comes last.
    ///
    /// Returned as [`CommandSpec::Exec`] so the prompt is never shell-parsed.
    pub fn build_command(&self, prompt: &str, model: Option<&str>) -> CommandSpec {
        let mut args = self.args.clone();
        if let Some(flag) = non_empty(&self.auto_approve) {
            args.push(flag.to_string());
        }
        if let (Some(flag), Some(model)) = (non_empty(&self.model_flag), model) {
            args.push(flag.to_string());
            args.push(model.to_string());
        }
        if let Some(flag) = non_empty(&self.prompt_flag) {
            args.push(flag.to_string());
        }
        args.push(prompt.to_string());
        CommandSpec::exec(&self.program, args)
    }
}

fn non_empty(flag: &Option<String>) -> Option<&str> {
    flag.as_deref().filter(|f| !f.is_empty())
}

/// Built-in tool definitions, overridable from `[tools.<name>]`
pub fn default_tools() -> HashMap<String, ToolDefinition> {
    HashMap::from([
        (
            "claude".to_string(),
            ToolDefinition::new("claude")
                .with_prompt_flag("-p")
                .with_auto_approve("--dangerously-skip-permissions")
                .with_model_flag("--model"),
        ),
        (
            "gemini".to_string(),
            ToolDefinition::new("gemini")
                .with_prompt_flag("-p")
                .with_auto_approve("--yolo")
                .with_model_flag("--model"),
        ),
        (
            "codex".to_string(),
            ToolDefinition::new("codex")
                .with_args(["exec"])
                .with_auto_approve("--full-auto")
                .with_model_flag("--model"),
        ),
    ])
}

/// Which tool (and model) each agent id runs with
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    pub default_tool: String,
    pub skills: HashMap<String, String>,
    pub models: HashMap<String, String>,
    pub tools: HashMap<String, ToolDefinition>,
}

impl AgentCatalog {
    pub fn new(default_tool: impl Into<String>, tools: HashMap<String, ToolDefinition>) -> Self {
        Self {
            default_tool: default_tool.into(),
            skills: HashMap::new(),
            models: HashMap::new(),
            tools,
        }
    }

    pub fn with_skill(mut self, agent_id: impl Into<String>, tool: impl Into<String>) -> Self {
        self.skills.insert(agent_id.into(), tool.into());
        self
    }

    pub fn with_model(mut self, agent_id: impl Into<String>, model: impl Into<String>) -> Self {
        self.models.insert(agent_id.into(), model.into());
        self
    }

    /// Tool name for `agent_id`: its explicit mapping, else the default.
    pub fn tool_name(&self, agent_id: &str) -> &str {
        self.skills
            .get(agent_id)
            .map(String::as_str)
            .unwrap_or(&self.default_tool)
    }

    pub fn resolve(&self, agent_id: &str) -> Result<(&str, &ToolDefinition), AgentRunnerError> {
        let name = self.tool_name(agent_id);
        self.tools
            .get(name)
            .map(|definition| (name, definition))
            .ok_or_else(|| AgentRunnerError::UnknownTool(agent_id.to_string()))
    }

    pub fn model(&self, agent_id: &str) -> Option<&str> {
        self.models.get(agent_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_order() {
        let tool = ToolDefinition::new("claude")
            .with_prompt_flag("-p")
            .with_auto_approve("--yes")
            .with_model_flag("--model");

        let command = tool.build_command("fix it; rm -rf /", Some("opus"));

        assert_eq!(
            command,
            CommandSpec::exec("claude", ["--yes", "--model", "opus", "-p", "fix it; rm -rf /"])
        );
    }

    #[test]
    fn test_positional_prompt_and_empty_flags() {
        let tool = ToolDefinition {
            program: "opencode".to_string(),
            args: vec!["run".to_string()],
            prompt_flag: Some(String::new()),
            auto_approve: None,
            model_flag: Some("--model".to_string()),
        };

        assert_eq!(
            tool.build_command("hello", None),
            CommandSpec::exec("opencode", ["run", "hello"])
        );
    }

    #[test]
    fn test_resolve_prefers_skill_mapping() {
        let catalog = AgentCatalog::new("claude", default_tools())
            .with_skill("reviewer-1", "gemini")
            .with_model("developer", "opus");

        assert_eq!(catalog.resolve("reviewer-1").unwrap().0, "gemini");
        assert_eq!(catalog.resolve("developer").unwrap().0, "claude");
        assert_eq!(catalog.model("developer"), Some("opus"));
        assert_eq!(catalog.model("reviewer-1"), None);
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let catalog = AgentCatalog::new("claude", HashMap::new());
        assert!(matches!(
            catalog.resolve("developer"),
            Err(AgentRunnerError::UnknownTool(id)) if id == "developer"
        ));
    }
}
