//! Prompt templates for implementation and review agents

use super::instruction::Instruction;

/// Templates for rendering an [`Instruction`] into agent prompt text
pub struct PromptTemplate;

impl PromptTemplate {
    /// Prompt for the implementing agent
    pub fn implementation(instruction: &Instruction) -> String {
        format!(
            r#"You are an expert developer working inside an isolated sandbox checkout.
Make the changes directly in the working directory. Do not run destructive commands.

{}"#,
            Self::render(instruction)
        )
    }

    /// Prompt for a reviewing agent
    pub fn review(instruction: &Instruction) -> String {
        format!(
            r#"You are a strict code reviewer. Inspect the changes in the working directory
against the instruction below. Do not modify any files.

{}

Respond with a JSON object:
{{"status": "approved" | "rejected" | "needs_work",
  "issues": [{{"level": "error" | "warning" | "suggestion", "description": "...",
              "file_paths": ["..."], "line_number": 1, "suggested_fix": "..."}}]}}"#,
            Self::render(instruction)
        )
    }

    fn render(instruction: &Instruction) -> String {
        let mut text = format!("## Objective\n{}\n", instruction.objective);
        if !instruction.tasks.is_empty() {
            text.push_str("\n## Tasks\n");
            for (i, task) in instruction.tasks.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", i + 1, task));
            }
        }
        text
    }
}
