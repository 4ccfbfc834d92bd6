//! Folds unresolved review issues into the next attempt's instruction.

use super::instruction::Instruction;
use crate::review::Issue;

/// Prefix marking an objective that must be revised.
pub const REVISION_MARKER: &str = "[REVISION REQUIRED]";

const FEEDBACK_HEADER: &str =
    "ADDRESS REVIEW FEEDBACK: You must fix the following issues identified during the review phase:";

/// Deterministic, purely additive instruction amendment.
///
/// Prior tasks are never removed or reordered, and repeated calls are not
/// deduplicated: after two rejected attempts the objective carries the
/// marker twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackInjector;

impl FeedbackInjector {
    pub fn new() -> Self {
        Self
    }

    /// Returns `instruction` untouched when there is nothing to fix.
    pub fn inject_issues(&self, instruction: Instruction, issues: &[Issue]) -> Instruction {
        if issues.is_empty() {
            return instruction;
        }

        let descriptions: Vec<String> = issues
            .iter()
            .enumerate()
            .map(|(index, issue)| describe(index + 1, issue))
            .collect();

        let mut tasks = instruction.tasks;
        tasks.push(format!("{}\n{}", FEEDBACK_HEADER, descriptions.join("\n")));

        Instruction {
            objective: format!("{} {}", REVISION_MARKER, instruction.objective),
            tasks,
        }
    }
}

fn describe(number: usize, issue: &Issue) -> String {
    let mut desc = format!(
        "Issue {} [{}]: {}",
        number,
        issue.level.as_str().to_uppercase(),
        issue.description
    );
    if !issue.file_paths.is_empty() {
        desc.push_str(&format!(" (Files: {})", issue.file_paths.join(", ")));
    }
    if let Some(line) = issue.line_number {
        desc.push_str(&format!(" (Line: {})", line));
    }
    if let Some(fix) = &issue.suggested_fix {
        desc.push_str(&format!("\n   Suggestion: {}", fix));
    }
    desc
}
