//! Task instructions handed to implementation and review agents.

use serde::{Deserialize, Serialize};

/// What an agent is asked to do: an objective plus ordered task steps.
///
/// Treated as an immutable value. A retry never edits an instruction in
/// place; it derives a new one through
/// [`FeedbackInjector`](super::feedback_injector::FeedbackInjector).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instruction {
    pub objective: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl Instruction {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.tasks.push(task.into());
        self
    }

    pub fn with_tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tasks.extend(tasks.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let instruction = Instruction::new("Add division")
            .with_task("write the function")
            .with_tasks(["add tests", "update docs"]);

        assert_eq!(instruction.objective, "Add division");
        assert_eq!(
            instruction.tasks,
            vec!["write the function", "add tests", "update docs"]
        );
    }
}
