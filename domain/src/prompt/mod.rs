//! Prompt domain
//!
//! Instructions, their amendment after rejected reviews, and the templates
//! that turn them into agent prompts.

pub mod feedback_injector;
pub mod instruction;
mod template;

pub use feedback_injector::{FeedbackInjector, REVISION_MARKER};
pub use instruction::Instruction;
pub use template::PromptTemplate;
