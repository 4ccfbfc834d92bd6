//! Presentation layer for kanon
//!
//! This crate contains CLI definitions, output formatters and progress
//! reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{BatchArgs, Cli, Command, RunArgs};
pub use output::console::{BatchSummary, ConsoleFormatter};
pub use progress::reporter::{BatchReporter, CorrectionReporter, SimpleProgress};
