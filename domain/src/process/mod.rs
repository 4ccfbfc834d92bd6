//! Process domain
//!
//! Records and value types for external command execution: what gets run
//! ([`CommandSpec`], [`BatchTask`]), how it is tracked ([`AgentProcess`],
//! [`ProcessStatus`], [`OutputBuffer`]) and how batches are tuned and
//! reported ([`SchedulerConfig`], [`BatchResult`]).
//!
//! The scheduler that actually spawns processes lives in the
//! infrastructure layer.

pub mod batch;
pub mod command;
pub mod config;
pub mod entities;
pub mod output;

pub use batch::{BatchFailure, BatchResult, BatchTask};
pub use command::CommandSpec;
pub use config::SchedulerConfig;
pub use entities::{AgentProcess, ProcessStatus, check_timeout};
pub use output::{OUTPUT_CAPACITY, OutputBuffer};
