//! Domain layer for kanon
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Review consensus
//!
//! Independent reviewers return [`ReviewFeedback`] for an attempt. The
//! [`MergeGateway`] evaluates them under a [`ConsensusCondition`] (`ALL` or
//! `ANY`) and the [`FeedbackInjector`] folds unresolved issues into the next
//! [`Instruction`].
//!
//! ## Processes
//!
//! Every agent runs as an external command ([`CommandSpec`]) tracked as an
//! [`AgentProcess`]. Batches of [`BatchTask`]s are scheduled by dependency
//! under a [`SchedulerConfig`].
//!
//! ## Sandboxes
//!
//! Each task works in a disposable [`SandboxRepository`] environment that is
//! either committed and merged, or discarded.

pub mod config;
pub mod core;
pub mod orchestration;
pub mod process;
pub mod prompt;
pub mod review;
pub mod sandbox;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::error::DomainError;
pub use orchestration::{CorrectionEvent, CorrectionPhase, CorrectionState};
pub use process::{
    AgentProcess, BatchFailure, BatchResult, BatchTask, CommandSpec, OutputBuffer,
    ProcessStatus, SchedulerConfig, check_timeout,
};
pub use prompt::{FeedbackInjector, Instruction, PromptTemplate};
pub use review::{
    AggregationResult, ConsensusCondition, ConsensusType, GATEKEEPER_ID, Issue, IssueLevel,
    MergeGateway, ReviewFeedback, ReviewStatus, parse_review_output,
};
pub use sandbox::{EnvironmentConfig, SandboxEnvironment, SandboxError, SandboxRepository};
