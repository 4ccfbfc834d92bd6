//! Review domain
//!
//! Reviewer verdicts, the issues they carry, and the merge gateway that
//! decides whether a set of verdicts constitutes approval.
//!
//! # Flow
//!
//! ```text
//!  reviewer-1 ─┐
//!  reviewer-2 ─┼─► Vec<ReviewFeedback> ─► MergeGateway::evaluate(condition) ─► AggregationResult
//!  gatekeeper ─┘                                                              (resolved, approved,
//!                                                                               pending, issues)
//! ```

pub mod consensus;
pub mod feedback;
pub mod gateway;
pub mod issue;
pub mod parsing;

pub use consensus::{AggregationResult, ConsensusCondition, ConsensusType};
pub use feedback::{CURRENT_TASK_ID, GATEKEEPER_ID, ReviewFeedback, ReviewStatus};
pub use gateway::MergeGateway;
pub use issue::{Issue, IssueLevel};
pub use parsing::parse_review_output;
