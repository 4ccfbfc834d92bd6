//! Merge gateway: decides whether collected reviewer verdicts reach consensus.
//!
//! Evaluation is a pure function of the condition and the *set* of feedback
//! received, so reviewers may respond in any order.
//!
//! ```text
//!            ALL                                 ANY
//!  ┌──────────────────────────┐      ┌──────────────────────────────┐
//!  │ anyone pending? → wait   │      │ any approval?  → approved    │
//!  │ all approved?  → approved│      │ anyone pending? → wait       │
//!  │ otherwise     → rejected │      │ otherwise      → rejected    │
//!  └──────────────────────────┘      └──────────────────────────────┘
//! ```

use super::consensus::{AggregationResult, ConsensusCondition, ConsensusType};
use super::feedback::ReviewFeedback;

/// Aggregates reviewer feedback under a [`ConsensusCondition`].
///
/// # Example
///
/// ```
/// use kanon_domain::review::{ConsensusCondition, MergeGateway, ReviewFeedback};
///
/// let condition = ConsensusCondition::all(["x", "y"]);
/// let feedbacks = vec![ReviewFeedback::approved("x", "developer")];
///
/// let result = MergeGateway.evaluate(&condition, &feedbacks);
/// assert!(!result.is_resolved);
/// assert_eq!(result.pending_agents, vec!["y".to_string()]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeGateway;

impl MergeGateway {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        condition: &ConsensusCondition,
        feedbacks: &[ReviewFeedback],
    ) -> AggregationResult {
        let pending_agents: Vec<String> = condition
            .reviewers
            .iter()
            .filter(|reviewer| !feedbacks.iter().any(|f| &f.reviewer_id == *reviewer))
            .cloned()
            .collect();

        let merged_issues = feedbacks
            .iter()
            .flat_map(|f| f.issues.iter().cloned())
            .collect();

        match condition.consensus_type {
            ConsensusType::All => {
                if !pending_agents.is_empty() {
                    return AggregationResult::unresolved(pending_agents, merged_issues);
                }
                let all_approved = feedbacks.iter().all(ReviewFeedback::is_approved);
                AggregationResult::resolved(all_approved, Vec::new(), merged_issues)
            }
            ConsensusType::Any => {
                if feedbacks.iter().any(ReviewFeedback::is_approved) {
                    // Outstanding reviewers are still reported but do not block.
                    return AggregationResult::resolved(true, pending_agents, merged_issues);
                }
                if pending_agents.is_empty() {
                    return AggregationResult::resolved(false, Vec::new(), merged_issues);
                }
                AggregationResult::unresolved(pending_agents, merged_issues)
            }
        }
    }
}
