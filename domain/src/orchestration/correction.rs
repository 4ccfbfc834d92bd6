//! Correction loop state machine
//!
//! ```text
//!   ┌──────────┐ Implemented ┌────────┐ Reviewed ┌───────────┐ approved ┌──────┐
//!   │Implement │────────────►│ Review │─────────►│ Aggregate │─────────►│ Done │
//!   └──────────┘             └────────┘          └───────────┘          └──────┘
//!        ▲                                            │ rejected
//!        │ attempts left      ┌───────┐               │
//!        └────────────────────│ Retry │◄──────────────┘
//!                             └───────┘
//!                                 │ budget spent   ┌────────┐
//!                                 └───────────────►│ Failed │
//!                                                  └────────┘
//! ```
//!
//! Every attempt takes at most four transitions, so a loop with
//! `max_retries` attempts is bounded by `4 * max_retries` transitions.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Transitions consumed by one full rejected attempt.
const TRANSITIONS_PER_ATTEMPT: usize = 4;

/// Phase of the correction loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionPhase {
    /// The implementing agent edits the sandbox
    Implement,
    /// Reviewers (and the gatekeeper) inspect the attempt
    Review,
    /// Verdicts are merged under the consensus condition
    Aggregate,
    /// Issues are folded into the next instruction
    Retry,
    /// Approved
    Done,
    /// Retry budget spent without approval
    Failed,
}

impl CorrectionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionPhase::Implement => "implement",
            CorrectionPhase::Review => "review",
            CorrectionPhase::Aggregate => "aggregate",
            CorrectionPhase::Retry => "retry",
            CorrectionPhase::Done => "done",
            CorrectionPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CorrectionPhase::Done | CorrectionPhase::Failed)
    }
}

impl std::fmt::Display for CorrectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something that happened in the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionEvent {
    Implemented,
    Reviewed,
    Aggregated { approved: bool },
    Retried,
}

impl CorrectionEvent {
    fn as_str(&self) -> &'static str {
        match self {
            CorrectionEvent::Implemented => "implemented",
            CorrectionEvent::Reviewed => "reviewed",
            CorrectionEvent::Aggregated { approved: true } => "aggregated(approved)",
            CorrectionEvent::Aggregated { approved: false } => "aggregated(rejected)",
            CorrectionEvent::Retried => "retried",
        }
    }
}

/// Position of a correction loop: phase, attempt counter and transition budget.
///
/// # Example
///
/// ```
/// use kanon_domain::orchestration::{CorrectionEvent, CorrectionPhase, CorrectionState};
///
/// let mut state = CorrectionState::new(1);
/// state.advance(CorrectionEvent::Implemented).unwrap();
/// state.advance(CorrectionEvent::Reviewed).unwrap();
/// state.advance(CorrectionEvent::Aggregated { approved: false }).unwrap();
/// let phase = state.advance(CorrectionEvent::Retried).unwrap();
/// assert_eq!(phase, CorrectionPhase::Failed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionState {
    phase: CorrectionPhase,
    attempt: usize,
    max_retries: usize,
    transitions: usize,
}

impl CorrectionState {
    /// A loop with no attempts to spend starts out failed.
    pub fn new(max_retries: usize) -> Self {
        let phase = if max_retries == 0 {
            CorrectionPhase::Failed
        } else {
            CorrectionPhase::Implement
        };
        Self {
            phase,
            attempt: 0,
            max_retries,
            transitions: 0,
        }
    }

    pub fn phase(&self) -> CorrectionPhase {
        self.phase
    }

    /// 1-based number of the attempt in progress.
    pub fn attempt_number(&self) -> usize {
        self.attempt + 1
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn max_transitions(&self) -> usize {
        self.max_retries * TRANSITIONS_PER_ATTEMPT
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn advance(&mut self, event: CorrectionEvent) -> Result<CorrectionPhase, DomainError> {
        if self.transitions >= self.max_transitions() {
            return Err(DomainError::TransitionLimitExceeded(self.max_transitions()));
        }

        let next = match (self.phase, event) {
            (CorrectionPhase::Implement, CorrectionEvent::Implemented) => CorrectionPhase::Review,
            (CorrectionPhase::Review, CorrectionEvent::Reviewed) => CorrectionPhase::Aggregate,
            (CorrectionPhase::Aggregate, CorrectionEvent::Aggregated { approved: true }) => {
                CorrectionPhase::Done
            }
            (CorrectionPhase::Aggregate, CorrectionEvent::Aggregated { approved: false }) => {
                CorrectionPhase::Retry
            }
            (CorrectionPhase::Retry, CorrectionEvent::Retried) => {
                self.attempt += 1;
                if self.attempt >= self.max_retries {
                    CorrectionPhase::Failed
                } else {
                    CorrectionPhase::Implement
                }
            }
            (from, event) => {
                return Err(DomainError::InvalidTransition {
                    from: from.to_string(),
                    event: event.as_str().to_string(),
                });
            }
        };

        self.transitions += 1;
        self.phase = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reject_once(state: &mut CorrectionState) -> CorrectionPhase {
        state.advance(CorrectionEvent::Implemented).unwrap();
        state.advance(CorrectionEvent::Reviewed).unwrap();
        state
            .advance(CorrectionEvent::Aggregated { approved: false })
            .unwrap();
        state.advance(CorrectionEvent::Retried).unwrap()
    }

    #[test]
    fn test_zero_retries_starts_failed() {
        let state = CorrectionState::new(0);
        assert_eq!(state.phase(), CorrectionPhase::Failed);
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn test_approval_on_second_attempt() {
        let mut state = CorrectionState::new(3);
        assert_eq!(reject_once(&mut state), CorrectionPhase::Implement);
        assert_eq!(state.attempt_number(), 2);

        state.advance(CorrectionEvent::Implemented).unwrap();
        state.advance(CorrectionEvent::Reviewed).unwrap();
        let phase = state
            .advance(CorrectionEvent::Aggregated { approved: true })
            .unwrap();
        assert_eq!(phase, CorrectionPhase::Done);
        assert_eq!(state.transitions(), 7);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut state = CorrectionState::new(2);
        assert_eq!(reject_once(&mut state), CorrectionPhase::Implement);
        assert_eq!(reject_once(&mut state), CorrectionPhase::Failed);
        assert_eq!(state.transitions(), state.max_transitions());
    }

    #[test]
    fn test_invalid_transition() {
        let mut state = CorrectionState::new(1);
        let err = state.advance(CorrectionEvent::Reviewed).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "implement".to_string(),
                event: "reviewed".to_string(),
            }
        );
        assert_eq!(state.phase(), CorrectionPhase::Implement);
    }

    #[test]
    fn test_terminal_phase_rejects_events() {
        let mut state = CorrectionState::new(1);
        reject_once(&mut state);
        assert!(state.advance(CorrectionEvent::Implemented).is_err());
    }
}
