//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown consensus type: {0} (expected \"all\" or \"any\")")]
    UnknownConsensusType(String),

    #[error("Unknown issue severity: {0}")]
    InvalidSeverity(String),

    #[error("Unknown review status: {0}")]
    InvalidReviewStatus(String),

    #[error("Invalid correction loop transition: {event} while in {from}")]
    InvalidTransition { from: String, event: String },

    #[error("Correction loop exceeded {0} transitions")]
    TransitionLimitExceeded(usize),
}

impl DomainError {
    /// Configuration errors must abort before any work is started.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, DomainError::UnknownConsensusType(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_consensus_display() {
        let error = DomainError::UnknownConsensusType("majority".to_string());
        assert_eq!(
            error.to_string(),
            "Unknown consensus type: majority (expected \"all\" or \"any\")"
        );
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(DomainError::UnknownConsensusType("x".into()).is_configuration_error());
        assert!(!DomainError::InvalidSeverity("x".into()).is_configuration_error());
    }
}
