//! Consensus conditions and aggregation results.

use super::issue::Issue;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Rule for aggregating reviewer verdicts
///
/// - `All`: every expected reviewer must respond, and every response must approve
/// - `Any`: a single approval is enough, even before the others respond
///
/// Parsing is the only place an unknown rule can appear, and it fails
/// loudly there so a misconfigured rule never reaches aggregation.
///
/// ```
/// use kanon_domain::review::ConsensusType;
///
/// assert_eq!("ALL".parse::<ConsensusType>().unwrap(), ConsensusType::All);
/// assert!("majority".parse::<ConsensusType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConsensusType {
    #[default]
    All,
    Any,
}

impl ConsensusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusType::All => "all",
            ConsensusType::Any => "any",
        }
    }
}

impl std::fmt::Display for ConsensusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConsensusType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ConsensusType::All),
            "any" => Ok(ConsensusType::Any),
            _ => Err(DomainError::UnknownConsensusType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ConsensusType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConsensusType> for String {
    fn from(value: ConsensusType) -> Self {
        value.as_str().to_string()
    }
}

/// The rule plus the reviewers expected to respond.
///
/// Each reviewer appears once; repeats are dropped in [`ConsensusCondition::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusCondition {
    #[serde(rename = "type")]
    pub consensus_type: ConsensusType,
    pub reviewers: Vec<String>,
}

impl ConsensusCondition {
    pub fn new<I, S>(consensus_type: ConsensusType, reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for reviewer in reviewers.into_iter().map(Into::into) {
            if !unique.contains(&reviewer) {
                unique.push(reviewer);
            }
        }
        Self {
            consensus_type,
            reviewers: unique,
        }
    }

    pub fn all<I, S>(reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ConsensusType::All, reviewers)
    }

    pub fn any<I, S>(reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ConsensusType::Any, reviewers)
    }
}

/// Outcome of evaluating feedback against a [`ConsensusCondition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// The rule has enough information to decide
    pub is_resolved: bool,
    /// The decision is an approval (only meaningful when resolved)
    pub is_approved: bool,
    /// Expected reviewers that have not responded, in condition order
    pub pending_agents: Vec<String>,
    /// Every submitted issue, regardless of resolution
    pub merged_issues: Vec<Issue>,
}

impl AggregationResult {
    pub fn unresolved(pending_agents: Vec<String>, merged_issues: Vec<Issue>) -> Self {
        Self {
            is_resolved: false,
            is_approved: false,
            pending_agents,
            merged_issues,
        }
    }

    pub fn resolved(
        is_approved: bool,
        pending_agents: Vec<String>,
        merged_issues: Vec<Issue>,
    ) -> Self {
        Self {
            is_resolved: true,
            is_approved,
            pending_agents,
            merged_issues,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.merged_issues.len()
    }
}
