//! Review configuration from TOML (`[review]` section)

use kanon_domain::{ConsensusCondition, ConsensusType};
use serde::{Deserialize, Serialize};

/// Raw review configuration from TOML
///
/// # Example
///
/// ```toml
/// [review]
/// developer = "developer"
/// reviewers = ["reviewer-1", "reviewer-2"]
/// consensus = "all"   # or "any"
/// max_retries = 3
/// ```
///
/// An unknown `consensus` value is rejected while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReviewConfig {
    /// Agent that implements and revises
    pub developer: String,
    /// Agents that review each attempt, in report order
    pub reviewers: Vec<String>,
    pub consensus: ConsensusType,
    /// Implementation attempts before giving up
    pub max_retries: usize,
}

impl Default for FileReviewConfig {
    fn default() -> Self {
        Self {
            developer: "developer".to_string(),
            reviewers: vec!["reviewer-1".to_string()],
            consensus: ConsensusType::All,
            max_retries: 3,
        }
    }
}

impl FileReviewConfig {
    pub fn condition(&self) -> ConsensusCondition {
        ConsensusCondition::new(self.consensus, self.reviewers.iter().cloned())
    }
}
