//! Gatekeeper port
//!
//! A gatekeeper is an automated check (build, lint, tests) run against the
//! sandbox after the review phase. Any issue it reports counts as a rejection.

use async_trait::async_trait;
use kanon_domain::Issue;
use std::path::Path;

/// Port for automated validation of a sandbox
#[async_trait]
pub trait Gatekeeper: Send + Sync {
    /// Check the sandbox and return the issues found (empty means pass).
    ///
    /// Failures to run the check itself are reported as issues.
    async fn check(&self, sandbox_path: &Path) -> Vec<Issue>;
}
