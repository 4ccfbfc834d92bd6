//! Verdict parsing for reviewer output.
//!
//! Pure text handling: turns whatever a review agent printed into a
//! [`ReviewFeedback`]. No I/O.
//!
//! | Format | Example | Result |
//! |--------|---------|--------|
//! | JSON (preferred) | `{"status": "rejected", "issues": [...]}` | status and issues as given |
//! | Keywords | `[REJECT]`, `needs_work`, `Issues Found` | rejected, one error issue |
//! | Anything else | free text | approved |

use super::feedback::{ReviewFeedback, ReviewStatus};
use super::issue::Issue;
use serde::Deserialize;

/// Characters of raw output carried into the synthesized issue.
const EXCERPT_CHARS: usize = 500;

const REJECTION_MARKERS: [&str; 3] = ["[REJECT]", "needs_work", "Issues Found"];

#[derive(Debug, Deserialize)]
struct Verdict {
    status: ReviewStatus,
    #[serde(default)]
    issues: Vec<Issue>,
}

/// Parse reviewer output into feedback for `target_agent_id`.
///
/// ```
/// use kanon_domain::review::{parse_review_output, ReviewStatus};
///
/// let fb = parse_review_output("reviewer-1", "developer", "[REJECT] tests are missing");
/// assert_eq!(fb.status, ReviewStatus::Rejected);
/// assert_eq!(fb.issues.len(), 1);
///
/// let fb = parse_review_output("reviewer-1", "developer", "Looks good to me.");
/// assert_eq!(fb.status, ReviewStatus::Approved);
/// ```
pub fn parse_review_output(reviewer_id: &str, target_agent_id: &str, output: &str) -> ReviewFeedback {
    if let Some(verdict) = extract_json_verdict(output) {
        return ReviewFeedback::new(reviewer_id, target_agent_id, verdict.status)
            .with_issues(verdict.issues);
    }

    if REJECTION_MARKERS.iter().any(|m| output.contains(m)) {
        let excerpt: String = output.chars().take(EXCERPT_CHARS).collect();
        return ReviewFeedback::rejected(reviewer_id, target_agent_id).with_issue(
            Issue::error("Issues found during automated review.").with_suggested_fix(excerpt),
        );
    }

    ReviewFeedback::approved(reviewer_id, target_agent_id)
}

fn extract_json_verdict(output: &str) -> Option<Verdict> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&output[start..=end]).ok()
}
