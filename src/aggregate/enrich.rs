//! Folding platform responses into record fields
//!
//! These functions are pure: the aggregator gathers the raw responses
//! concurrently, then folds them here into one finished record.

use crate::types::{CommitStatus, Identity, PrComment, PullRequestRecord, Review, ReviewState};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Comment text that counts as an approval
const APPROVAL_MARKERS: [&str; 4] = [":+1:", ":thumbsup:", "\u{1f44d}", "LGTM"];

/// Everything gathered for one pull request
///
/// Fields left at their default mean the corresponding call failed (or
/// returned nothing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Commits on the target branch missing from the head, if known
    pub ahead_by: Option<u64>,
    /// Distinct identities that approved
    pub approvers: BTreeSet<String>,
    /// Labels, deduplicated, in platform order
    pub labels: Vec<String>,
    /// Build context results with ignored contexts removed
    pub build_status: BTreeMap<String, bool>,
}

impl Enrichment {
    /// Write the gathered values into `record`
    pub fn apply(self, record: &mut PullRequestRecord, viewer: &Identity) {
        record.is_rebased = self.ahead_by == Some(0);
        record.approval_count = self.approvers.len();
        if self.approvers.contains(&viewer.login) {
            record.needs_viewer_approval = false;
        }
        record.labels = self.labels;
        record.build_status_by_context = self.build_status;
    }
}

/// Whether a comment body signals approval
pub fn is_approval_comment(body: &str) -> bool {
    APPROVAL_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Union of approving comment authors and approving reviewers
///
/// Each identity counts once no matter how many signals it sent.
pub fn approving_identities(comments: &[PrComment], reviews: &[Review]) -> BTreeSet<String> {
    let from_comments = comments
        .iter()
        .filter(|c| is_approval_comment(&c.body))
        .map(|c| c.author.clone());
    let from_reviews = reviews
        .iter()
        .filter(|r| r.state == ReviewState::Approved)
        .map(|r| r.author.clone());
    from_comments.chain(from_reviews).collect()
}

/// Pass/fail per build context
///
/// A context is failing until any of its statuses reports success.
/// Contexts in `ignored` are dropped.
pub fn build_status(
    statuses: &[CommitStatus],
    ignored: &BTreeSet<String>,
) -> BTreeMap<String, bool> {
    let mut result = BTreeMap::new();
    for status in statuses {
        if ignored.contains(&status.context) {
            continue;
        }
        let passed = result.entry(status.context.clone()).or_insert(false);
        if status.is_success() {
            *passed = true;
        }
    }
    result
}

/// Drop repeated labels, keeping the first occurrence
pub fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(label.clone()))
        .collect()
}
