//! Narrowing the record stream

use crate::types::{PullRequestRecord, RepoRef};
use tokio::sync::mpsc;

/// Predicates a record must satisfy to be kept
///
/// Unset predicates accept everything; an empty `repos` list accepts
/// every repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Keep only PRs authored by this login
    pub owner: Option<String>,
    /// Keep only PRs in these repositories
    pub repos: Vec<RepoRef>,
    /// Drop PRs that are already up to date with their target
    pub needs_rebase: bool,
}

impl RecordFilter {
    /// Whether `record` passes every predicate
    pub fn matches(&self, record: &PullRequestRecord) -> bool {
        if let Some(owner) = &self.owner
            && record.author_login != *owner
        {
            return false;
        }
        if !self.repos.is_empty() && !self.repos.contains(&record.repo) {
            return false;
        }
        !(self.needs_rebase && record.is_rebased)
    }

    /// Forward only matching records
    pub fn filter(
        &self,
        input: mpsc::Receiver<PullRequestRecord>,
    ) -> mpsc::Receiver<PullRequestRecord> {
        let filter = self.clone();
        forward(input, move |record| filter.matches(&record).then_some(record))
    }

    /// Forward every record, clearing `visible` on those that don't match
    pub fn mark(&self, input: mpsc::Receiver<PullRequestRecord>) -> mpsc::Receiver<PullRequestRecord> {
        let filter = self.clone();
        forward(input, move |mut record| {
            record.visible = filter.matches(&record);
            Some(record)
        })
    }
}

fn forward<F>(
    mut input: mpsc::Receiver<PullRequestRecord>,
    mut step: F,
) -> mpsc::Receiver<PullRequestRecord>
where
    F: FnMut(PullRequestRecord) -> Option<PullRequestRecord> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(input.max_capacity().max(1));
    tokio::spawn(async move {
        while let Some(record) = input.recv().await {
            if let Some(record) = step(record)
                && tx.send(record).await.is_err()
            {
                break;
            }
        }
    });
    rx
}
