//! Concurrent collection of pull request records
//!
//! One task per tracked repository lists its open pull requests; one task
//! per pull request then runs the comparison, approval, label and build
//! status lookups side by side and emits a finished record. A failed
//! lookup leaves its field at the zero value. A failed listing is reported
//! to the [`ErrorSink`] and that repository contributes nothing.

mod enrich;

pub use enrich::{
    Enrichment, approving_identities, build_status, dedup_labels, is_approval_comment,
};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::report::ErrorSink;
use crate::types::{Identity, PullRequest, PullRequestRecord, TrackedRepository};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Buffered records between the aggregator and its consumer
const CHANNEL_CAPACITY: usize = 64;

/// Limits applied to every platform call
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Maximum platform calls in flight
    pub max_concurrent_requests: usize,
    /// Deadline for each call
    pub request_timeout: Duration,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 16,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Fans out over repositories and pull requests
#[derive(Clone)]
pub struct Aggregator {
    platform: Arc<dyn PlatformService>,
    sink: Arc<dyn ErrorSink>,
    limiter: Arc<Semaphore>,
    request_timeout: Duration,
    cancel: CancelToken,
}

impl Aggregator {
    /// Create an aggregator
    pub fn new(
        platform: Arc<dyn PlatformService>,
        sink: Arc<dyn ErrorSink>,
        options: AggregateOptions,
        cancel: CancelToken,
    ) -> Self {
        Self {
            platform,
            sink,
            limiter: Arc::new(Semaphore::new(options.max_concurrent_requests.max(1))),
            request_timeout: options.request_timeout,
            cancel,
        }
    }

    /// Stream one record per open pull request across `repos`
    ///
    /// Records arrive in no particular order. The receiver yields `None`
    /// once every repository and pull request task has finished. Must be
    /// called from within a tokio runtime.
    pub fn aggregate(
        &self,
        repos: Vec<TrackedRepository>,
        viewer: Identity,
    ) -> mpsc::Receiver<PullRequestRecord> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let this = self.clone();
        let viewer = Arc::new(viewer);

        tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            for repo in repos {
                tasks.spawn(this.clone().aggregate_repo(
                    Arc::new(repo),
                    Arc::clone(&viewer),
                    tx.clone(),
                ));
            }
            drop(tx);
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!("repository task failed: {e}");
                }
            }
        });

        rx
    }

    async fn aggregate_repo(
        self,
        repo: Arc<TrackedRepository>,
        viewer: Arc<Identity>,
        tx: mpsc::Sender<PullRequestRecord>,
    ) {
        let listing = self
            .call(
                "list pull requests",
                self.platform.list_pull_requests(&repo.owner, &repo.name),
            )
            .await;

        let prs = match listing {
            Ok(prs) => prs,
            Err(Error::Cancelled) => return,
            Err(e) => {
                self.sink.error(&format!(
                    "Could not list pull requests for {}/{}: {e}",
                    repo.owner, repo.name
                ));
                return;
            }
        };
        debug!(repo = %repo.repo_ref(), count = prs.len(), "listed pull requests");

        let mut tasks = JoinSet::new();
        for pr in prs {
            if self.cancel.is_cancelled() {
                break;
            }
            let this = self.clone();
            let repo = Arc::clone(&repo);
            let viewer = Arc::clone(&viewer);
            let tx = tx.clone();
            tasks.spawn(async move {
                let record = this.enrich(&repo, pr, &viewer).await;
                // A closed receiver means nobody wants the rest
                let _ = tx.send(record).await;
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(repo = %repo.repo_ref(), "pull request task failed: {e}");
            }
        }
    }

    /// Build one record from four concurrent lookups
    async fn enrich(
        &self,
        repo: &TrackedRepository,
        pr: PullRequest,
        viewer: &Identity,
    ) -> PullRequestRecord {
        let (owner, name, number) = (repo.owner.as_str(), repo.name.as_str(), pr.number);
        let platform = self.platform.as_ref();

        let (ahead_by, approvers, labels, build) = tokio::join!(
            self.call(
                "compare commits",
                platform.compare_commits(owner, name, &pr.head_label, &pr.base_label),
            ),
            async {
                let (comments, reviews) = tokio::join!(
                    self.call(
                        "list comments",
                        platform.list_issue_comments(owner, name, number),
                    ),
                    self.call("list reviews", platform.list_reviews(owner, name, number)),
                );
                let comments = or_default(repo, number, comments);
                let reviews = or_default(repo, number, reviews);
                approving_identities(&comments, &reviews)
            },
            self.call("list labels", platform.list_labels(owner, name, number)),
            self.call(
                "list statuses",
                platform.list_commit_statuses(owner, name, &pr.head_sha),
            ),
        );

        let enrichment = Enrichment {
            ahead_by: ahead_by
                .inspect_err(|e| debug!(repo = %repo.repo_ref(), number, "compare failed: {e}"))
                .ok(),
            approvers,
            labels: dedup_labels(or_default(repo, number, labels)),
            build_status: build_status(
                &or_default(repo, number, build),
                &repo.ignored_build_contexts,
            ),
        };

        let mut record = PullRequestRecord::from_pull_request(repo.repo_ref(), pr, viewer);
        enrichment.apply(&mut record, viewer);
        record
    }

    /// Run one platform call under the concurrency cap and deadline
    async fn call<T>(
        &self,
        operation: &str,
        request: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| Error::Cancelled)?;

        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| Error::Timeout {
                operation: operation.to_string(),
                timeout: self.request_timeout,
            })?
    }
}

/// Zero value for a failed lookup
fn or_default<T: Default>(repo: &TrackedRepository, number: u64, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        if !matches!(e, Error::Cancelled) {
            debug!(repo = %repo.repo_ref(), number, "lookup failed: {e}");
        }
        T::default()
    })
}
