//! Rebasing many pull requests at once
//!
//! Attempts on different clones run in parallel (up to a limit); attempts
//! that share a clone run one after another, since each one checks out
//! branches and stashes in that directory.

use super::execute::RebaseOrchestrator;
use crate::cancel::CancelToken;
use crate::report::ErrorSink;
use crate::types::{PullRequestRecord, RepoRef};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// One lock per local clone, keyed by canonical path
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    /// Wait for exclusive use of the clone at `path`
    ///
    /// Different spellings of the same directory share a lock.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

/// Counts from a [`RebaseCoordinator::rebase_all`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseSummary {
    /// Attempts that pushed successfully
    pub succeeded: usize,
    /// Attempts that returned an error
    pub failed: usize,
}

impl RebaseSummary {
    /// True if no attempt failed
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Runs the orchestrator over a stream of records
pub struct RebaseCoordinator {
    orchestrator: RebaseOrchestrator,
    sink: Arc<dyn ErrorSink>,
    local_paths: HashMap<RepoRef, PathBuf>,
    limiter: Arc<Semaphore>,
    locks: Arc<PathLocks>,
    cancel: CancelToken,
}

impl RebaseCoordinator {
    /// Create a coordinator
    ///
    /// `local_paths` maps each repository to its clone; records for
    /// repositories missing from the map fail with `PathNotConfigured`.
    pub fn new(
        orchestrator: RebaseOrchestrator,
        sink: Arc<dyn ErrorSink>,
        local_paths: HashMap<RepoRef, PathBuf>,
        max_concurrent: usize,
        cancel: CancelToken,
    ) -> Self {
        Self {
            orchestrator,
            sink,
            local_paths,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            locks: Arc::new(PathLocks::default()),
            cancel,
        }
    }

    /// Rebase every record received, or only PR `only` if given
    ///
    /// Failures are reported to the sink as they happen and do not stop
    /// the remaining attempts.
    pub async fn rebase_all(
        &self,
        mut records: mpsc::Receiver<PullRequestRecord>,
        only: Option<u64>,
    ) -> RebaseSummary {
        let mut tasks = JoinSet::new();

        while let Some(record) = records.recv().await {
            if only.is_some_and(|n| n != record.number) {
                continue;
            }
            if self.cancel.is_cancelled() {
                debug!(pr = record.number, repo = %record.repo, "cancelled, not starting");
                break;
            }

            let orchestrator = self.orchestrator.clone();
            let sink = Arc::clone(&self.sink);
            let limiter = Arc::clone(&self.limiter);
            let locks = Arc::clone(&self.locks);
            let path = self.local_paths.get(&record.repo).cloned();

            tasks.spawn(async move {
                // clone lock first, then a slot
                let _guard = match &path {
                    Some(path) => Some(locks.lock(path).await),
                    None => None,
                };
                let _permit = limiter.acquire_owned().await.ok();

                match orchestrator.rebase(&record, path.as_deref()).await {
                    Ok(()) => true,
                    Err(e) => {
                        let mut message = format!(
                            "Could not rebase PR #{} in {} because: {e}",
                            record.number, record.repo
                        );
                        if let Some(diagnostic) = e.diagnostic() {
                            message.push('\n');
                            message.push_str(diagnostic);
                        }
                        sink.error(&message);
                        false
                    }
                }
            });
        }

        let mut summary = RebaseSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    warn!("rebase task panicked: {e}");
                    self.sink.error(&format!("rebase task failed: {e}"));
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_path_locks_serialize_same_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let locks = PathLocks::default();

        let guard = locks.lock(temp.path()).await;
        // Same directory, different spelling
        let alias = temp.path().join(".");
        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&alias)).await;
        assert!(second.is_err(), "second lock should wait");

        drop(guard);
        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&alias)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_path_locks_independent_paths() {
        let a = tempfile::TempDir::new().unwrap();
        let b = tempfile::TempDir::new().unwrap();
        let locks = PathLocks::default();

        let _a = locks.lock(a.path()).await;
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(b.path())).await;
        assert!(other.is_ok());
    }

    #[test]
    fn test_summary() {
        assert!(RebaseSummary::default().all_succeeded());
        assert!(
            !RebaseSummary {
                succeeded: 3,
                failed: 1
            }
            .all_succeeded()
        );
    }
}
