//! Rebasing one pull request in a local clone
//!
//! The orchestrator runs a fixed sequence of git commands. Every step that
//! mutates the clone is paired with an undo step that runs no matter how
//! the later steps end:
//!
//! ```text
//! validate path -> remote -v -> diff-index -> [stash]
//!     fetch owned -> fetch upstream -> symbolic-ref HEAD -> checkout -b prp-<branch>
//!         reset --hard -> rebase (-> rebase --abort) -> push --force
//!     checkout <original> -> branch -D prp-<branch>
//! [stash pop]
//! ```
//!
//! Undo failures are reported as warnings to the [`ErrorSink`] and never
//! replace the error that caused the unwind.

use super::error::{RebaseError, RemoteKind};
use super::remotes::{Direction, find_remote, parse_remotes};
use crate::cancel::CancelToken;
use crate::git::{GitOutput, GitRunner};
use crate::report::ErrorSink;
use crate::types::PullRequestRecord;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of the temporary branch used while rebasing
pub const TEMP_BRANCH_PREFIX: &str = "prp-";

/// Exit code git uses for fatal errors
const GIT_FATAL: i32 = 128;

/// Name of the temporary branch for a PR head branch
pub fn temp_branch_name(head_branch: &str) -> String {
    format!("{TEMP_BRANCH_PREFIX}{head_branch}")
}

/// Where HEAD pointed before the temporary branch was created
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginalHead {
    Branch(String),
    Detached(String),
}

impl OriginalHead {
    fn checkout_target(&self) -> &str {
        match self {
            Self::Branch(name) | Self::Detached(name) => name,
        }
    }
}

/// Everything one attempt needs once the remotes are known
struct WorkingState<'a> {
    path: &'a Path,
    pr: &'a PullRequestRecord,
    owned_remote: String,
    upstream_remote: String,
    temp_branch: String,
}

impl WorkingState<'_> {
    fn context(&self) -> String {
        format!("PR #{} in {}", self.pr.number, self.pr.repo)
    }
}

/// Rebases pull requests onto their target branch in a local clone
#[derive(Clone)]
pub struct RebaseOrchestrator {
    git: Arc<dyn GitRunner>,
    sink: Arc<dyn ErrorSink>,
    cancel: CancelToken,
}

impl RebaseOrchestrator {
    /// Create an orchestrator
    pub fn new(git: Arc<dyn GitRunner>, sink: Arc<dyn ErrorSink>, cancel: CancelToken) -> Self {
        Self { git, sink, cancel }
    }

    /// Rebase `pr` in the clone at `local_path` and force-push the result
    ///
    /// On return the clone is back on its original branch with any stashed
    /// changes restored, whatever the outcome. This includes a failed fetch:
    /// local changes are stashed before fetching, so the stash is popped
    /// there too rather than left behind.
    pub async fn rebase(
        &self,
        pr: &PullRequestRecord,
        local_path: Option<&Path>,
    ) -> Result<(), RebaseError> {
        let path = validate_local(pr, local_path)?;
        self.check_cancelled()?;

        info!(pr = pr.number, repo = %pr.repo, path = %path.display(), "rebasing");

        let (owned_remote, upstream_remote) = self.discover_remotes(path, pr).await?;
        debug!(%owned_remote, %upstream_remote, "matched remotes");

        let state = WorkingState {
            path,
            pr,
            owned_remote,
            upstream_remote,
            temp_branch: temp_branch_name(&pr.head_branch),
        };

        let stashed = if self.has_local_changes(path).await? {
            self.stash(&state).await?
        } else {
            false
        };

        let outcome = self.fetch_and_rebase(&state).await;

        if stashed {
            self.pop_stash(&state).await;
        }

        if outcome.is_ok() {
            info!(pr = pr.number, repo = %pr.repo, "rebased and pushed");
        }
        outcome
    }

    fn check_cancelled(&self) -> Result<(), RebaseError> {
        if self.cancel.is_cancelled() {
            return Err(RebaseError::Cancelled);
        }
        Ok(())
    }

    async fn run_git(&self, path: &Path, args: &[&str]) -> Result<GitOutput, String> {
        self.git.run(path, args).await.map_err(|e| e.to_string())
    }

    async fn discover_remotes(
        &self,
        path: &Path,
        pr: &PullRequestRecord,
    ) -> Result<(String, String), RebaseError> {
        let output = match self.run_git(path, &["remote", "-v"]).await {
            Ok(out) if out.success() => out,
            Ok(out) => {
                return Err(RebaseError::RemoteListFailure {
                    diagnostic: out.diagnostic(),
                });
            }
            Err(diagnostic) => return Err(RebaseError::RemoteListFailure { diagnostic }),
        };

        let entries = parse_remotes(&output.stdout);
        let owned = find_remote(
            &entries,
            &pr.head_remote_url,
            Direction::Push,
            RemoteKind::Owned,
        )?;
        let upstream = find_remote(
            &entries,
            &pr.base_remote_url,
            Direction::Fetch,
            RemoteKind::Upstream,
        )?;
        Ok((owned, upstream))
    }

    /// Any non-zero exit from `diff-index --quiet` counts as dirty
    async fn has_local_changes(&self, path: &Path) -> Result<bool, RebaseError> {
        let output = self
            .run_git(path, &["diff-index", "--quiet", "HEAD"])
            .await
            .map_err(|diagnostic| RebaseError::LocalChangeDetectionFailure { diagnostic })?;
        let dirty = !output.success();
        debug!(dirty, "checked for local changes");
        Ok(dirty)
    }

    /// Returns whether a stash entry was actually created
    ///
    /// git exits 0 without creating an entry when nothing is stashable, so
    /// the stash ref is compared before and after.
    async fn stash(&self, state: &WorkingState<'_>) -> Result<bool, RebaseError> {
        let before = self.stash_ref(state.path).await;

        info!(path = %state.path.display(), "stashing local changes");
        match self.run_git(state.path, &["stash"]).await {
            Ok(out) if out.success() => {}
            Ok(out) => {
                return Err(RebaseError::StashFailure {
                    path: state.path.to_path_buf(),
                    diagnostic: out.diagnostic(),
                });
            }
            Err(diagnostic) => {
                return Err(RebaseError::StashFailure {
                    path: state.path.to_path_buf(),
                    diagnostic,
                });
            }
        }

        let after = self.stash_ref(state.path).await;
        let created = after.is_some() && after != before;
        debug!(created, "stashed");
        Ok(created)
    }

    /// Commit of the newest stash entry, if any
    async fn stash_ref(&self, path: &Path) -> Option<String> {
        self.resolve_ref(path, "refs/stash").await
    }

    async fn resolve_ref(&self, path: &Path, reference: &str) -> Option<String> {
        match self
            .run_git(path, &["rev-parse", "-q", "--verify", reference])
            .await
        {
            Ok(out) if out.success() => {
                let sha = out.stdout.trim();
                (!sha.is_empty()).then(|| sha.to_string())
            }
            _ => None,
        }
    }

    async fn fetch(&self, path: &Path, remote: &str) -> Result<(), RebaseError> {
        info!(remote, "fetching");
        match self.run_git(path, &["fetch", remote]).await {
            Ok(out) if out.success() => Ok(()),
            Ok(out) => Err(RebaseError::FetchFailure {
                remote: remote.to_string(),
                diagnostic: out.diagnostic(),
            }),
            Err(diagnostic) => Err(RebaseError::FetchFailure {
                remote: remote.to_string(),
                diagnostic,
            }),
        }
    }

    /// Fetch, then do the branch work on a temporary branch
    async fn fetch_and_rebase(&self, state: &WorkingState<'_>) -> Result<(), RebaseError> {
        self.fetch(state.path, &state.owned_remote).await?;
        self.fetch(state.path, &state.upstream_remote).await?;

        let original = self.current_head(state.path).await?;
        debug!(?original, "saved current HEAD");

        self.create_temp_branch(state).await?;

        let outcome = self.rewrite_and_push(state).await;
        self.restore_branch(state, &original).await;
        outcome
    }

    async fn current_head(&self, path: &Path) -> Result<OriginalHead, RebaseError> {
        let output = self
            .run_git(path, &["symbolic-ref", "HEAD"])
            .await
            .map_err(|diagnostic| RebaseError::BranchReadFailure { diagnostic })?;

        if output.success() {
            let full = output.stdout.trim();
            let branch = full.strip_prefix("refs/heads/").unwrap_or(full);
            return Ok(OriginalHead::Branch(branch.to_string()));
        }

        if output.code != Some(GIT_FATAL) {
            return Err(RebaseError::BranchReadFailure {
                diagnostic: output.diagnostic(),
            });
        }

        // Detached HEAD: remember the commit instead
        match self.run_git(path, &["rev-parse", "HEAD"]).await {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
                Ok(OriginalHead::Detached(out.stdout.trim().to_string()))
            }
            Ok(out) => Err(RebaseError::NoBranchCheckedOut {
                diagnostic: out.diagnostic(),
            }),
            Err(diagnostic) => Err(RebaseError::NoBranchCheckedOut { diagnostic }),
        }
    }

    async fn create_temp_branch(&self, state: &WorkingState<'_>) -> Result<(), RebaseError> {
        let branch = &state.temp_branch;
        info!(%branch, "creating temporary branch");
        let output = match self.run_git(state.path, &["checkout", "-b", branch]).await {
            Ok(out) if out.success() => return Ok(()),
            Ok(out) => out,
            Err(diagnostic) => {
                return Err(RebaseError::TempBranchCreateFailure {
                    branch: branch.clone(),
                    diagnostic,
                });
            }
        };

        if output.code == Some(GIT_FATAL) && self.branch_exists(state.path, branch).await {
            return Err(RebaseError::TempBranchExists {
                branch: branch.clone(),
                diagnostic: output.diagnostic(),
            });
        }
        Err(RebaseError::TempBranchCreateFailure {
            branch: branch.clone(),
            diagnostic: output.diagnostic(),
        })
    }

    async fn branch_exists(&self, path: &Path, branch: &str) -> bool {
        self.resolve_ref(path, &format!("refs/heads/{branch}"))
            .await
            .is_some()
    }

    async fn rewrite_and_push(&self, state: &WorkingState<'_>) -> Result<(), RebaseError> {
        let pr = state.pr;

        self.check_cancelled()?;
        let reset_target = format!("{}/{}", state.owned_remote, pr.head_branch);
        info!(target = %reset_target, "resetting");
        match self.run_git(state.path, &["reset", "--hard", &reset_target]).await {
            Ok(out) if out.success() => {}
            Ok(out) => {
                return Err(RebaseError::ResetFailure {
                    target: reset_target,
                    diagnostic: out.diagnostic(),
                });
            }
            Err(diagnostic) => {
                return Err(RebaseError::ResetFailure {
                    target: reset_target,
                    diagnostic,
                });
            }
        }

        self.check_cancelled()?;
        let onto = format!("{}/{}", state.upstream_remote, pr.target_branch);
        info!(%onto, "rebasing");
        let diagnostic = match self.run_git(state.path, &["rebase", &onto]).await {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.diagnostic()),
            Err(diagnostic) => Some(diagnostic),
        };
        if let Some(diagnostic) = diagnostic {
            self.abort_rebase(state).await;
            return Err(RebaseError::RebaseConflict { onto, diagnostic });
        }

        self.check_cancelled()?;
        let refspec = format!("{}:{}", state.temp_branch, pr.head_branch);
        info!(remote = %state.owned_remote, %refspec, "force pushing");
        match self
            .run_git(
                state.path,
                &["push", &state.owned_remote, &refspec, "--force"],
            )
            .await
        {
            Ok(out) if out.success() => Ok(()),
            Ok(out) => Err(RebaseError::PushFailure {
                remote: state.owned_remote.clone(),
                diagnostic: out.diagnostic(),
            }),
            Err(diagnostic) => Err(RebaseError::PushFailure {
                remote: state.owned_remote.clone(),
                diagnostic,
            }),
        }
    }

    async fn abort_rebase(&self, state: &WorkingState<'_>) {
        let failure = match self.run_git(state.path, &["rebase", "--abort"]).await {
            Ok(out) if out.success() => return,
            Ok(out) => out.diagnostic(),
            Err(diagnostic) => diagnostic,
        };
        self.warn(&format!(
            "Could not abort rebase for {} in {}: {failure}",
            state.context(),
            state.path.display()
        ));
    }

    /// Check out the original branch, then delete the temporary one
    ///
    /// Deletion is attempted even if the checkout failed.
    async fn restore_branch(&self, state: &WorkingState<'_>, original: &OriginalHead) {
        let target = original.checkout_target();
        let failure = match self.run_git(state.path, &["checkout", target]).await {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.diagnostic()),
            Err(diagnostic) => Some(diagnostic),
        };
        if let Some(failure) = failure {
            self.warn(&format!(
                "Could not go back to {target} for {} in {}: {failure}",
                state.context(),
                state.path.display()
            ));
        }

        let branch = &state.temp_branch;
        let failure = match self.run_git(state.path, &["branch", "-D", branch]).await {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.diagnostic()),
            Err(diagnostic) => Some(diagnostic),
        };
        if let Some(failure) = failure {
            self.warn(&format!(
                "Could not delete temporary branch {branch} for {} in {}: {failure}",
                state.context(),
                state.path.display()
            ));
        }
    }

    async fn pop_stash(&self, state: &WorkingState<'_>) {
        info!(path = %state.path.display(), "restoring stashed changes");
        let failure = match self.run_git(state.path, &["stash", "pop"]).await {
            Ok(out) if out.success() => return,
            Ok(out) => out.diagnostic(),
            Err(diagnostic) => diagnostic,
        };
        self.warn(&format!(
            "Could not pop stash for {} in {}: {failure}",
            state.context(),
            state.path.display()
        ));
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
        self.sink.warning(message);
    }
}

fn validate_local<'a>(
    pr: &PullRequestRecord,
    local_path: Option<&'a Path>,
) -> Result<&'a Path, RebaseError> {
    let path = local_path.ok_or_else(|| RebaseError::PathNotConfigured {
        repo: pr.repo.to_string(),
    })?;
    if !path.exists() {
        return Err(RebaseError::PathMissing {
            path: path.to_path_buf(),
        });
    }
    if !path.join(".git").exists() {
        return Err(RebaseError::NotAVersionControlledDirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_branch_name() {
        assert_eq!(temp_branch_name("feature/x"), "prp-feature/x");
    }

    #[test]
    fn test_detached_head_checks_out_commit() {
        let head = OriginalHead::Detached("abc123".to_string());
        assert_eq!(head.checkout_target(), "abc123");
    }
}
