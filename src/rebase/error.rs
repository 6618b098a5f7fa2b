//! Why a rebase attempt failed

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two remotes a lookup was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKind {
    /// The fork the PR comes from, matched against push URLs
    Owned,
    /// The repository the PR targets, matched against fetch URLs
    Upstream,
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned => write!(f, "owned"),
            Self::Upstream => write!(f, "upstream"),
        }
    }
}

/// A rebase attempt failed before completing its push
///
/// Variants raised by a git invocation carry git's own output in
/// `diagnostic`; see [`RebaseError::diagnostic`].
#[derive(Debug, Error)]
pub enum RebaseError {
    /// The tracked repository has no local clone path
    #[error("no local path is configured for {repo}")]
    PathNotConfigured {
        /// `owner/name`
        repo: String,
    },

    /// The configured path does not exist
    #[error("local path {} does not exist", path.display())]
    PathMissing {
        /// Configured path
        path: PathBuf,
    },

    /// The configured path has no `.git`
    #[error("{} is not a git repository", path.display())]
    NotAVersionControlledDirectory {
        /// Configured path
        path: PathBuf,
    },

    /// No remote matched the PR's URL
    #[error("no {which} remote matches {url}")]
    RemoteNotFound {
        /// Owned or upstream
        which: RemoteKind,
        /// URL that was searched for
        url: String,
    },

    /// Several differently named remotes matched the PR's URL
    #[error("several {which} remotes match {url}: {}", names.join(", "))]
    RemoteAmbiguous {
        /// Owned or upstream
        which: RemoteKind,
        /// URL that was searched for
        url: String,
        /// Every matching remote name
        names: Vec<String>,
    },

    /// `git remote -v` failed
    #[error("unable to list remotes")]
    RemoteListFailure {
        /// Git output
        diagnostic: String,
    },

    /// `git diff-index` could not be run
    #[error("unable to check for local changes")]
    LocalChangeDetectionFailure {
        /// Git output
        diagnostic: String,
    },

    /// `git stash` failed
    #[error("unable to stash changes in {}", path.display())]
    StashFailure {
        /// Local clone
        path: PathBuf,
        /// Git output
        diagnostic: String,
    },

    /// `git fetch` failed
    #[error("unable to fetch code from {remote}")]
    FetchFailure {
        /// Remote name
        remote: String,
        /// Git output
        diagnostic: String,
    },

    /// `git symbolic-ref HEAD` failed for a reason other than a detached HEAD
    #[error("unable to read the current branch")]
    BranchReadFailure {
        /// Git output
        diagnostic: String,
    },

    /// HEAD is neither a branch nor a resolvable commit
    #[error("no branch is checked out")]
    NoBranchCheckedOut {
        /// Git output
        diagnostic: String,
    },

    /// The temporary branch is left over from an earlier run
    #[error("branch {branch} already exists; delete it if no rebase is in progress")]
    TempBranchExists {
        /// Temporary branch name
        branch: String,
        /// Git output
        diagnostic: String,
    },

    /// `git checkout -b` failed for another reason
    #[error("unable to create branch {branch}")]
    TempBranchCreateFailure {
        /// Temporary branch name
        branch: String,
        /// Git output
        diagnostic: String,
    },

    /// `git reset --hard` failed
    #[error("unable to reset the code to {target}")]
    ResetFailure {
        /// `remote/branch` reset target
        target: String,
        /// Git output
        diagnostic: String,
    },

    /// `git rebase` failed, usually on a conflict
    #[error("unable to rebase against {onto}, there may be a conflict")]
    RebaseConflict {
        /// `remote/branch` rebased onto
        onto: String,
        /// Git output
        diagnostic: String,
    },

    /// `git push --force` failed
    #[error("unable to push to {remote}")]
    PushFailure {
        /// Remote name
        remote: String,
        /// Git output
        diagnostic: String,
    },

    /// The run was interrupted before this attempt finished
    #[error("rebase cancelled")]
    Cancelled,
}

impl RebaseError {
    /// Output of the git command behind this failure, if any
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::RemoteListFailure { diagnostic }
            | Self::LocalChangeDetectionFailure { diagnostic }
            | Self::StashFailure { diagnostic, .. }
            | Self::FetchFailure { diagnostic, .. }
            | Self::BranchReadFailure { diagnostic }
            | Self::NoBranchCheckedOut { diagnostic }
            | Self::TempBranchExists { diagnostic, .. }
            | Self::TempBranchCreateFailure { diagnostic, .. }
            | Self::ResetFailure { diagnostic, .. }
            | Self::RebaseConflict { diagnostic, .. }
            | Self::PushFailure { diagnostic, .. } => {
                Some(diagnostic.as_str()).filter(|d| !d.is_empty())
            }
            Self::PathNotConfigured { .. }
            | Self::PathMissing { .. }
            | Self::NotAVersionControlledDirectory { .. }
            | Self::RemoteNotFound { .. }
            | Self::RemoteAmbiguous { .. }
            | Self::Cancelled => None,
        }
    }
}
