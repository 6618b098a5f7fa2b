//! Error types for prp

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the library outside of a rebase attempt.
///
/// Rebase failures have their own taxonomy in [`crate::rebase::RebaseError`].
#[derive(Debug, Error)]
pub enum Error {
    /// The GitHub API rejected or failed a request
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Generic platform failure (used by test doubles and wrappers)
    #[error("platform error: {0}")]
    Platform(String),

    /// No usable token could be found
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The config file could not be read, parsed or written
    #[error("config error: {0}")]
    Config(String),

    /// The selected profile does not exist in the config file
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// A repository argument did not name a tracked `owner/name`
    #[error("not a valid repo: {0}")]
    InvalidRepo(String),

    /// An add operation targeted something already present
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A remove operation targeted something that is not present
    #[error("{0} not found")]
    NotFound(String),

    /// A network call exceeded its deadline
    #[error("{operation} timed out after {}s", timeout.as_secs())]
    Timeout {
        /// What was being attempted
        operation: String,
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The run was interrupted
    #[error("operation cancelled")]
    Cancelled,

    /// Catch-all for invariants that should not break
    #[error("internal error: {0}")]
    Internal(String),

    /// Filesystem or process I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubApi(err.to_string())
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
