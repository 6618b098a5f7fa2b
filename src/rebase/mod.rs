//! Auto-rebase of pull requests in local clones
//!
//! [`RebaseOrchestrator`] rebases one PR and always leaves the clone as it
//! found it. [`RebaseCoordinator`] drives it over many PRs, one at a time
//! per clone.

mod coordinate;
mod error;
mod execute;
mod remotes;

pub use coordinate::{PathLocks, RebaseCoordinator, RebaseSummary};
pub use error::{RebaseError, RemoteKind};
pub use execute::{RebaseOrchestrator, TEMP_BRANCH_PREFIX, temp_branch_name};
pub use remotes::{Direction, RemoteEntry, find_remote, parse_remotes};
