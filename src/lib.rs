//! prp - track open pull requests and keep your own rebased
//!
//! The library has two halves:
//!
//! - **Reporting**: [`aggregate::Aggregator`] lists the open pull requests
//!   of every tracked repository and enriches each one with approvals,
//!   build status, labels and whether it is up to date with its target.
//!   [`filter::RecordFilter`] narrows the resulting stream.
//! - **Rebasing**: [`rebase::RebaseOrchestrator`] rebases one pull request
//!   in a local clone and force-pushes it, always restoring the clone's
//!   branch and stashed changes. [`rebase::RebaseCoordinator`] runs it over
//!   many pull requests, one at a time per clone.
//!
//! GitHub access goes through [`platform::PlatformService`]; git access
//! goes through [`git::GitRunner`].

pub mod aggregate;
pub mod auth;
pub mod cancel;
pub mod config;
pub mod error;
pub mod filter;
pub mod git;
pub mod platform;
pub mod rebase;
pub mod report;
pub mod types;

pub use error::{Error, Result};
