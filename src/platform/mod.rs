//! Platform service for GitHub
//!
//! Provides the remote data source the aggregator and the repo commands
//! read from. Pagination is always drained inside the implementation.

mod factory;
mod github;

pub use factory::create_platform_service;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{CommitStatus, Identity, PrComment, PullRequest, RemoteRepository, Review};
use async_trait::async_trait;

/// Platform service trait for pull request data
///
/// Every list method returns the complete result set; callers never see
/// pages.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// List all open pull requests of a repository
    async fn list_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>>;

    /// Number of commits `base_label` has that `head_label` lacks
    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        head_label: &str,
        base_label: &str,
    ) -> Result<u64>;

    /// List conversation comments on a PR
    async fn list_issue_comments(&self, owner: &str, repo: &str, number: u64)
    -> Result<Vec<PrComment>>;

    /// List submitted reviews on a PR
    async fn list_reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>>;

    /// List label names on a PR
    async fn list_labels(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<String>>;

    /// List commit statuses for a SHA, newest first
    async fn list_commit_statuses(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<CommitStatus>>;

    /// Get the authenticated user
    async fn get_viewer(&self) -> Result<Identity>;

    /// List repositories of a user
    async fn list_repositories_for_user(&self, login: &str) -> Result<Vec<RemoteRepository>>;

    /// Get a single repository, including the `source` of a fork
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RemoteRepository>;
}
