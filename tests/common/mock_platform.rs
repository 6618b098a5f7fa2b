//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use prp::error::{Error, Result};
use prp::platform::PlatformService;
use prp::types::{
    CommitStatus, Identity, PrComment, PullRequest, RemoteRepository, RepoRef, Review,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Simple mock platform service for testing
///
/// Features:
/// - Configurable responses per repository, PR number or SHA
/// - Call tracking for verification
/// - Error injection for failure path testing
/// - Optional latency, with a high-water mark of calls in flight
pub struct MockPlatformService {
    viewer: Identity,
    latency: Mutex<Option<Duration>>,
    // Responses
    pull_requests: Mutex<HashMap<String, Vec<PullRequest>>>,
    ahead_by: Mutex<HashMap<String, u64>>,
    comments: Mutex<HashMap<u64, Vec<PrComment>>>,
    reviews: Mutex<HashMap<u64, Vec<Review>>>,
    labels: Mutex<HashMap<u64, Vec<String>>>,
    statuses: Mutex<HashMap<String, Vec<CommitStatus>>>,
    user_repos: Mutex<Vec<RemoteRepository>>,
    repositories: Mutex<HashMap<String, RemoteRepository>>,
    // Call tracking
    list_pr_calls: Mutex<Vec<String>>,
    compare_calls: Mutex<Vec<(String, String)>>,
    status_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    // Error injection
    failing_repos: Mutex<HashSet<String>>,
    error_on_compare: Mutex<Option<String>>,
    error_on_comments: Mutex<Option<String>>,
    error_on_reviews: Mutex<Option<String>>,
    error_on_labels: Mutex<Option<String>>,
    error_on_statuses: Mutex<Option<String>>,
}

impl MockPlatformService {
    /// Create a mock answering `get_viewer` with `viewer`
    pub fn new(viewer: &str) -> Self {
        Self {
            viewer: Identity::new(viewer),
            latency: Mutex::new(None),
            pull_requests: Mutex::new(HashMap::new()),
            ahead_by: Mutex::new(HashMap::new()),
            comments: Mutex::new(HashMap::new()),
            reviews: Mutex::new(HashMap::new()),
            labels: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            user_repos: Mutex::new(Vec::new()),
            repositories: Mutex::new(HashMap::new()),
            list_pr_calls: Mutex::new(Vec::new()),
            compare_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            failing_repos: Mutex::new(HashSet::new()),
            error_on_compare: Mutex::new(None),
            error_on_comments: Mutex::new(None),
            error_on_reviews: Mutex::new(None),
            error_on_labels: Mutex::new(None),
            error_on_statuses: Mutex::new(None),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    // === Response setup ===

    /// Open PRs of `owner/name`; unset repositories have none
    pub fn set_pull_requests(&self, repo: &str, prs: Vec<PullRequest>) {
        self.pull_requests
            .lock()
            .unwrap()
            .insert(repo.to_string(), prs);
    }

    /// Ahead-by count for a head label; unset labels are 0
    pub fn set_ahead_by(&self, head_label: &str, ahead_by: u64) {
        self.ahead_by
            .lock()
            .unwrap()
            .insert(head_label.to_string(), ahead_by);
    }

    /// Comments on PR `number`
    pub fn set_comments(&self, number: u64, comments: Vec<PrComment>) {
        self.comments.lock().unwrap().insert(number, comments);
    }

    /// Reviews on PR `number`
    pub fn set_reviews(&self, number: u64, reviews: Vec<Review>) {
        self.reviews.lock().unwrap().insert(number, reviews);
    }

    /// Labels on PR `number`
    pub fn set_labels(&self, number: u64, labels: &[&str]) {
        self.labels
            .lock()
            .unwrap()
            .insert(number, labels.iter().map(ToString::to_string).collect());
    }

    /// Statuses reported for `sha`, newest first
    pub fn set_statuses(&self, sha: &str, statuses: Vec<CommitStatus>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(sha.to_string(), statuses);
    }

    /// Repositories returned for any user
    pub fn set_user_repos(&self, repos: Vec<RemoteRepository>) {
        *self.user_repos.lock().unwrap() = repos;
    }

    /// Single-repository lookup result
    pub fn set_repository(&self, repo: RemoteRepository) {
        self.repositories
            .lock()
            .unwrap()
            .insert(repo.repo.to_string(), repo);
    }

    // === Error injection ===

    /// Make listing pull requests of `owner/name` fail
    pub fn fail_list_pull_requests(&self, repo: &str) {
        self.failing_repos.lock().unwrap().insert(repo.to_string());
    }

    /// Make `compare_commits` fail
    pub fn fail_compare(&self, msg: &str) {
        *self.error_on_compare.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_issue_comments` fail
    pub fn fail_comments(&self, msg: &str) {
        *self.error_on_comments.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_reviews` fail
    pub fn fail_reviews(&self, msg: &str) {
        *self.error_on_reviews.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_labels` fail
    pub fn fail_labels(&self, msg: &str) {
        *self.error_on_labels.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `list_commit_statuses` fail
    pub fn fail_statuses(&self, msg: &str) {
        *self.error_on_statuses.lock().unwrap() = Some(msg.to_string());
    }

    // === Call tracking ===

    /// Repositories whose pull requests were listed, as `owner/name`
    pub fn list_pr_calls(&self) -> Vec<String> {
        self.list_pr_calls.lock().unwrap().clone()
    }

    /// `(head_label, base_label)` of every comparison
    pub fn compare_calls(&self) -> Vec<(String, String)> {
        self.compare_calls.lock().unwrap().clone()
    }

    /// SHAs whose statuses were listed
    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    /// Most calls that were ever running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn injected(slot: &Mutex<Option<String>>) -> Result<()> {
    match slot.lock().unwrap().clone() {
        Some(msg) => Err(Error::Platform(msg)),
        None => Ok(()),
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn list_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>> {
        let _guard = self.enter().await;
        let key = format!("{owner}/{repo}");
        self.list_pr_calls.lock().unwrap().push(key.clone());
        if self.failing_repos.lock().unwrap().contains(&key) {
            return Err(Error::Platform(format!("listing {key} failed")));
        }
        Ok(self
            .pull_requests
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn compare_commits(
        &self,
        _owner: &str,
        _repo: &str,
        head_label: &str,
        base_label: &str,
    ) -> Result<u64> {
        let _guard = self.enter().await;
        self.compare_calls
            .lock()
            .unwrap()
            .push((head_label.to_string(), base_label.to_string()));
        injected(&self.error_on_compare)?;
        Ok(self
            .ahead_by
            .lock()
            .unwrap()
            .get(head_label)
            .copied()
            .unwrap_or(0))
    }

    async fn list_issue_comments(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<Vec<PrComment>> {
        let _guard = self.enter().await;
        injected(&self.error_on_comments)?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_reviews(&self, _owner: &str, _repo: &str, number: u64) -> Result<Vec<Review>> {
        let _guard = self.enter().await;
        injected(&self.error_on_reviews)?;
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_labels(&self, _owner: &str, _repo: &str, number: u64) -> Result<Vec<String>> {
        let _guard = self.enter().await;
        injected(&self.error_on_labels)?;
        Ok(self
            .labels
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_commit_statuses(
        &self,
        _owner: &str,
        _repo: &str,
        sha: &str,
    ) -> Result<Vec<CommitStatus>> {
        let _guard = self.enter().await;
        self.status_calls.lock().unwrap().push(sha.to_string());
        injected(&self.error_on_statuses)?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_viewer(&self) -> Result<Identity> {
        Ok(self.viewer.clone())
    }

    async fn list_repositories_for_user(&self, _login: &str) -> Result<Vec<RemoteRepository>> {
        Ok(self.user_repos.lock().unwrap().clone())
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<RemoteRepository> {
        let key = RepoRef::new(owner, name).to_string();
        self.repositories
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(Error::NotFound(key))
    }
}
