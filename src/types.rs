//! Core types for prp

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Identity of a repository on the code-hosting platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    /// User or organization owning the repository
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Create a reference from its two parts
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(Error::InvalidRepo(s.to_string())),
        }
    }
}

/// A repository whose pull requests are tracked
///
/// Read-only to the aggregation and rebase pipeline; edited through the
/// config commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRepository {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Local clone used by auto-rebase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Build contexts excluded from the status column
    #[serde(default, rename = "ignored_builds")]
    pub ignored_build_contexts: BTreeSet<String>,
}

impl TrackedRepository {
    /// Track a repository with no local path and no ignored builds
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            local_path: None,
            ignored_build_contexts: BTreeSet::new(),
        }
    }

    /// The `(owner, name)` identity
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.name)
    }
}

/// An open pull request as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Login of the head user (the fork owner)
    pub author_login: String,
    /// Head branch name
    pub head_ref: String,
    /// Target branch name
    pub base_ref: String,
    /// `user:branch` label of the head
    pub head_label: String,
    /// `user:branch` label of the base
    pub base_label: String,
    /// Head commit SHA
    pub head_sha: String,
    /// SSH clone URL of the head repository (empty if the fork is gone)
    pub head_ssh_url: String,
    /// SSH clone URL of the base repository
    pub base_ssh_url: String,
    /// Web URL for the PR
    pub html_url: String,
}

/// A conversation comment on a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrComment {
    /// Login of the comment author
    pub author: String,
    /// Comment body text
    pub body: String,
}

/// State of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Review approved the changes
    Approved,
    /// Review requested changes
    ChangesRequested,
    /// Review only left comments
    Commented,
    /// Review was dismissed
    Dismissed,
    /// Review not yet submitted, or a state this tool doesn't know
    Pending,
}

impl ReviewState {
    /// Parse the platform's upper-case review state
    pub fn from_api(state: &str) -> Self {
        match state {
            "APPROVED" => Self::Approved,
            "CHANGES_REQUESTED" => Self::ChangesRequested,
            "COMMENTED" => Self::Commented,
            "DISMISSED" => Self::Dismissed,
            _ => Self::Pending,
        }
    }
}

/// A submitted pull request review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// Login of the reviewer
    pub author: String,
    /// Review state
    pub state: ReviewState,
}

/// One commit status entry for a build context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    /// Build context name (e.g. `ci/jenkins`)
    pub context: String,
    /// Raw state: `success`, `pending`, `failure` or `error`
    pub state: String,
}

impl CommitStatus {
    /// Whether this entry reports success
    pub fn is_success(&self) -> bool {
        self.state == "success"
    }
}

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Login name
    pub login: String,
}

impl Identity {
    /// Wrap a login
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }
}

/// A repository as returned by the platform's repository endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    /// Owner and name
    pub repo: RepoRef,
    /// Whether the repository is a fork
    pub fork: bool,
    /// The upstream of a fork, only present on single-repository lookups
    pub source: Option<RepoRef>,
}

/// A pull request enriched with review, rebase and build information
///
/// Built once per pull request per run and never mutated after the
/// aggregator emits it (apart from the presenter hint `visible`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRecord {
    /// Repository the PR targets
    pub repo: RepoRef,
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Login of the head user
    pub author_login: String,
    /// Head branch name
    pub head_branch: String,
    /// Target branch name
    pub target_branch: String,
    /// `user:branch` label of the head
    pub head_compare_label: String,
    /// `user:branch` label of the base
    pub base_compare_label: String,
    /// Head commit SHA
    pub head_commit_sha: String,
    /// SSH URL of the fork the PR comes from
    pub head_remote_url: String,
    /// SSH URL of the repository the PR targets
    pub base_remote_url: String,
    /// Web URL for the PR
    pub html_url: String,
    /// Number of distinct approving identities
    pub approval_count: usize,
    /// True iff the target branch was zero commits ahead at enrichment time
    pub is_rebased: bool,
    /// True until the viewer approves (false for the viewer's own PRs)
    pub needs_viewer_approval: bool,
    /// Build context to pass/fail, ignored contexts excluded
    pub build_status_by_context: BTreeMap<String, bool>,
    /// Labels in platform order, without duplicates
    pub labels: Vec<String>,
    /// Presenter hint, cleared when `parse --show-hidden` keeps a filtered record
    pub visible: bool,
}

impl PullRequestRecord {
    /// Create a record with every enrichment field at its zero value
    pub fn from_pull_request(repo: RepoRef, pr: PullRequest, viewer: &Identity) -> Self {
        let needs_viewer_approval = pr.author_login != viewer.login;
        Self {
            repo,
            number: pr.number,
            title: pr.title,
            author_login: pr.author_login,
            head_branch: pr.head_ref,
            target_branch: pr.base_ref,
            head_compare_label: pr.head_label,
            base_compare_label: pr.base_label,
            head_commit_sha: pr.head_sha,
            head_remote_url: pr.head_ssh_url,
            base_remote_url: pr.base_ssh_url,
            html_url: pr.html_url,
            approval_count: 0,
            is_rebased: false,
            needs_viewer_approval,
            build_status_by_context: BTreeMap::new(),
            labels: Vec::new(),
            visible: true,
        }
    }
}
