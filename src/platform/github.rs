//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    CommitStatus, Identity, PrComment, PullRequest, RemoteRepository, RepoRef, Review,
    ReviewState,
};
use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page size requested from every list endpoint
const PER_PAGE: u8 = 100;

// REST response shapes. Only the fields prp reads are declared.

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiRepository {
    name: String,
    owner: ApiUser,
    #[serde(default)]
    fork: bool,
    ssh_url: Option<String>,
    source: Option<Box<ApiRepository>>,
}

impl ApiRepository {
    fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner.login, &self.name)
    }
}

#[derive(Deserialize)]
struct ApiBranch {
    #[serde(rename = "ref")]
    ref_field: String,
    label: Option<String>,
    sha: String,
    user: Option<ApiUser>,
    repo: Option<ApiRepository>,
}

impl ApiBranch {
    fn ssh_url(&self) -> String {
        self.repo
            .as_ref()
            .and_then(|r| r.ssh_url.clone())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ApiPullRequest {
    number: u64,
    title: Option<String>,
    html_url: Option<String>,
    user: Option<ApiUser>,
    head: ApiBranch,
    base: ApiBranch,
}

#[derive(Deserialize)]
struct ApiComment {
    body: Option<String>,
    user: Option<ApiUser>,
}

#[derive(Deserialize)]
struct ApiReview {
    state: Option<String>,
    user: Option<ApiUser>,
}

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    context: Option<String>,
    state: String,
}

#[derive(Deserialize)]
struct ApiComparison {
    ahead_by: u64,
}

#[derive(Serialize)]
struct ListParams {
    per_page: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
}

impl ListParams {
    const fn all() -> Self {
        Self {
            per_page: PER_PAGE,
            state: None,
        }
    }

    const fn open() -> Self {
        Self {
            per_page: PER_PAGE,
            state: Some("open"),
        }
    }
}

/// Convert a REST pull request to our `PullRequest` type
fn pr_from_api(pr: ApiPullRequest) -> PullRequest {
    let author_login = pr
        .head
        .user
        .as_ref()
        .or(pr.user.as_ref())
        .map(|u| u.login.clone())
        .unwrap_or_default();
    let head_ssh_url = pr.head.ssh_url();
    let base_ssh_url = pr.base.ssh_url();

    PullRequest {
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        author_login,
        head_label: pr.head.label.unwrap_or_default(),
        base_label: pr.base.label.unwrap_or_default(),
        head_sha: pr.head.sha,
        head_ref: pr.head.ref_field,
        base_ref: pr.base.ref_field,
        head_ssh_url,
        base_ssh_url,
        html_url: pr.html_url.unwrap_or_default(),
    }
}

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
}

impl GitHubService {
    /// Create a new GitHub service
    ///
    /// `api_url` is only needed for GitHub Enterprise, e.g.
    /// `https://github.example.com/api/v3`.
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
        }

        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        Ok(Self { client })
    }

    /// Fetch a list endpoint and follow every `next` link
    async fn get_all<T: DeserializeOwned>(&self, route: &str, params: &ListParams) -> Result<Vec<T>> {
        let first: Page<T> = self.client.get(route, Some(params)).await?;
        let items = self.client.all_pages(first).await?;
        debug!(route, count = items.len(), "drained pages");
        Ok(items)
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn list_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>> {
        debug!(owner, repo, "listing open PRs");
        let prs: Vec<ApiPullRequest> = self
            .get_all(&format!("/repos/{owner}/{repo}/pulls"), &ListParams::open())
            .await?;
        Ok(prs.into_iter().map(pr_from_api).collect())
    }

    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        head_label: &str,
        base_label: &str,
    ) -> Result<u64> {
        debug!(owner, repo, head_label, base_label, "comparing commits");
        let comparison: ApiComparison = self
            .client
            .get(
                format!("/repos/{owner}/{repo}/compare/{head_label}...{base_label}"),
                None::<&()>,
            )
            .await?;
        Ok(comparison.ahead_by)
    }

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<PrComment>> {
        let comments: Vec<ApiComment> = self
            .get_all(
                &format!("/repos/{owner}/{repo}/issues/{number}/comments"),
                &ListParams::all(),
            )
            .await?;

        // Comments from deleted accounts have no user and can't approve
        Ok(comments
            .into_iter()
            .filter_map(|c| {
                c.user.map(|u| PrComment {
                    author: u.login,
                    body: c.body.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn list_reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>> {
        let reviews: Vec<ApiReview> = self
            .get_all(
                &format!("/repos/{owner}/{repo}/pulls/{number}/reviews"),
                &ListParams::all(),
            )
            .await?;

        Ok(reviews
            .into_iter()
            .filter_map(|r| {
                let state = ReviewState::from_api(r.state.as_deref().unwrap_or_default());
                r.user.map(|u| Review {
                    author: u.login,
                    state,
                })
            })
            .collect())
    }

    async fn list_labels(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<String>> {
        let labels: Vec<ApiLabel> = self
            .get_all(
                &format!("/repos/{owner}/{repo}/issues/{number}/labels"),
                &ListParams::all(),
            )
            .await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn list_commit_statuses(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<CommitStatus>> {
        let statuses: Vec<ApiStatus> = self
            .get_all(
                &format!("/repos/{owner}/{repo}/commits/{sha}/statuses"),
                &ListParams::all(),
            )
            .await?;
        Ok(statuses
            .into_iter()
            .map(|s| CommitStatus {
                context: s.context.unwrap_or_default(),
                state: s.state,
            })
            .collect())
    }

    async fn get_viewer(&self) -> Result<Identity> {
        let user: ApiUser = self.client.get("/user", None::<&()>).await?;
        debug!(login = %user.login, "resolved viewer");
        Ok(Identity::new(user.login))
    }

    async fn list_repositories_for_user(&self, login: &str) -> Result<Vec<RemoteRepository>> {
        let repos: Vec<ApiRepository> = self
            .get_all(&format!("/users/{login}/repos"), &ListParams::all())
            .await?;
        Ok(repos
            .into_iter()
            .map(|r| RemoteRepository {
                repo: r.repo_ref(),
                fork: r.fork,
                source: None,
            })
            .collect())
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<RemoteRepository> {
        let repo: ApiRepository = self
            .client
            .get(format!("/repos/{owner}/{name}"), None::<&()>)
            .await?;
        Ok(RemoteRepository {
            repo: repo.repo_ref(),
            fork: repo.fork,
            source: repo.source.as_ref().map(|s| s.repo_ref()),
        })
    }
}
