//! Profiles, tracked repositories and runtime limits
//!
//! The config file holds named profiles. Each profile has its own token,
//! optional Enterprise API URL and list of tracked repositories.

mod storage;

pub use storage::{default_config_path, init_config, load_config, save_config};

use crate::error::{Error, Result};
use crate::types::{RepoRef, TrackedRepository};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Name of the profile used when none is given
pub const DEFAULT_PROFILE: &str = "default";

/// Top-level config file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Runtime limits shared by every profile
    #[serde(default)]
    pub limits: Limits,
    /// Profiles by name
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

/// One GitHub account and the repositories it tracks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// API base URL for GitHub Enterprise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Repositories whose pull requests are reported
    #[serde(default)]
    pub tracked_repos: Vec<TrackedRepository>,
}

/// Timeouts and concurrency caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Deadline for each GitHub API call
    pub request_timeout_secs: u64,
    /// Deadline for each git invocation
    pub git_timeout_secs: u64,
    /// Maximum in-flight GitHub API calls
    pub max_concurrent_requests: usize,
    /// Maximum pull requests rebased at once (always one per clone)
    pub max_concurrent_rebases: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            git_timeout_secs: 300,
            max_concurrent_requests: 16,
            max_concurrent_rebases: 4,
        }
    }
}

impl Limits {
    /// Per-request deadline
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Per-git-command deadline
    pub const fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}

impl Config {
    /// Config containing a single empty default profile
    pub fn with_default_profile() -> Self {
        let mut config = Self::default();
        config
            .profiles
            .insert(DEFAULT_PROFILE.to_string(), Profile::default());
        config
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| Error::InvalidProfile(name.to_string()))
    }

    /// Look up a profile by name for editing
    pub fn profile_mut(&mut self, name: &str) -> Result<&mut Profile> {
        self.profiles
            .get_mut(name)
            .ok_or_else(|| Error::InvalidProfile(name.to_string()))
    }

    /// Add a new profile
    pub fn add_profile(
        &mut self,
        name: &str,
        token: Option<String>,
        api_url: Option<String>,
    ) -> Result<()> {
        if self.profiles.contains_key(name) {
            return Err(Error::AlreadyExists(format!("profile {name}")));
        }
        let mut profile = Profile::default();
        profile.update(token, api_url)?;
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }
}

impl Profile {
    /// Replace the token and/or API URL; `None` leaves a value unchanged
    pub fn update(&mut self, token: Option<String>, api_url: Option<String>) -> Result<()> {
        if let Some(api_url) = api_url {
            url::Url::parse(&api_url)
                .map_err(|e| Error::Config(format!("invalid API URL {api_url}: {e}")))?;
            self.api_url = Some(api_url);
        }
        if let Some(token) = token {
            self.token = Some(token);
        }
        Ok(())
    }

    /// Find a tracked repository
    pub fn repo(&self, repo: &RepoRef) -> Result<&TrackedRepository> {
        self.tracked_repos
            .iter()
            .find(|r| r.owner == repo.owner && r.name == repo.name)
            .ok_or_else(|| Error::InvalidRepo(repo.to_string()))
    }

    fn repo_mut(&mut self, repo: &RepoRef) -> Result<&mut TrackedRepository> {
        self.tracked_repos
            .iter_mut()
            .find(|r| r.owner == repo.owner && r.name == repo.name)
            .ok_or_else(|| Error::InvalidRepo(repo.to_string()))
    }

    /// Start tracking a repository
    pub fn add_repo(&mut self, repo: &RepoRef) -> Result<()> {
        if self.repo(repo).is_ok() {
            return Err(Error::AlreadyExists(format!("tracked repo {repo}")));
        }
        self.tracked_repos
            .push(TrackedRepository::new(&repo.owner, &repo.name));
        Ok(())
    }

    /// Stop tracking a repository
    pub fn remove_repo(&mut self, repo: &RepoRef) -> Result<()> {
        let before = self.tracked_repos.len();
        self.tracked_repos
            .retain(|r| !(r.owner == repo.owner && r.name == repo.name));
        if self.tracked_repos.len() == before {
            return Err(Error::InvalidRepo(repo.to_string()));
        }
        Ok(())
    }

    /// Hide a build context from a repository's status column
    pub fn ignore_build(&mut self, repo: &RepoRef, context: &str) -> Result<()> {
        let tracked = self.repo_mut(repo)?;
        if !tracked.ignored_build_contexts.insert(context.to_string()) {
            return Err(Error::AlreadyExists(format!(
                "ignored build {context} on {repo}"
            )));
        }
        Ok(())
    }

    /// Show a previously ignored build context again
    pub fn remove_ignored_build(&mut self, repo: &RepoRef, context: &str) -> Result<()> {
        let tracked = self.repo_mut(repo)?;
        if !tracked.ignored_build_contexts.remove(context) {
            return Err(Error::NotFound(format!("ignored build {context} on {repo}")));
        }
        Ok(())
    }

    /// Set the local clone used by auto-rebase
    ///
    /// The path must exist and contain `.git`; it is stored canonicalised.
    pub fn set_path(&mut self, repo: &RepoRef, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "path does not exist: {}",
                path.display()
            )));
        }
        if !path.join(".git").exists() {
            return Err(Error::Config(format!(
                "path is not a git repo: {}",
                path.display()
            )));
        }
        let canonical = path.canonicalize()?;
        self.repo_mut(repo)?.local_path = Some(canonical);
        Ok(())
    }
}
