//! Authentication for GitHub
//!
//! Supports a token stored in the profile, environment variables and the
//! `gh` CLI, tried in that order.

use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in order
const TOKEN_ENV_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token stored in the config profile
    Profile,
    /// Token from environment variable
    EnvVar,
    /// Token from CLI tool (gh)
    Cli,
}

/// A resolved GitHub token
#[derive(Debug, Clone)]
pub struct GitHubAuthConfig {
    /// The token value
    pub token: String,
    /// Where it came from
    pub source: AuthSource,
}

/// Resolve a GitHub token
///
/// A non-empty `profile_token` wins; otherwise `GH_TOKEN`, then
/// `GITHUB_TOKEN`, then `gh auth token`.
pub async fn get_github_auth(profile_token: Option<&str>) -> Result<GitHubAuthConfig> {
    if let Some(token) = profile_token.map(str::trim).filter(|t| !t.is_empty()) {
        debug!("using token from profile");
        return Ok(GitHubAuthConfig {
            token: token.to_string(),
            source: AuthSource::Profile,
        });
    }

    for var in TOKEN_ENV_VARS {
        if let Ok(token) = std::env::var(var)
            && !token.trim().is_empty()
        {
            debug!(var, "using token from environment");
            return Ok(GitHubAuthConfig {
                token: token.trim().to_string(),
                source: AuthSource::EnvVar,
            });
        }
    }

    if let Some(token) = gh_cli_token().await {
        debug!("using token from gh CLI");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::Cli,
        });
    }

    Err(Error::Auth(
        "no token in profile, GH_TOKEN/GITHUB_TOKEN unset, and `gh auth token` failed"
            .to_string(),
    ))
}

async fn gh_cli_token() -> Option<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
