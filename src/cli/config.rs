//! Config commands - init-config, profile and repo management

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use prp::config::{init_config, load_config, save_config};
use prp::error::{Error, Result};
use prp::platform::PlatformService;
use prp::types::{RemoteRepository, RepoRef, TrackedRepository};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::debug;

/// Create a config file with an empty default profile
pub fn run_init_config(path: &Path, force: bool) -> Result<()> {
    init_config(path, force)?;
    println!(
        "{} Wrote {}",
        check(),
        path.display().to_string().accent()
    );
    Ok(())
}

/// Add a profile
pub fn run_profile_add(
    path: &Path,
    name: &str,
    token: Option<String>,
    api_url: Option<String>,
) -> Result<()> {
    let mut config = load_config(path)?;
    config.add_profile(name, token, api_url)?;
    save_config(path, &config)?;
    println!("{} Added profile {}", check(), name.accent());
    Ok(())
}

/// Change the token and/or API URL of a profile
pub fn run_profile_update(
    path: &Path,
    name: &str,
    token: Option<String>,
    api_url: Option<String>,
) -> Result<()> {
    if token.is_none() && api_url.is_none() {
        return Err(Error::Config(
            "nothing to update; pass --token and/or --api-url".to_string(),
        ));
    }
    let mut config = load_config(path)?;
    config.profile_mut(name)?.update(token, api_url)?;
    save_config(path, &config)?;
    println!("{} Updated profile {}", check(), name.accent());
    Ok(())
}

/// A change to the tracked repositories of the selected profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoEdit {
    /// Start tracking
    Add(RepoRef),
    /// Stop tracking
    Remove(RepoRef),
    /// Hide a build context
    IgnoreBuild(RepoRef, String),
    /// Show a hidden build context again
    RemoveIgnoredBuild(RepoRef, String),
    /// Set the local clone
    SetPath(RepoRef, PathBuf),
}

/// Apply a [`RepoEdit`] and save the config
pub fn run_repo_edit(ctx: &mut CommandContext, edit: RepoEdit) -> Result<()> {
    let profile = ctx.profile_mut()?;
    let message = match &edit {
        RepoEdit::Add(repo) => {
            profile.add_repo(repo)?;
            format!("Tracking {}", repo.accent())
        }
        RepoEdit::Remove(repo) => {
            profile.remove_repo(repo)?;
            format!("Stopped tracking {}", repo.accent())
        }
        RepoEdit::IgnoreBuild(repo, context) => {
            profile.ignore_build(repo, context)?;
            format!("Ignoring {} on {}", context.accent(), repo.accent())
        }
        RepoEdit::RemoveIgnoredBuild(repo, context) => {
            profile.remove_ignored_build(repo, context)?;
            format!("No longer ignoring {} on {}", context.accent(), repo.accent())
        }
        RepoEdit::SetPath(repo, path) => {
            profile.set_path(repo, path)?;
            format!(
                "Local path for {} set to {}",
                repo.accent(),
                path.display().to_string().accent()
            )
        }
    };
    ctx.save()?;
    println!("{} {message}", check());
    Ok(())
}

/// Print `owner/name` candidates for `repo add`
///
/// Forks are listed as their upstream source. Already tracked repositories
/// are left out.
pub async fn run_repo_suggest(ctx: &CommandContext) -> Result<()> {
    let platform = ctx.platform().await?;
    let viewer = platform.get_viewer().await?;
    let owned = platform.list_repositories_for_user(&viewer.login).await?;
    let suggestions =
        suggest_repos(platform, owned, &ctx.profile()?.tracked_repos).await;
    for repo in suggestions {
        println!("{repo}");
    }
    Ok(())
}

async fn suggest_repos(
    platform: std::sync::Arc<dyn PlatformService>,
    owned: Vec<RemoteRepository>,
    tracked: &[TrackedRepository],
) -> BTreeSet<RepoRef> {
    let tracked: BTreeSet<RepoRef> = tracked.iter().map(TrackedRepository::repo_ref).collect();
    let mut suggestions = BTreeSet::new();
    let mut forks = JoinSet::new();

    for repo in owned {
        if !repo.fork {
            suggestions.insert(repo.repo);
            continue;
        }
        let platform = std::sync::Arc::clone(&platform);
        forks.spawn(async move {
            platform
                .get_repository(&repo.repo.owner, &repo.repo.name)
                .await
        });
    }

    while let Some(joined) = forks.join_next().await {
        match joined {
            Ok(Ok(full)) => suggestions.extend(full.source),
            Ok(Err(e)) => debug!("skipping fork: {e}"),
            Err(e) => debug!("fork lookup task failed: {e}"),
        }
    }

    suggestions.retain(|r| !tracked.contains(r));
    suggestions
}
