//! Platform service construction from a config profile

use crate::auth::get_github_auth;
use crate::config::Profile;
use crate::error::Result;
use crate::platform::{GitHubService, PlatformService};
use std::sync::Arc;
use tracing::debug;

/// Create the platform service for a profile
///
/// Resolves the token (profile, environment, then `gh`) and honours the
/// profile's Enterprise API URL.
pub async fn create_platform_service(profile: &Profile) -> Result<Arc<dyn PlatformService>> {
    let auth = get_github_auth(profile.token.as_deref()).await?;
    debug!(source = ?auth.source, api_url = ?profile.api_url, "creating GitHub service");
    let service = GitHubService::new(&auth.token, profile.api_url.as_deref())?;
    Ok(Arc::new(service))
}
