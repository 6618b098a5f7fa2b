//! Shared command context for CLI commands
//!
//! Loads the config file and selects the profile every command works on.

use prp::config::{Config, Profile, load_config, save_config};
use prp::error::Result;
use prp::platform::{PlatformService, create_platform_service};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded config plus the selected profile name
pub struct CommandContext {
    /// Where the config was loaded from
    pub config_path: PathBuf,
    /// The whole config file
    pub config: Config,
    /// Name of the profile selected with `--profile`
    pub profile_name: String,
}

impl CommandContext {
    /// Load the config and check that the profile exists
    pub fn load(config_path: &Path, profile_name: &str) -> Result<Self> {
        let config = load_config(config_path)?;
        config.profile(profile_name)?;
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            profile_name: profile_name.to_string(),
        })
    }

    /// The selected profile
    pub fn profile(&self) -> Result<&Profile> {
        self.config.profile(&self.profile_name)
    }

    /// The selected profile, for editing
    pub fn profile_mut(&mut self) -> Result<&mut Profile> {
        self.config.profile_mut(&self.profile_name)
    }

    /// Write the config back to where it came from
    pub fn save(&self) -> Result<()> {
        save_config(&self.config_path, &self.config)
    }

    /// GitHub client for the selected profile
    pub async fn platform(&self) -> Result<Arc<dyn PlatformService>> {
        create_platform_service(self.profile()?).await
    }
}
