//! Persistence for the config file.

use super::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir
const PRP_DIR: &str = "prp";

/// Filename for the config file
const CONFIG_FILE: &str = "config.toml";

/// Default location: `<config dir>/prp/config.toml`.
///
/// Falls back to the current directory when the platform has no config
/// directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PRP_DIR)
        .join(CONFIG_FILE)
}

/// Load the config file.
///
/// A missing file is an error; every command needs at least one profile.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "config file not found: {} (run `prp init-config`)",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Save the config file.
///
/// Creates the parent directory if it doesn't exist.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir)
            .map_err(|e| Error::Config(format!("failed to create {}: {e}", dir.display())))?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;

    let content_with_header = format!("# prp configuration\n\n{content}");

    fs::write(path, content_with_header)
        .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))
}

/// Write a fresh config with an empty default profile.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<Config> {
    if path.exists() && !force {
        return Err(Error::AlreadyExists(format!("file {}", path.display())));
    }
    let config = Config::with_default_profile();
    save_config(path, &config)?;
    Ok(config)
}
