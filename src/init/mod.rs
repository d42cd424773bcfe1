//! Project scaffolding for `phaseguard init`.
//!
//! Creates the configuration directory and a default configuration file:
//!
//! ```text
//! .phaseguard/
//! └── phaseguard.toml   # Defaults, written only if missing
//! ```
//!
//! The artifact output directory is created lazily when a session starts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::settings::{CONFIG_DIR, CONFIG_FILE, PhaseguardToml};

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    /// False when the directory already existed
    pub created: bool,
    /// True when a new config file was written
    pub wrote_config: bool,
}

/// Initialize phaseguard in `project_dir`.
///
/// Running it twice is safe: an existing config file is never overwritten.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let config_dir = get_config_dir(project_dir);
    let created = !config_dir.exists();
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory: {}", config_dir.display()))?;

    let config_file = config_dir.join(CONFIG_FILE);
    let wrote_config = if config_file.exists() {
        false
    } else {
        PhaseguardToml::default().save(&config_file)?;
        true
    };

    Ok(InitResult {
        config_dir,
        config_file,
        created,
        wrote_config,
    })
}

pub fn is_initialized(project_dir: &Path) -> bool {
    get_config_dir(project_dir).join(CONFIG_FILE).exists()
}

pub fn get_config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR)
}
