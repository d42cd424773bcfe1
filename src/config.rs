use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::WorkflowError;
use crate::settings::Settings;
use crate::workflow_config::OutputPreferences;

/// Runtime configuration for phaseguard.
///
/// Bridges the layered [`Settings`] with what a running server needs: the
/// project directory and an absolute output directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub verbose: bool,
    settings: Settings,
}

impl Config {
    pub fn new(project_dir: PathBuf, output_dir: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let settings = Settings::with_cli_args(project_dir, output_dir)
            .context("Failed to load phaseguard settings")?;
        Ok(Self::from_settings(settings, verbose))
    }

    pub fn from_settings(settings: Settings, verbose: bool) -> Self {
        let output_dir = resolve_output_dir(&settings.project_dir, &settings.output_dir());
        Self {
            project_dir: settings.project_dir.clone(),
            output_dir,
            verbose,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create the output directory and prove it is writable.
    pub fn ensure_output_dir(&self) -> Result<(), WorkflowError> {
        check_writable(&self.output_dir)
    }

    /// Output preferences for artifacts written under `artifact_dir`.
    pub fn output_preferences(&self, artifact_dir: PathBuf) -> OutputPreferences {
        let output = &self.settings.toml.output;
        let mut prefs = OutputPreferences::new(artifact_dir);
        prefs.formats = output.formats.clone();
        prefs.date_stamp = output.date_stamp;
        prefs.require_expected_files = output.require_expected_files;
        prefs
    }
}

/// Absolute form of `dir`, relative to `base` unless already absolute.
pub fn resolve_output_dir(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}

/// Create `dir` if needed and check that a file can be written in it.
pub fn check_writable(dir: &Path) -> Result<(), WorkflowError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        WorkflowError::Configuration(format!(
            "Cannot create output directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let marker = dir.join(".phaseguard-write-test");
    std::fs::write(&marker, b"ok").map_err(|e| {
        WorkflowError::Configuration(format!(
            "Output directory {} is not writable: {}",
            dir.display(),
            e
        ))
    })?;
    if let Err(e) = std::fs::remove_file(&marker) {
        debug!(path = %marker.display(), error = %e, "Write check marker not removed");
    }
    Ok(())
}
