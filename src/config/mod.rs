//! Configuration module
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming an explicit settings file
pub const SETTINGS_PATH_ENV: &str = "MEDLINE_SETTINGS_PATH";

/// Load settings from `explicit`, the environment, or the default locations,
/// then apply environment overrides.
pub fn load(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut settings = match locate(explicit) {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };
    settings.merge_env();
    Ok(settings)
}

fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut candidates = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("medline-search/settings.yml"));
    }

    candidates.into_iter().find(|p| p.exists())
}
