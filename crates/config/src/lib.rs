//! Configuration loading for English Mastery clients
//!
//! Provides utilities for loading configuration files from the shared
//! config directory (~/.config/english-mastery/) and for locating the
//! local data directory that holds the offline cache.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory name used under the platform config and data roots
const APP_DIR: &str = "english-mastery";

/// Get the config directory (~/.config/english-mastery/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to a config file within the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Get the data directory (~/.local/share/english-mastery/ on Linux)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to a file within the data directory
pub fn data_path(filename: &str) -> Option<PathBuf> {
    data_dir().map(|p| p.join(filename))
}

/// Load and parse a JSON config file from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Check if a config file exists in the config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Create the directory that will hold `path`, if any
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}
