//! Configuration loading for the tracker
//!
//! Settings are layered, later layers overriding earlier ones:
//! 1. Built-in defaults
//! 2. JSON file (`tracker.json` in the config directory)
//! 3. Runtime environment variables (`TRACKER_*`)
//! 4. Compile-time embedded API base URL (for production builds)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config filename in the application config directory
const CONFIG_FILE: &str = "tracker.json";
/// Database filename in the application data directory
const DATABASE_FILE: &str = "tracker.db";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_NAMESPACE: &str = "em";

/// Runtime settings for a [`Tracker`](crate::Tracker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Backend API root
    pub api_base_url: String,
    /// Cache namespace; separates data of independent tracker instances
    pub namespace: String,
    pub request_timeout_secs: u64,
    /// Minimum seconds between automatic queue drains
    pub sync_cooldown_secs: u64,
    /// Dead-letter a queued mutation after this many failures; unset blocks
    pub max_sync_attempts: Option<u32>,
    /// SQLite database location; defaults to the data directory
    pub database_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            request_timeout_secs: 15,
            sync_cooldown_secs: 30,
            max_sync_attempts: None,
            database_path: None,
        }
    }
}

/// On-disk shape; every field optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    namespace: Option<String>,
    request_timeout_secs: Option<u64>,
    sync_cooldown_secs: Option<u64>,
    max_sync_attempts: Option<u32>,
    database_path: Option<PathBuf>,
}

impl TrackerConfig {
    /// Load settings from all layers and validate the result
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if config::config_exists(CONFIG_FILE) {
            let file: ConfigFile = config::load_json(CONFIG_FILE)?;
            config.apply_file(file);
        }

        config.apply_env(|name| std::env::var(name).ok())?;

        if let Some(url) = Self::compile_time_base_url() {
            config.api_base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load settings from a specific JSON file over the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: ConfigFile = config::load_json_file(path)?;
        let mut config = Self::default();
        config.apply_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from a JSON string over the defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json).context("Failed to parse config JSON")?;
        let mut config = Self::default();
        config.apply_file(file);
        config.validate()?;
        Ok(config)
    }

    /// API base URL embedded at build time.
    /// Build with: TRACKER_API_BASE_URL=https://... cargo build --release
    pub fn compile_time_base_url() -> Option<String> {
        option_env!("TRACKER_API_BASE_URL")
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("API base URL must be http or https, got {}", url.scheme());
        }
        if self.namespace.trim().is_empty() {
            bail!("Cache namespace must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        if self.max_sync_attempts == Some(0) {
            bail!("max_sync_attempts must be at least 1 when set");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved database location
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| config::data_path(DATABASE_FILE))
    }

    /// Default config file path (~/.config/english-mastery/tracker.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.api_base_url {
            self.api_base_url = url;
        }
        if let Some(namespace) = file.namespace {
            self.namespace = namespace;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = file.sync_cooldown_secs {
            self.sync_cooldown_secs = secs;
        }
        if file.max_sync_attempts.is_some() {
            self.max_sync_attempts = file.max_sync_attempts;
        }
        if file.database_path.is_some() {
            self.database_path = file.database_path;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("TRACKER_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(namespace) = var("TRACKER_NAMESPACE") {
            self.namespace = namespace;
        }
        if let Some(secs) = var("TRACKER_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .parse()
                .context("TRACKER_REQUEST_TIMEOUT_SECS must be an integer")?;
        }
        if let Some(secs) = var("TRACKER_SYNC_COOLDOWN_SECS") {
            self.sync_cooldown_secs = secs
                .parse()
                .context("TRACKER_SYNC_COOLDOWN_SECS must be an integer")?;
        }
        if let Some(attempts) = var("TRACKER_MAX_SYNC_ATTEMPTS") {
            self.max_sync_attempts = Some(
                attempts
                    .parse()
                    .context("TRACKER_MAX_SYNC_ATTEMPTS must be an integer")?,
            );
        }
        if let Some(path) = var("TRACKER_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}
