//! Configuration management for retouch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "retouch";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "history.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "RETOUCH_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RETOUCH_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/retouch/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// History storage configuration.
    pub storage: StorageConfig,
    /// Selection acquisition configuration.
    pub acquisition: AcquisitionConfig,
    /// Replacement configuration.
    pub replacement: ReplacementConfig,
    /// Transformer backend configuration.
    pub transformer: TransformerConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/retouch/history.db`
    pub database_path: Option<PathBuf>,
    /// Maximum number of operation records to retain.
    /// Set to 0 for unlimited.
    pub max_records: usize,
    /// Maximum age of operation records in days.
    /// Set to 0 for unlimited.
    pub max_age_days: u32,
}

/// How the selection is read from the focused application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Interval between clipboard change-counter polls.
    pub poll_interval_ms: u64,
    /// How long to wait for the copy shortcut to land on the clipboard.
    pub timeout_ms: u64,
    /// Delay after a detected change before reading the clipboard.
    pub grace_delay_ms: u64,
    /// Restore the user's clipboard after a clipboard-based operation.
    pub restore_clipboard: bool,
    /// Applications whose selection is always read through the clipboard.
    /// Matched case-insensitively as a substring of the application name.
    pub clipboard_first_apps: Vec<String>,
}

/// How results are written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementConfig {
    /// Delay between writing the clipboard and sending paste.
    pub paste_settle_delay_ms: u64,
    /// Delay after paste before the saved clipboard is restored.
    pub restore_delay_ms: u64,
    /// Applications where direct writes are never attempted.
    /// Matched case-insensitively as a substring of the application name.
    pub direct_write_blocklist: Vec<String>,
}

/// The external program that performs corrections and translations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Program to run. Operations are refused while unset.
    pub command: Option<String>,
    /// Extra arguments passed to the program.
    pub args: Vec<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum selection length in characters.
    pub max_text_length: usize,
    /// Target language for translations.
    pub target_language: String,
    /// Whether the user agreed to send selected text to the transformer.
    pub consent_granted: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            max_records: 5_000,
            max_age_days: 90,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            timeout_ms: 1_500,
            grace_delay_ms: 60,
            restore_clipboard: true,
            clipboard_first_apps: default_clipboard_first_apps(),
        }
    }
}

impl Default for ReplacementConfig {
    fn default() -> Self {
        Self {
            paste_settle_delay_ms: 60,
            restore_delay_ms: 250,
            direct_write_blocklist: default_direct_write_blocklist(),
        }
    }
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: 30,
            max_text_length: 10_000,
            target_language: "English".to_string(),
            consent_granted: false,
        }
    }
}

/// Electron-based apps that report a selection over accessibility but hand
/// back stale or partial text.
fn default_clipboard_first_apps() -> Vec<String> {
    [
        "Visual Studio Code",
        "Slack",
        "Discord",
        "Notion",
        "Obsidian",
        "Figma",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Apps that accept an accessibility write but do not update their document.
fn default_direct_write_blocklist() -> Vec<String> {
    [
        "Visual Studio Code",
        "Slack",
        "Discord",
        "Microsoft Word",
        "Google Chrome",
        "Firefox",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Whether `app` appears in `list`, ignoring case.
pub(crate) fn app_listed(list: &[String], app: &str) -> bool {
    let app = app.to_lowercase();
    list.iter()
        .any(|entry| !entry.is_empty() && app.contains(&entry.to_lowercase()))
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `RETOUCH_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let acquisition = &self.acquisition;
        if acquisition.poll_interval_ms == 0 {
            return Err(validation("poll_interval_ms must be greater than 0"));
        }

        if acquisition.timeout_ms < acquisition.poll_interval_ms {
            return Err(Error::ConfigValidation {
                message: format!(
                    "timeout_ms ({}) cannot be less than poll_interval_ms ({})",
                    acquisition.timeout_ms, acquisition.poll_interval_ms
                ),
            });
        }

        let transformer = &self.transformer;
        if transformer.timeout_secs == 0 {
            return Err(validation("timeout_secs must be greater than 0"));
        }

        if transformer.max_text_length == 0 {
            return Err(validation("max_text_length must be greater than 0"));
        }

        if transformer.target_language.trim().is_empty() {
            return Err(validation("target_language must not be empty"));
        }

        if transformer
            .command
            .as_deref()
            .is_some_and(|command| command.trim().is_empty())
        {
            return Err(validation("transformer command must not be empty when set"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the max age as a Duration.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        if self.storage.max_age_days == 0 {
            None
        } else {
            Some(Duration::from_secs(
                u64::from(self.storage.max_age_days) * 24 * 60 * 60,
            ))
        }
    }

    /// Get the transformer request timeout.
    #[must_use]
    pub fn transform_timeout(&self) -> Duration {
        Duration::from_secs(self.transformer.timeout_secs)
    }
}

fn validation(message: &str) -> Error {
    Error::ConfigValidation {
        message: message.to_string(),
    }
}

impl AcquisitionConfig {
    /// Poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Copy timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Grace delay as a Duration.
    #[must_use]
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    /// Whether `app` should skip the direct read.
    #[must_use]
    pub fn is_clipboard_first(&self, app: &str) -> bool {
        app_listed(&self.clipboard_first_apps, app)
    }
}

impl ReplacementConfig {
    /// Paste settle delay as a Duration.
    #[must_use]
    pub fn paste_settle_delay(&self) -> Duration {
        Duration::from_millis(self.paste_settle_delay_ms)
    }

    /// Restore delay as a Duration.
    #[must_use]
    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }

    /// Whether direct writes are disabled for `app`.
    #[must_use]
    pub fn is_write_blocked(&self, app: &str) -> bool {
        app_listed(&self.direct_write_blocklist, app)
    }
}
