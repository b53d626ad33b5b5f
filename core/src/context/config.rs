//! Application configuration
//!
//! This module re-exports shared types from tally-types and provides
//! platform-specific defaults and persistence for AppConfig.

pub use tally_types::{AppConfig, Column, Flag, SinkSettings, TrackingFlags};

use crate::context::ConfigError;

const APP_NAME: &str = "tally";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Defaults
// ─────────────────────────────────────────────────────────────────────────────

pub fn default_log_directory() -> String {
    #[cfg(target_os = "windows")]
    {
        dirs::document_dir()
            .map(|p| p.join("My Games/Smite/BattleGame/Logs"))
            .and_then(|p| p.to_str().map(String::from))
            .unwrap_or_default()
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        dirs::home_dir()
            .map(|p| {
                p.join(".local/share/Steam/steamapps/compatdata/386360/pfx/drive_c/users/steamuser/Documents/My Games/Smite/BattleGame/Logs")
            })
            .and_then(|p| p.to_str().map(String::from))
            .unwrap_or_default()
    }
    #[cfg(target_os = "macos")]
    {
        String::new()
    }
}

/// Default location of the overlay text file: next to the user's documents
fn default_output_path() -> String {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .map(|p| p.join("tally_obs.txt"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "tally_obs.txt".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence
pub trait AppConfigExt: Sized {
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn load_with_defaults() -> Self;
    fn save(&self) -> Result<(), ConfigError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default configuration");
            Self::load_with_defaults()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        if config.log_directory.is_empty() {
            config.log_directory = default_log_directory();
        }
        Ok(config)
    }

    /// Load with platform-specific defaults (used when no config file exists)
    fn load_with_defaults() -> Self {
        let mut config = AppConfig::with_log_directory(default_log_directory());
        config.sink.output_path = default_output_path();
        config
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }
}
