mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, DisplayConfig, SyncConfig, TimerConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable pointing at an explicit data directory.
pub const HOME_ENV: &str = "SPRINTCLOCK_HOME";

/// Returns the data directory, creating it if needed.
///
/// `SPRINTCLOCK_HOME` wins when set. Otherwise `~/.config/sprintclock[-dev]/`,
/// with the `-dev` suffix when `SPRINTCLOCK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(HOME_ENV) {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("SPRINTCLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("sprintclock-dev")
            } else {
                base_dir.join("sprintclock")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
