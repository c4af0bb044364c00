//! Default paths for kidwatch components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/kidwatch/config.toml` or `~/.config/kidwatch/config.toml`
//! - Data: `$XDG_DATA_HOME/kidwatch` or `~/.local/share/kidwatch`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const KIDWATCH_DATA_DIR_ENV: &str = "KIDWATCH_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "kidwatch";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "kidwatch.db";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/kidwatch/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/kidwatch/config.toml`
/// 3. `/etc/kidwatch/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the data directory without checking the `KIDWATCH_DATA_DIR` env var.
///
/// Order of precedence:
/// 1. `$XDG_DATA_HOME/kidwatch` (if XDG_DATA_HOME is set)
/// 2. `~/.local/share/kidwatch`
/// 3. `/tmp/kidwatch/data` (fallback)
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
