//! Configuration parsing and validation for kidwatch
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Child profiles with screen-time limits and bedtime/school/homework schedules
//! - Geofences and per-app rules
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading configuration");
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [[children]]
            id = "alex"
            parent_id = "parent-1"
            name = "Alex"
        "#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.children.len(), 1);
        assert_eq!(policy.children[0].profile.id.as_str(), "alex");
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_times() {
        let config = r#"
            config_version = 1

            [[children]]
            id = "alex"
            parent_id = "parent-1"
            name = "Alex"
            school_hours = { start = "8am", end = "15:00" }
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            config_version = 1

            [[children]]
            id = "sam"
            parent_id = "parent-2"
            name = "Sam"
            daily_limit_minutes = 90
            "#
        )
        .unwrap();

        let policy = load_config(file.path()).unwrap();
        assert_eq!(policy.children[0].profile.daily_screen_time_limit, 90);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let result = load_config("/nonexistent/kidwatch/config.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
