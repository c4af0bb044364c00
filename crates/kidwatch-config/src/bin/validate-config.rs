//! Config validation CLI tool
//!
//! Validates a kidwatch configuration file and reports any errors.

use kidwatch_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a kidwatch configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match kidwatch_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", kidwatch_config::CURRENT_CONFIG_VERSION);
            println!("  Children: {}", policy.children.len());

            if !policy.children.is_empty() {
                println!();
                println!("Children:");
                for child in &policy.children {
                    let profile = &child.profile;
                    println!(
                        "  - {} ({}): limit {} min, {} geofence(s), {} app rule(s)",
                        profile.id,
                        profile.name,
                        profile.daily_screen_time_limit,
                        profile.geofences.len(),
                        child.app_rules.len()
                    );
                    if profile.bedtime.enabled {
                        println!("      bedtime {}", profile.bedtime.window);
                    }
                    if profile.school_hours.enabled {
                        println!("      school hours {}", profile.school_hours.window);
                    }
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                kidwatch_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                kidwatch_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                kidwatch_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                kidwatch_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        kidwatch_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
