//! Config validation CLI tool
//!
//! Validates a focusd configuration file and reports any errors.

use focus_api::Preset;
use focus_util::{default_config_path, format_countdown};
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
            eprintln!("Validates a focusd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match focus_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", focus_config::CURRENT_CONFIG_VERSION);
            println!("  User: {}", settings.user.id());
            println!("  Default preset: {}", settings.default_preset);
            println!();
            println!("Presets:");
            for preset in &settings.presets {
                println!("  - {}", describe_preset(preset));
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                focus_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                focus_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                focus_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                focus_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        focus_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

/// One summary line per preset. Lengths are exact (MM:SS), not whole minutes.
fn describe_preset(preset: &Preset) -> String {
    format!(
        "{} ({}): work {}, short break {}, long break {}, long break every {}{}",
        preset.id,
        preset.name,
        format_countdown(preset.work_length),
        format_countdown(preset.short_break_length),
        format_countdown(preset.long_break_length),
        preset.sessions_until_long_break,
        if preset.is_reserved() { " [built-in]" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_util::PresetId;

    #[test]
    fn test_describe_keeps_partial_minutes() {
        let preset = Preset {
            id: PresetId::new("odd"),
            name: "Odd".into(),
            work_length: 90,
            short_break_length: 30,
            long_break_length: 600,
            sessions_until_long_break: 2,
            auto_start_breaks: false,
            auto_start_work: false,
        };

        assert_eq!(
            describe_preset(&preset),
            "odd (Odd): work 01:30, short break 00:30, long break 10:00, long break every 2"
        );
        assert!(describe_preset(&Preset::classic()).ends_with("[built-in]"));
    }
}
