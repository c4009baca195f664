//! Command-line interface for voxcmd
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Record, clean up and replay named voice commands
#[derive(Parser, Debug)]
#[command(
    name = "voxcmd",
    version,
    about = "Record, clean up and replay named voice commands"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command store file (overrides config and VOXCMD_STORE)
    #[arg(long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,
}

/// Parse a duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`5s`, `1500ms`), and compound (`1m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    let duration = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a command from the microphone (Ctrl-C stops early)
    Record {
        /// Command name
        name: String,

        /// Maximum recording length. Examples: 5s, 1500ms, 1m
        #[arg(long, short = 'd', value_name = "DURATION", default_value = "5s", value_parser = parse_duration)]
        duration: Duration,

        /// Audio input device (e.g., hw:0)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Add a command from an audio file (wav, mp3, ogg, flac, aac, m4a)
    Add {
        /// Command name
        name: String,

        /// Audio file to import
        file: PathBuf,
    },

    /// Remove a command
    Remove {
        /// Command name
        name: String,
    },

    /// List registered commands
    List,

    /// Play a command on the default output device
    Play {
        /// Command name
        name: String,
    },

    /// Write a command's encoded audio to a WAV file
    Export {
        /// Command name
        name: String,

        /// Output path
        output: PathBuf,
    },

    /// Show the header of a WAV file
    Info {
        /// WAV file to inspect
        file: PathBuf,
    },

    /// List available audio input devices
    Devices,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration as TOML
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["voxcmd"]).is_err());
    }

    #[test]
    fn test_parse_record_defaults() {
        let cli = Cli::try_parse_from(["voxcmd", "record", "lights on"]).unwrap();
        match cli.command {
            Commands::Record {
                name,
                duration,
                device,
            } => {
                assert_eq!(name, "lights on");
                assert_eq!(duration, Duration::from_secs(5));
                assert!(device.is_none());
            }
            other => panic!("Expected Record, got {:?}", other),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
        assert!(cli.store.is_none());
    }

    #[test]
    fn test_parse_record_with_duration() {
        let cli =
            Cli::try_parse_from(["voxcmd", "record", "stop", "--duration", "1500ms"]).unwrap();
        match cli.command {
            Commands::Record { duration, .. } => {
                assert_eq!(duration, Duration::from_millis(1500));
            }
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_record_bare_seconds() {
        let cli = Cli::try_parse_from(["voxcmd", "record", "stop", "-d", "3"]).unwrap();
        match cli.command {
            Commands::Record { duration, .. } => assert_eq!(duration, Duration::from_secs(3)),
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_record_rejects_bad_duration() {
        assert!(Cli::try_parse_from(["voxcmd", "record", "x", "--duration", "soon"]).is_err());
        assert!(Cli::try_parse_from(["voxcmd", "record", "x", "--duration", "0ms"]).is_err());
    }

    #[test]
    fn test_parse_record_rejects_zero_bare_seconds() {
        assert!(Cli::try_parse_from(["voxcmd", "record", "x", "-d", "0"]).is_err());
        assert_eq!(
            parse_duration(" 0 ").unwrap_err(),
            "duration must be greater than zero"
        );
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from(["voxcmd", "add", "open door", "door.wav"]).unwrap();
        match cli.command {
            Commands::Add { name, file } => {
                assert_eq!(name, "open door");
                assert_eq!(file, PathBuf::from("door.wav"));
            }
            other => panic!("Expected Add, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_export() {
        let cli = Cli::try_parse_from(["voxcmd", "export", "hi", "/tmp/hi.wav"]).unwrap();
        assert!(matches!(cli.command, Commands::Export { .. }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "voxcmd",
            "list",
            "-vv",
            "--store",
            "/tmp/commands.json",
            "--config",
            "/tmp/config.toml",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::List));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/commands.json")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
    }

    #[test]
    fn test_parse_config_actions() {
        let cli = Cli::try_parse_from(["voxcmd", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
        let cli = Cli::try_parse_from(["voxcmd", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["voxcmd", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
