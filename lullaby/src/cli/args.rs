//! CLI argument definitions
//!
//! All Clap derive structs for `Lullaby` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Sleep timer that fades your audio out and pauses it.
#[derive(Parser, Debug)]
#[command(name = "lullaby", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "LULLABY_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "LULLABY_LOG_FORMAT")]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sleep timer against an in-memory player.
    ///
    /// Reads commands from stdin, one per line: shake, cancel, restart,
    /// pause, play, status, quit. Exits once the timer is idle again.
    Run(RunArgs),

    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run / Validate
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "LULLABY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sleep duration (e.g. `20m`, `1h 30m`).
    #[arg(short, long, env = "LULLABY_DURATION", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Length of the trailing fade (`0s` disables fading).
    #[arg(long, env = "LULLABY_FADE_OUT", value_parser = humantime::parse_duration)]
    pub fade_out: Option<Duration>,

    /// How long a shake still restarts the timer after expiry (`0s` disables).
    #[arg(long, env = "LULLABY_SHAKE_WINDOW", value_parser = humantime::parse_duration)]
    pub shake_window: Option<Duration>,

    /// Write JSONL timer events to this file.
    #[arg(long, env = "LULLABY_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "LULLABY_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_without_arguments() {
        let cli = Cli::try_parse_from(["lullaby", "run"]);
        assert!(cli.is_ok(), "Failed to parse: {cli:?}");
    }

    #[test]
    fn test_run_parses_human_durations() {
        let cli = Cli::try_parse_from([
            "lullaby",
            "run",
            "--duration",
            "1h 30m",
            "--fade-out",
            "15s",
            "--shake-window",
            "0s",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("Expected RunArgs");
        };
        assert_eq!(args.duration, Some(Duration::from_secs(5400)));
        assert_eq!(args.fade_out, Some(Duration::from_secs(15)));
        assert_eq!(args.shake_window, Some(Duration::ZERO));
    }

    #[test]
    fn test_run_rejects_bad_duration() {
        let cli = Cli::try_parse_from(["lullaby", "run", "--duration", "soon"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_validate_requires_files() {
        let cli = Cli::try_parse_from(["lullaby", "validate"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_validate_json_strict() {
        let cli = Cli::try_parse_from([
            "lullaby", "validate", "a.yaml", "b.yaml", "--format", "json", "--strict",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("Expected ValidateArgs");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.strict);
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["lullaby", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["lullaby", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["lullaby", "-vvv", "version"]).unwrap();
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn test_completions_shell() {
        let cli = Cli::try_parse_from(["lullaby", "completions", "powershell"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions(CompletionsArgs {
                shell: Shell::PowerShell
            })
        ));
    }
}
