//! `tracing` subscriber setup.
//!
//! The timer logs every transition at `info` and every tick at `trace`.
//! Verbosity flags raise the `lullaby` targets first; dependencies such as
//! the Prometheus exporter stay at `warn` until `-vvv`. `LULLABY_LOG_LEVEL`
//! replaces the computed filter entirely.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "LULLABY_LOG_LEVEL";

/// Output format for log lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Filter directive for a `-v` count.
///
/// | count | lullaby | dependencies |
/// |-------|---------|--------------|
/// | 0     | warn    | warn         |
/// | 1     | info    | warn         |
/// | 2     | debug   | warn         |
/// | 3+    | trace   | debug        |
#[must_use]
pub fn filter_directive(verbosity: u8) -> String {
    let (own, deps) = match verbosity {
        0 => return "warn".to_owned(),
        1 => ("info", "warn"),
        2 => ("debug", "warn"),
        _ => ("trace", "debug"),
    };
    // Target prefixes match, so `lullaby` also covers `lullaby_core`.
    format!("{deps},lullaby={own}")
}

/// Resolves `--color` against the terminal and `NO_COLOR`.
#[must_use]
pub fn ansi_enabled(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
///
/// Targets are printed from `-vv` on, once more than one module is chatty.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Human => builder.with_ansi(ansi_enabled(color)).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, verbosity, "logging initialised");
    }
}
