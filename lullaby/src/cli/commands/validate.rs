//! `validate` command
//!
//! Loads each configuration file through the regular loader and reports
//! errors and warnings per file.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, LullabyError};

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// File that was checked
    pub file: PathBuf,
    /// Whether the file passed
    pub valid: bool,
    /// Errors, one message each
    pub errors: Vec<String>,
    /// Warnings, one message each
    pub warnings: Vec<String>,
}

/// Checks one file. With `strict`, warnings fail the file.
#[must_use]
pub fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> FileReport {
    tracing::info!(file = %path.display(), "validating configuration");

    let (errors, warnings): (Vec<String>, Vec<String>) = match loader.load(path) {
        Ok(result) => (
            Vec::new(),
            result.warnings.iter().map(ToString::to_string).collect(),
        ),
        Err(ConfigError::ValidationError { errors, .. }) => {
            (errors.iter().map(ToString::to_string).collect(), Vec::new())
        }
        Err(e) => (vec![e.to_string()], Vec::new()),
    };

    let valid = errors.is_empty() && !(strict && !warnings.is_empty());
    FileReport {
        file: path.to_path_buf(),
        valid,
        errors,
        warnings,
    }
}

/// Validate configuration files.
///
/// # Errors
///
/// Returns `ConfigError::ValidationFailed` if any file fails, or a JSON
/// error if the report cannot be serialized.
pub fn run(args: &ValidateArgs) -> Result<(), LullabyError> {
    let loader = ConfigLoader::with_defaults();
    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| check_file(&loader, path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    let failed = reports.iter().filter(|r| !r.valid).count();
    if failed > 0 {
        return Err(ConfigError::ValidationFailed { count: failed }.into());
    }
    Ok(())
}

fn print_human(report: &FileReport) {
    let mark = if report.valid { "ok" } else { "FAILED" };
    println!("{}: {mark}", report.file.display());
    for error in &report.errors {
        println!("  {error}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_file_passes() {
        let file = write_config("sleep_timer:\n  duration: 30m\n");
        let report = check_file(&ConfigLoader::with_defaults(), file.path(), false);
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn warnings_fail_only_in_strict_mode() {
        let file = write_config("sleep_timer:\n  fade_out: 0s\n");
        let loader = ConfigLoader::with_defaults();

        let lenient = check_file(&loader, file.path(), false);
        assert!(lenient.valid);
        assert_eq!(lenient.warnings.len(), 1);

        let strict = check_file(&loader, file.path(), true);
        assert!(!strict.valid);
    }

    #[test]
    fn validation_errors_are_listed() {
        let file = write_config("sleep_timer:\n  duration: 0s\n  tick: 0s\n");
        let report = check_file(&ConfigLoader::with_defaults(), file.path(), false);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("sleep_timer.duration"));
    }

    #[test]
    fn missing_file_is_reported() {
        let report = check_file(
            &ConfigLoader::with_defaults(),
            Path::new("/nonexistent/lullaby.yaml"),
            false,
        );
        assert!(!report.valid);
        assert!(report.errors[0].contains("file not found"));
    }

    #[test]
    fn run_fails_with_count() {
        let good = write_config("sleep_timer:\n  duration: 30m\n");
        let bad = write_config("sleep_timer:\n  duration: 0s\n");
        let args = ValidateArgs {
            files: vec![good.path().to_path_buf(), bad.path().to_path_buf()],
            format: OutputFormat::Json,
            strict: false,
        };
        let err = run(&args).unwrap_err();
        assert!(matches!(
            err,
            LullabyError::Config(ConfigError::ValidationFailed { count: 1 })
        ));
    }
}
