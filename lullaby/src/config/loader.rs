//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check
//! 2. YAML parsing (an empty document yields the defaults)
//! 3. Deserialization to typed config
//! 4. Validation

use std::path::Path;

use lullaby_core::config::LullabyConfig;
use serde_yaml::Value;

use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: u64,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("LULLABY_MAX_CONFIG_SIZE", 64 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: LullabyConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - YAML parsing or deserialization fails
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        if metadata.len() > limit {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw, path)
    }

    /// Parses and validates configuration text. `origin` names the source
    /// in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing, deserialization, or validation fails.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        // Handle UTF-8 BOM
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let root: Value = serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: origin.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        let config = if root.is_null() {
            warnings.push(LoadWarning {
                message: "configuration file is empty, using defaults".to_string(),
                location: None,
            });
            LullabyConfig::default()
        } else {
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult { config, warnings })
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
