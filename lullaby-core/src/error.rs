//! Core error types for `Lullaby`
//!
//! Configuration and validation error types shared across the workspace.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}{}: {message}", line.map_or_else(String::new, |l| format!(" (line {l})")))]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("{path} is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual file size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// One or more configuration files failed validation.
    #[error("{count} file(s) failed validation")]
    ValidationFailed {
        /// Number of files that failed validation.
        count: usize,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted path to the problematic field (e.g., "`sleep_timer.fade_out`")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl ValidationIssue {
    /// Creates an error-level issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-level issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue::error("sleep_timer.duration", "duration must be positive");
        assert_eq!(
            issue.to_string(),
            "error: duration must be positive at sleep_timer.duration"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue::warning("sleep_timer.fade_out", "fade-out disabled");
        assert_eq!(
            issue.to_string(),
            "warning: fade-out disabled at sleep_timer.fade_out"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("lullaby.yaml"),
            line: Some(4),
            message: "unexpected token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lullaby.yaml"));
        assert!(msg.contains("(line 4)"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_config_error_without_line() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("lullaby.yaml"),
            line: None,
            message: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "parse error in lullaby.yaml: bad");
    }

    #[test]
    fn test_too_large_display() {
        let err = ConfigError::TooLarge {
            path: PathBuf::from("big.yaml"),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(err.to_string(), "big.yaml is 2048 bytes, limit is 1024");
    }
}
