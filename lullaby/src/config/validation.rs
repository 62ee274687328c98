//! Configuration validation
//!
//! Semantic checks on a deserialized `LullabyConfig`. Validation collects
//! every issue instead of stopping at the first one.

use std::time::Duration;

use lullaby_core::config::{LullabyConfig, SleepTimerConfig};

use crate::error::{Severity, ValidationIssue};

/// Ticks at or above this are too coarse for a live countdown display.
pub const COARSE_TICK: Duration = Duration::from_secs(1);

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &LullabyConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_sleep_timer(&config.sleep_timer);
        if let Some(obs) = &config.observability {
            if obs.metrics_port == Some(0) {
                self.push(ValidationIssue::error(
                    "observability.metrics_port",
                    "port must be between 1 and 65535",
                ));
            }
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_sleep_timer(&mut self, timer: &SleepTimerConfig) {
        if timer.duration.is_zero() {
            self.push(ValidationIssue::error(
                "sleep_timer.duration",
                "duration must be positive",
            ));
        }

        for (path, tick) in [
            ("sleep_timer.tick", timer.tick),
            ("sleep_timer.fade_tick", timer.fade_tick),
        ] {
            if tick.is_zero() {
                self.push(ValidationIssue::error(path, "tick interval must be positive"));
            } else if tick >= COARSE_TICK {
                self.push(ValidationIssue::warning(
                    path,
                    format!(
                        "{} is coarse; the remaining time will update in visible jumps",
                        humantime::format_duration(tick)
                    ),
                ));
            }
        }

        if timer.fade_out.is_zero() {
            self.push(ValidationIssue::warning(
                "sleep_timer.fade_out",
                "fade_out is zero; volume will not fade before the pause",
            ));
        } else if timer.fade_out > timer.duration && !timer.duration.is_zero() {
            self.push(ValidationIssue::warning(
                "sleep_timer.fade_out",
                "fade_out is longer than duration; the countdown starts below full volume",
            ));
        }

        if let Some(rewind) = timer.rewind_on_expiry {
            if rewind > timer.duration && !timer.duration.is_zero() {
                self.push(ValidationIssue::warning(
                    "sleep_timer.rewind_on_expiry",
                    "rewind is longer than the sleep duration",
                ));
            }
        }
    }

    fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lullaby_core::config::ObservabilityConfig;

    fn with_timer(timer: SleepTimerConfig) -> LullabyConfig {
        LullabyConfig {
            sleep_timer: timer,
            observability: None,
        }
    }

    #[test]
    fn defaults_are_clean() {
        let result = Validator::new().validate(&LullabyConfig::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn zero_duration_is_an_error() {
        let config = with_timer(SleepTimerConfig {
            duration: Duration::ZERO,
            ..SleepTimerConfig::default()
        });
        let result = Validator::new().validate(&config);
        assert!(result.has_errors());
        assert_eq!(result.errors[0].path, "sleep_timer.duration");
    }

    #[test]
    fn zero_ticks_are_errors() {
        let config = with_timer(SleepTimerConfig {
            tick: Duration::ZERO,
            fade_tick: Duration::ZERO,
            ..SleepTimerConfig::default()
        });
        let result = Validator::new().validate(&config);
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["sleep_timer.tick", "sleep_timer.fade_tick"]);
    }

    #[test]
    fn coarse_tick_warns() {
        let config = with_timer(SleepTimerConfig {
            tick: Duration::from_secs(2),
            ..SleepTimerConfig::default()
        });
        let result = Validator::new().validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("2s"));
    }

    #[test]
    fn zero_fade_warns() {
        let config = with_timer(SleepTimerConfig {
            fade_out: Duration::ZERO,
            ..SleepTimerConfig::default()
        });
        let result = Validator::new().validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].path, "sleep_timer.fade_out");
    }

    #[test]
    fn long_rewind_warns() {
        let config = with_timer(SleepTimerConfig {
            duration: Duration::from_secs(60),
            rewind_on_expiry: Some(Duration::from_secs(120)),
            ..SleepTimerConfig::default()
        });
        let result = Validator::new().validate(&config);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "sleep_timer.rewind_on_expiry");
    }

    #[test]
    fn port_zero_is_an_error() {
        let config = LullabyConfig {
            sleep_timer: SleepTimerConfig::default(),
            observability: Some(ObservabilityConfig {
                events_file: None,
                metrics_port: Some(0),
            }),
        };
        let result = Validator::new().validate(&config);
        assert_eq!(result.errors[0].path, "observability.metrics_port");
    }

    #[test]
    fn collects_all_errors() {
        let config = with_timer(SleepTimerConfig {
            duration: Duration::ZERO,
            tick: Duration::ZERO,
            fade_tick: Duration::ZERO,
            ..SleepTimerConfig::default()
        });
        let result = Validator::new().validate(&config);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn validator_is_reusable() {
        let mut validator = Validator::new();
        let bad = with_timer(SleepTimerConfig {
            duration: Duration::ZERO,
            ..SleepTimerConfig::default()
        });
        assert!(validator.validate(&bad).has_errors());
        assert!(validator.validate(&LullabyConfig::default()).is_valid());
    }
}
