//! Configuration schema types
//!
//! This module defines the configuration types deserialized from
//! `Lullaby` YAML files. Durations are written in human form
//! (`"20m"`, `"500ms"`, `"1h 30m"`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sleep time used when neither the file nor the command line sets one.
pub const DEFAULT_SLEEP_DURATION: Duration = Duration::from_secs(20 * 60);

/// Length of the volume ramp preceding expiry.
pub const DEFAULT_FADE_OUT: Duration = Duration::from_secs(10);

/// How long a shake is still honored after the timer expired.
pub const DEFAULT_SHAKE_RESET_WINDOW: Duration = Duration::from_secs(30);

/// Countdown step outside the fade window.
pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// Countdown step inside the fade window.
pub const DEFAULT_FADE_TICK: Duration = Duration::from_millis(200);

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for `Lullaby`.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct LullabyConfig {
    /// Sleep timer behavior
    #[serde(default)]
    pub sleep_timer: SleepTimerConfig,

    /// Event stream and metrics output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

// ============================================================================
// Sleep Timer
// ============================================================================

/// Sleep timer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SleepTimerConfig {
    /// User-configured sleep time, used when the timer is enabled without
    /// an explicit duration.
    #[serde(default = "SleepTimerConfig::default_duration", with = "human_duration")]
    pub duration: Duration,

    /// Length of the trailing volume ramp.
    #[serde(default = "SleepTimerConfig::default_fade_out", with = "human_duration")]
    pub fade_out: Duration,

    /// Grace period after expiry during which a shake restarts the timer.
    /// Zero disables it.
    #[serde(
        default = "SleepTimerConfig::default_shake_reset_window",
        with = "human_duration"
    )]
    pub shake_reset_window: Duration,

    /// Countdown step outside the fade window.
    #[serde(default = "SleepTimerConfig::default_tick", with = "human_duration")]
    pub tick: Duration,

    /// Countdown step inside the fade window.
    #[serde(default = "SleepTimerConfig::default_fade_tick", with = "human_duration")]
    pub fade_tick: Duration,

    /// How far playback is rewound when the timer pauses it.
    /// Defaults to `fade_out` so the faded part is heard again.
    #[serde(
        default,
        with = "human_duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rewind_on_expiry: Option<Duration>,

    /// Freeze the countdown while playback is not playing.
    #[serde(default)]
    pub hold_while_paused: bool,
}

impl SleepTimerConfig {
    const fn default_duration() -> Duration {
        DEFAULT_SLEEP_DURATION
    }

    const fn default_fade_out() -> Duration {
        DEFAULT_FADE_OUT
    }

    const fn default_shake_reset_window() -> Duration {
        DEFAULT_SHAKE_RESET_WINDOW
    }

    const fn default_tick() -> Duration {
        DEFAULT_TICK
    }

    const fn default_fade_tick() -> Duration {
        DEFAULT_FADE_TICK
    }

    /// Returns the rewind applied on expiry, falling back to `fade_out`.
    #[must_use]
    pub fn effective_rewind(&self) -> Duration {
        self.rewind_on_expiry.unwrap_or(self.fade_out)
    }
}

impl Default for SleepTimerConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SLEEP_DURATION,
            fade_out: DEFAULT_FADE_OUT,
            shake_reset_window: DEFAULT_SHAKE_RESET_WINDOW,
            tick: DEFAULT_TICK,
            fade_tick: DEFAULT_FADE_TICK,
            rewind_on_expiry: None,
            hold_while_paused: false,
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Event stream and metrics output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Write JSONL timer events to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

/// Serde adapter for durations written as human-readable strings.
mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        // Only reached for `Some`, `None` is skipped by the field attribute.
        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
