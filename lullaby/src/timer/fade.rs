//! Fade-out volume curve and countdown step selection.

use std::time::Duration;

use lullaby_core::config::SleepTimerConfig;

use crate::playback::{MAX_VOLUME, MIN_VOLUME};

/// Returns `true` once `remaining` has entered the fade window.
///
/// A zero `fade_out` disables fading entirely.
#[must_use]
pub fn in_fade_window(remaining: Duration, fade_out: Duration) -> bool {
    !fade_out.is_zero() && remaining <= fade_out
}

/// Volume for the given remaining time: `remaining / fade_out`, clamped
/// to `0.0..=1.0`. Full volume outside the fade window.
#[must_use]
pub fn fade_volume(remaining: Duration, fade_out: Duration) -> f32 {
    if !in_fade_window(remaining, fade_out) {
        return MAX_VOLUME;
    }
    (remaining.as_secs_f32() / fade_out.as_secs_f32()).clamp(MIN_VOLUME, MAX_VOLUME)
}

/// Length of the next countdown step.
///
/// Uses the coarse `tick` outside the fade window and the finer
/// `fade_tick` inside it, never overshooting `remaining`.
#[must_use]
pub fn next_step(remaining: Duration, config: &SleepTimerConfig) -> Duration {
    let interval = if in_fade_window(remaining, config.fade_out) {
        config.fade_tick
    } else {
        config.tick
    };
    interval.min(remaining)
}
