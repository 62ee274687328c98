//! Countdown state owned by the sleep timer.
//!
//! A single [`Countdown`] lives behind the engine's mutex. Every tick,
//! reset, and cancel mutates it under that lock, and every background
//! activity carries the generation it was started for. Work whose
//! generation no longer matches is discarded.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::playback::MAX_VOLUME;

/// Coarse phase of the sleep timer, published alongside the remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No countdown running
    #[default]
    Idle,
    /// Counting down at full volume
    Counting,
    /// Inside the fade window, volume follows the remaining time
    Fading,
    /// Expired, still honoring a shake for the reset window
    AwaitingShake,
}

impl std::fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Counting => "counting",
            Self::Fading => "fading",
            Self::AwaitingShake => "awaiting_shake",
        };
        f.write_str(name)
    }
}

/// Mutable countdown state.
///
/// Invariant: `remaining` is zero exactly when `active` is false.
#[derive(Debug)]
pub(crate) struct Countdown {
    /// Id of the live generation. Bumped on every start and cancel.
    pub generation: u64,
    /// Cancellation scope of the live generation.
    pub scope: Option<CancellationToken>,
    pub active: bool,
    pub remaining: Duration,
    /// Duration given to the last activation, reused by shake resets.
    pub configured: Duration,
    /// Last volume sent to the player.
    pub volume: f32,
    pub phase: TimerPhase,
}

impl Countdown {
    pub(crate) const fn new() -> Self {
        Self {
            generation: 0,
            scope: None,
            active: false,
            remaining: Duration::ZERO,
            configured: Duration::ZERO,
            volume: MAX_VOLUME,
            phase: TimerPhase::Idle,
        }
    }

    /// Cancels the live generation's scope and invalidates its id.
    pub(crate) fn retire(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns `true` if `generation` is still the live one.
    pub(crate) const fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn volume_is_max(&self) -> bool {
        (self.volume - MAX_VOLUME).abs() <= f32::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_countdown_is_idle() {
        let cd = Countdown::new();
        assert!(!cd.active);
        assert_eq!(cd.remaining, Duration::ZERO);
        assert_eq!(cd.phase, TimerPhase::Idle);
        assert!(cd.volume_is_max());
    }

    #[test]
    fn retire_cancels_scope_and_bumps_generation() {
        let mut cd = Countdown::new();
        let scope = CancellationToken::new();
        cd.scope = Some(scope.clone());
        let before = cd.generation;

        cd.retire();

        assert!(scope.is_cancelled());
        assert!(cd.scope.is_none());
        assert!(!cd.is_current(before));
        assert!(cd.is_current(before + 1));
    }

    #[test]
    fn retire_without_scope_still_bumps() {
        let mut cd = Countdown::new();
        cd.retire();
        cd.retire();
        assert_eq!(cd.generation, 2);
    }

    #[test]
    fn phase_display() {
        assert_eq!(TimerPhase::AwaitingShake.to_string(), "awaiting_shake");
    }
}
