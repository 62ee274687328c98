//! Playback collaborator interfaces.
//!
//! The sleep timer never owns the player. It observes the coarse play state
//! through [`PlayStateObserver`] and issues fire-and-forget commands through
//! [`PlaybackControl`]. Any failure inside a command is the player's concern
//! and is never reported back to the timer.

pub mod memory;

pub use memory::{MemoryPlayer, PlayerCommand};

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

/// Lowest volume the timer fades to.
pub const MIN_VOLUME: f32 = 0.0;

/// Full volume, restored on expiry, cancel, and shake reset.
pub const MAX_VOLUME: f32 = 1.0;

/// Coarse playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    /// Audio is playing
    Playing,
    /// Audio is paused or stopped
    #[default]
    Paused,
}

impl std::fmt::Display for PlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => f.write_str("playing"),
            Self::Paused => f.write_str("paused"),
        }
    }
}

/// Command sink of the playback engine.
pub trait PlaybackControl: Send + Sync {
    /// Pauses playback.
    fn pause(&self);

    /// Starts or resumes playback.
    fn play(&self);

    /// Sets the output volume, `0.0..=1.0`.
    fn set_volume(&self, level: f32);

    /// Moves the playback position back by `by`.
    ///
    /// Players without seeking ignore this.
    fn rewind(&self, _by: Duration) {}
}

/// Read side of the playback engine.
pub trait PlayStateObserver: Send + Sync {
    /// Returns the current play state.
    fn play_state(&self) -> PlayState;

    /// Subscribes to play state changes.
    fn subscribe(&self) -> watch::Receiver<PlayState>;
}
