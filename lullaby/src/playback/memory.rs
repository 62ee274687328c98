//! In-memory player.
//!
//! Keeps play state, volume and a clock-driven playback position in memory
//! and records every command it receives. The CLI drives the timer against it, and tests use the
//! command log to assert exactly what the timer issued.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{MAX_VOLUME, MIN_VOLUME, PlayState, PlayStateObserver, PlaybackControl};

/// A command received by [`MemoryPlayer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    /// `pause()` was called
    Pause,
    /// `play()` was called
    Play,
    /// `set_volume()` was called with the (clamped) level
    SetVolume(f32),
    /// `rewind()` was called
    Rewind(Duration),
}

#[derive(Debug)]
struct Inner {
    volume: f32,
    /// Position when `playing_since` was last set.
    position: Duration,
    playing_since: Option<Instant>,
    commands: Vec<PlayerCommand>,
}

impl Inner {
    fn position(&self) -> Duration {
        self.position + self.playing_since.map_or(Duration::ZERO, |t| t.elapsed())
    }

    /// Folds elapsed play time into `position`.
    fn settle(&mut self) {
        self.position = self.position();
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }
}

/// Player that lives entirely in memory.
#[derive(Debug)]
pub struct MemoryPlayer {
    inner: Mutex<Inner>,
    state: watch::Sender<PlayState>,
}

impl MemoryPlayer {
    /// Creates a paused player at full volume.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(PlayState::Paused)
    }

    /// Creates a player at full volume in the given state.
    #[must_use]
    pub fn with_state(state: PlayState) -> Self {
        let playing = state == PlayState::Playing;
        let (state, _) = watch::channel(state);
        Self {
            inner: Mutex::new(Inner {
                volume: MAX_VOLUME,
                position: Duration::ZERO,
                playing_since: playing.then(Instant::now),
                commands: Vec::new(),
            }),
            state,
        }
    }

    /// Creates a player that is already playing.
    #[must_use]
    pub fn playing() -> Self {
        Self::with_state(PlayState::Playing)
    }

    /// Returns the current volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    /// Returns the playback position. It advances with the Tokio clock
    /// while playing.
    #[must_use]
    pub fn position(&self) -> Duration {
        self.lock().position()
    }

    /// Returns every command received so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.lock().commands.clone()
    }

    /// Returns the volume levels set so far, oldest first.
    #[must_use]
    pub fn volume_history(&self) -> Vec<f32> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                PlayerCommand::SetVolume(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// Counts received commands matching `pred`.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&PlayerCommand) -> bool) -> usize {
        self.lock().commands.iter().filter(|c| pred(c)).count()
    }

    /// Clears the command log without touching state.
    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

}

impl Default for MemoryPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackControl for MemoryPlayer {
    fn pause(&self) {
        {
            let mut inner = self.lock();
            inner.settle();
            inner.playing_since = None;
            info!(position_ms = inner.position.as_millis(), "player paused");
            inner.commands.push(PlayerCommand::Pause);
        }
        self.state.send_replace(PlayState::Paused);
    }

    fn play(&self) {
        {
            let mut inner = self.lock();
            inner.settle();
            inner.playing_since.get_or_insert_with(Instant::now);
            info!(position_ms = inner.position.as_millis(), "player playing");
            inner.commands.push(PlayerCommand::Play);
        }
        self.state.send_replace(PlayState::Playing);
    }

    fn set_volume(&self, level: f32) {
        let level = level.clamp(MIN_VOLUME, MAX_VOLUME);
        debug!(level, "player volume");
        let mut inner = self.lock();
        inner.volume = level;
        inner.commands.push(PlayerCommand::SetVolume(level));
    }

    fn rewind(&self, by: Duration) {
        debug!(by_ms = by.as_millis(), "player rewind");
        let mut inner = self.lock();
        inner.settle();
        inner.position = inner.position.saturating_sub(by);
        inner.commands.push(PlayerCommand::Rewind(by));
    }
}

impl PlayStateObserver for MemoryPlayer {
    fn play_state(&self) -> PlayState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<PlayState> {
        self.state.subscribe()
    }
}
