//! Sleep timer engine.
//!
//! The `SleepTimer` counts a duration down, fades the player's volume over
//! the last `fade_out` of it, and pauses playback when it reaches zero.
//! A shake restarts the countdown from the configured duration.
//!
//! Each activation runs as one generation: a single task that owns the
//! countdown ticks, the fade, and the shake watch, bound to one child
//! [`CancellationToken`]. Starting or cancelling retires the previous
//! generation under the state mutex, so a superseded generation can no
//! longer touch `remaining` or the volume once the call returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use lullaby_core::config::SleepTimerConfig;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::TimerError;
use crate::observability::events::{Event, EventEmitter, millis};
use crate::observability::metrics::{self, Trigger};
use crate::playback::{MAX_VOLUME, PlayState, PlayStateObserver, PlaybackControl};
use crate::shake::ShakeSource;

use super::fade;
use super::state::{Countdown, TimerPhase};

/// Outcome of a single countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Expired,
    Superseded,
}

/// Sleep timer bound to one player and one shake source.
///
/// Dropping the timer shuts it down without touching the player.
pub struct SleepTimer {
    inner: Arc<Inner>,
}

struct Inner {
    config: SleepTimerConfig,
    control: Arc<dyn PlaybackControl>,
    observer: Option<Arc<dyn PlayStateObserver>>,
    shake: Arc<dyn ShakeSource>,
    events: Option<Arc<EventEmitter>>,
    /// Parent of every generation's scope.
    shutdown: CancellationToken,
    countdown: Mutex<Countdown>,
    left: watch::Sender<Duration>,
    phase: watch::Sender<TimerPhase>,
}

/// Builder for [`SleepTimer`].
pub struct SleepTimerBuilder {
    config: SleepTimerConfig,
    control: Arc<dyn PlaybackControl>,
    observer: Option<Arc<dyn PlayStateObserver>>,
    shake: Arc<dyn ShakeSource>,
    events: Option<Arc<EventEmitter>>,
}

impl SleepTimerBuilder {
    /// Replaces the whole timer configuration.
    #[must_use]
    pub fn config(mut self, config: SleepTimerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the length of the fade window. Zero disables fading.
    #[must_use]
    pub fn fade_out(mut self, fade_out: Duration) -> Self {
        self.config.fade_out = fade_out;
        self
    }

    /// Sets the play state observer used by `hold_while_paused`.
    #[must_use]
    pub fn play_state(mut self, observer: Arc<dyn PlayStateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets the structured event sink.
    #[must_use]
    pub fn events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    /// Builds the timer.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::ZeroTick`] if either tick interval is zero.
    pub fn build(self) -> Result<SleepTimer, TimerError> {
        if self.config.tick.is_zero() || self.config.fade_tick.is_zero() {
            return Err(TimerError::ZeroTick);
        }
        if self.config.hold_while_paused && self.observer.is_none() {
            warn!("hold_while_paused is set but no play state observer was given; ignoring");
        }

        let (left, _) = watch::channel(Duration::ZERO);
        let (phase, _) = watch::channel(TimerPhase::Idle);

        Ok(SleepTimer {
            inner: Arc::new(Inner {
                config: self.config,
                control: self.control,
                observer: self.observer,
                shake: self.shake,
                events: self.events,
                shutdown: CancellationToken::new(),
                countdown: Mutex::new(Countdown::new()),
                left,
                phase,
            }),
        })
    }
}

impl SleepTimer {
    /// Starts building a timer that commands `control` and listens to `shake`.
    #[must_use]
    pub fn builder(
        control: Arc<dyn PlaybackControl>,
        shake: Arc<dyn ShakeSource>,
    ) -> SleepTimerBuilder {
        SleepTimerBuilder {
            config: SleepTimerConfig::default(),
            control,
            observer: None,
            shake,
            events: None,
        }
    }

    /// Starts a countdown of `duration`, replacing any running one.
    ///
    /// The new remaining value is published before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidDuration`] for a zero duration. The
    /// running countdown, if any, is left untouched. Returns
    /// [`TimerError::ShutDown`] once [`shutdown`](Self::shutdown) was called.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn set_active(&self, duration: Duration) -> Result<(), TimerError> {
        if duration.is_zero() {
            return Err(TimerError::InvalidDuration(duration));
        }
        let mut cd = self.inner.lock();
        if self.inner.shutdown.is_cancelled() {
            return Err(TimerError::ShutDown);
        }
        self.inner.start_locked(&mut cd, duration, Trigger::Activate);
        Ok(())
    }

    /// Stops the countdown without pausing playback.
    ///
    /// Restores full volume if a countdown was running. Also closes a
    /// pending post-expiry shake window. Calling it while idle only
    /// re-publishes zero.
    pub fn cancel(&self) {
        let mut cd = self.inner.lock();
        self.inner.cancel_locked(&mut cd);
    }

    /// Activates with the configured default duration, or cancels.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidDuration`] if the configured duration
    /// is zero, or [`TimerError::ShutDown`] after shutdown.
    ///
    /// # Panics
    ///
    /// Panics if `enabled` is true and this is called outside a Tokio runtime.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), TimerError> {
        if enabled {
            self.set_active(self.inner.config.duration)
        } else {
            self.cancel();
            Ok(())
        }
    }

    /// Returns `true` while a countdown is running.
    #[must_use]
    pub fn sleep_timer_active(&self) -> bool {
        self.inner.lock().active
    }

    /// Time left on the running countdown, zero when inactive.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.inner.lock().remaining
    }

    /// Duration given to the last activation.
    #[must_use]
    pub fn configured_duration(&self) -> Duration {
        self.inner.lock().configured
    }

    /// Subscribes to the remaining time.
    #[must_use]
    pub fn left_sleep_time(&self) -> watch::Receiver<Duration> {
        self.inner.left.subscribe()
    }

    /// Subscribes to the timer phase.
    #[must_use]
    pub fn phase(&self) -> watch::Receiver<TimerPhase> {
        self.inner.phase.subscribe()
    }

    /// Returns the timer configuration.
    #[must_use]
    pub fn config(&self) -> &SleepTimerConfig {
        &self.inner.config
    }

    /// Stops the timer for good.
    ///
    /// The running generation or shake window is dropped and the timer
    /// reads as idle. The player is not commanded. Later activations fail
    /// with [`TimerError::ShutDown`].
    pub fn shutdown(&self) {
        let mut cd = self.inner.lock();
        self.inner.shutdown.cancel();
        self.inner.shutdown_locked(&mut cd);
    }
}

impl Drop for SleepTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SleepTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cd = self.inner.lock();
        f.debug_struct("SleepTimer")
            .field("generation", &cd.generation)
            .field("active", &cd.active)
            .field("remaining", &cd.remaining)
            .field("phase", &cd.phase)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    fn enter_phase(&self, cd: &mut Countdown, next: TimerPhase) {
        if cd.phase == next {
            return;
        }
        debug!(from = %cd.phase, to = %next, "timer phase");
        metrics::record_phase_transition(cd.phase, next);
        cd.phase = next;
        self.phase.send_replace(next);
    }

    fn publish_remaining(&self, remaining: Duration) {
        self.left.send_replace(remaining);
        metrics::set_remaining(remaining);
    }

    fn apply_volume(&self, cd: &mut Countdown, level: f32) {
        debug!(level, "set volume");
        self.control.set_volume(level);
        cd.volume = level;
        metrics::record_volume_command();
    }

    /// Retires the live generation and spawns a fresh one.
    fn start_locked(self: &Arc<Self>, cd: &mut Countdown, duration: Duration, trigger: Trigger) {
        cd.retire();
        self.shake.discard_pending();
        if !cd.volume_is_max() {
            self.apply_volume(cd, MAX_VOLUME);
        }

        let generation = cd.generation;
        let scope = self.shutdown.child_token();
        cd.scope = Some(scope.clone());
        cd.active = true;
        cd.remaining = duration;
        cd.configured = duration;
        self.publish_remaining(duration);
        self.enter_phase(cd, TimerPhase::Counting);

        info!(
            generation,
            duration = %humantime::format_duration(duration),
            "sleep timer started"
        );
        metrics::record_activation(trigger);
        self.emit(Event::TimerStarted {
            timestamp: Utc::now(),
            generation,
            duration_ms: millis(duration),
        });

        let started = Instant::now();
        tokio::spawn(Arc::clone(self).run(generation, scope, started));
    }

    fn cancel_locked(&self, cd: &mut Countdown) {
        let was_active = cd.active;
        let generation = cd.generation;
        let remaining = cd.remaining;

        cd.retire();
        cd.active = false;
        cd.remaining = Duration::ZERO;
        self.publish_remaining(Duration::ZERO);
        self.enter_phase(cd, TimerPhase::Idle);

        if !was_active {
            debug!("cancel with no countdown running");
            return;
        }
        self.apply_volume(cd, MAX_VOLUME);

        info!(
            generation,
            remaining = %humantime::format_duration(remaining),
            "sleep timer cancelled"
        );
        metrics::record_cancel();
        self.emit(Event::TimerCancelled {
            timestamp: Utc::now(),
            generation,
            remaining_ms: millis(remaining),
        });
    }

    fn shutdown_locked(&self, cd: &mut Countdown) {
        let was_live = cd.scope.is_some();
        let generation = cd.generation;

        cd.retire();
        cd.active = false;
        cd.remaining = Duration::ZERO;
        self.publish_remaining(Duration::ZERO);
        self.enter_phase(cd, TimerPhase::Idle);

        if was_live {
            info!(generation, "sleep timer shut down");
        }
    }

    /// One generation: countdown with fade, raced against a shake, then
    /// the post-expiry shake window.
    async fn run(self: Arc<Self>, generation: u64, scope: CancellationToken, started: Instant) {
        let expired = tokio::select! {
            biased;
            () = scope.cancelled() => {
                trace!(generation, "generation cancelled");
                return;
            }
            expired = self.count_down(generation, started) => expired,
            () = self.shake.detect() => {
                self.reset_on_shake(generation);
                return;
            }
        };
        if !expired {
            return;
        }

        let window = self.config.shake_reset_window;
        if window.is_zero() {
            return;
        }
        tokio::select! {
            biased;
            () = scope.cancelled() => {
                trace!(generation, "shake window cancelled");
            }
            () = tokio::time::sleep(window) => self.close_shake_window(generation),
            () = self.shake.detect() => self.reset_on_shake(generation),
        }
    }

    /// Ticks until expiry. Returns `false` if the generation was superseded.
    async fn count_down(&self, generation: u64, started: Instant) -> bool {
        let mut hold = self
            .observer
            .as_ref()
            .filter(|_| self.config.hold_while_paused)
            .map(|observer| observer.subscribe());
        let mut deadline = started;

        loop {
            let step = {
                let cd = self.lock();
                if !cd.is_current(generation) {
                    return false;
                }
                fade::next_step(cd.remaining, &self.config)
            };

            if let Some(rx) = hold.as_mut() {
                let paused = *rx.borrow() != PlayState::Playing;
                if paused {
                    debug!(generation, "countdown held while paused");
                    if rx.wait_for(|s| *s == PlayState::Playing).await.is_err() {
                        // Player is gone; only cancellation ends this generation now.
                        std::future::pending::<()>().await;
                    }
                    deadline = Instant::now();
                }
            }

            deadline += step;
            tokio::time::sleep_until(deadline).await;

            match self.tick(generation, step) {
                Step::Continue => {}
                Step::Expired => return true,
                Step::Superseded => return false,
            }
        }
    }

    /// Applies one countdown step under the lock.
    ///
    /// The remaining value is published before any volume command derived
    /// from it.
    fn tick(&self, generation: u64, step: Duration) -> Step {
        let mut cd = self.lock();
        if !cd.is_current(generation) || !cd.active {
            return Step::Superseded;
        }

        cd.remaining = cd.remaining.saturating_sub(step);
        if cd.remaining.is_zero() {
            self.expire_locked(&mut cd, generation);
            return Step::Expired;
        }

        let remaining = cd.remaining;
        self.publish_remaining(remaining);
        trace!(generation, remaining_ms = millis(remaining), "tick");

        let fade_out = self.config.fade_out;
        if fade::in_fade_window(remaining, fade_out) {
            if cd.phase == TimerPhase::Counting {
                self.enter_phase(&mut cd, TimerPhase::Fading);
                info!(generation, "fade started");
                self.emit(Event::FadeStarted {
                    timestamp: Utc::now(),
                    generation,
                    remaining_ms: millis(remaining),
                });
            }
            let volume = fade::fade_volume(remaining, fade_out);
            if (volume - cd.volume).abs() > f32::EPSILON {
                self.apply_volume(&mut cd, volume);
            }
        }
        Step::Continue
    }

    fn expire_locked(&self, cd: &mut Countdown, generation: u64) {
        cd.active = false;
        cd.remaining = Duration::ZERO;
        self.publish_remaining(Duration::ZERO);

        let rewind = self.config.effective_rewind();
        if !rewind.is_zero() {
            self.control.rewind(rewind);
        }
        self.control.pause();
        self.apply_volume(cd, MAX_VOLUME);

        let next = if self.config.shake_reset_window.is_zero() {
            TimerPhase::Idle
        } else {
            TimerPhase::AwaitingShake
        };
        self.enter_phase(cd, next);

        info!(generation, "sleep timer expired, playback paused");
        metrics::record_expiry();
        self.emit(Event::TimerExpired {
            timestamp: Utc::now(),
            generation,
        });
    }

    fn close_shake_window(&self, generation: u64) {
        let mut cd = self.lock();
        if !cd.is_current(generation) || cd.phase != TimerPhase::AwaitingShake {
            return;
        }
        cd.scope = None;
        self.enter_phase(&mut cd, TimerPhase::Idle);

        debug!(generation, "shake window closed");
        self.emit(Event::ShakeWindowClosed {
            timestamp: Utc::now(),
            generation,
        });
    }

    /// Resumes playback at full volume and restarts the configured duration.
    fn reset_on_shake(self: &Arc<Self>, generation: u64) {
        let mut cd = self.lock();
        if !cd.is_current(generation) {
            trace!(generation, "stale shake ignored");
            return;
        }
        let interrupted = cd.phase;
        let remaining = cd.remaining;
        let duration = cd.configured;

        self.control.play();
        self.apply_volume(&mut cd, MAX_VOLUME);

        info!(
            generation,
            phase = %interrupted,
            remaining = %humantime::format_duration(remaining),
            "shake detected, restarting sleep timer"
        );
        metrics::record_shake_reset(interrupted);
        self.emit(Event::ShakeReset {
            timestamp: Utc::now(),
            generation,
            remaining_ms: millis(remaining),
            duration_ms: millis(duration),
        });

        self.start_locked(&mut cd, duration, Trigger::Shake);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{MemoryPlayer, PlayerCommand};
    use crate::shake::ShakeSignal;

    fn timer(player: &Arc<MemoryPlayer>) -> SleepTimer {
        SleepTimer::builder(player.clone(), ShakeSignal::shared())
            .build()
            .unwrap()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn build_rejects_zero_tick() {
        let player = Arc::new(MemoryPlayer::new());
        let config = SleepTimerConfig {
            tick: Duration::ZERO,
            ..SleepTimerConfig::default()
        };
        let err = SleepTimer::builder(player, ShakeSignal::shared())
            .config(config)
            .build()
            .unwrap_err();
        assert_eq!(err, TimerError::ZeroTick);
    }

    #[test]
    fn build_rejects_zero_fade_tick() {
        let player = Arc::new(MemoryPlayer::new());
        let config = SleepTimerConfig {
            fade_tick: Duration::ZERO,
            ..SleepTimerConfig::default()
        };
        assert!(
            SleepTimer::builder(player, ShakeSignal::shared())
                .config(config)
                .build()
                .is_err()
        );
    }

    #[test]
    fn fade_out_overrides_config() {
        let player = Arc::new(MemoryPlayer::new());
        let timer = SleepTimer::builder(player, ShakeSignal::shared())
            .fade_out(Duration::from_secs(3))
            .build()
            .unwrap();
        assert_eq!(timer.config().fade_out, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_is_rejected_without_side_effects() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        let err = timer.set_active(Duration::ZERO).unwrap_err();
        assert_eq!(err, TimerError::InvalidDuration(Duration::ZERO));
        assert!(!timer.sleep_timer_active());
        assert!(player.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_active_publishes_immediately() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);
        let left = timer.left_sleep_time();
        let phase = timer.phase();

        timer.set_active(Duration::from_secs(60)).unwrap();

        assert_eq!(*left.borrow(), Duration::from_secs(60));
        assert_eq!(*phase.borrow(), TimerPhase::Counting);
        assert_eq!(timer.configured_duration(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_tick_is_discarded() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.set_active(Duration::from_secs(30)).unwrap();
        let stale = timer.inner.lock().generation;
        timer.set_active(Duration::from_secs(30)).unwrap();

        let step = timer.inner.tick(stale, Duration::from_secs(29));
        assert_eq!(step, Step::Superseded);
        assert_eq!(timer.remaining(), Duration::from_secs(30));
        assert!(player.volume_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_after_cancel_is_discarded() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.set_active(Duration::from_secs(30)).unwrap();
        let generation = timer.inner.lock().generation;
        timer.cancel();
        player.clear_commands();

        assert_eq!(
            timer.inner.tick(generation, Duration::from_secs(30)),
            Step::Superseded
        );
        assert!(player.commands().is_empty());
        assert!(!timer.sleep_timer_active());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_shake_does_not_restart() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.set_active(Duration::from_secs(30)).unwrap();
        let generation = timer.inner.lock().generation;
        timer.cancel();
        player.clear_commands();

        timer.inner.reset_on_shake(generation);
        assert!(!timer.sleep_timer_active());
        assert!(player.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_decrements_and_fades() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.set_active(Duration::from_secs(12)).unwrap();
        let generation = timer.inner.lock().generation;

        assert_eq!(
            timer.inner.tick(generation, Duration::from_secs(7)),
            Step::Continue
        );
        assert_eq!(timer.remaining(), Duration::from_secs(5));
        assert_eq!(*timer.phase().borrow(), TimerPhase::Fading);
        assert_eq!(player.commands(), vec![PlayerCommand::SetVolume(0.5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_faded_run_restores_volume_first() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.set_active(Duration::from_secs(12)).unwrap();
        let generation = timer.inner.lock().generation;
        timer.inner.tick(generation, Duration::from_secs(7));
        player.clear_commands();

        timer.set_active(Duration::from_secs(12)).unwrap();
        assert_eq!(player.commands(), vec![PlayerCommand::SetVolume(1.0)]);
        assert_eq!(*timer.phase().borrow(), TimerPhase::Counting);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_generation() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.set_active(Duration::from_secs(2)).unwrap();
        timer.shutdown();
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;

        assert_eq!(player.count(|c| *c == PlayerCommand::Pause), 0);
        assert!(!timer.sleep_timer_active());
        assert_eq!(timer.remaining(), Duration::ZERO);
        assert_eq!(*timer.phase().borrow(), TimerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn activation_after_shutdown_is_rejected() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);

        timer.shutdown();
        let err = timer.set_active(Duration::from_secs(5)).unwrap_err();
        assert_eq!(err, TimerError::ShutDown);
        assert_eq!(timer.set_enabled(true).unwrap_err(), TimerError::ShutDown);
        assert!(!timer.sleep_timer_active());
        assert_eq!(timer.remaining(), Duration::ZERO);
        assert!(player.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_enabled_uses_configured_duration() {
        let player = Arc::new(MemoryPlayer::playing());
        let config = SleepTimerConfig {
            duration: Duration::from_secs(90),
            ..SleepTimerConfig::default()
        };
        let timer = SleepTimer::builder(player, ShakeSignal::shared())
            .config(config)
            .build()
            .unwrap();

        timer.set_enabled(true).unwrap();
        assert_eq!(timer.remaining(), Duration::from_secs(90));
        timer.set_enabled(false).unwrap();
        assert_eq!(timer.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn debug_shows_state() {
        let player = Arc::new(MemoryPlayer::playing());
        let timer = timer(&player);
        timer.set_active(Duration::from_secs(5)).unwrap();
        let debug = format!("{timer:?}");
        assert!(debug.contains("SleepTimer"));
        assert!(debug.contains("active: true"));
    }
}
