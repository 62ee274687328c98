//! Shake event source.
//!
//! The sensor pipeline that turns accelerometer readings into shakes lives
//! outside this crate. The timer only needs something it can await for the
//! next shake, expressed as [`ShakeSource`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::trace;

/// Awaitable stream of discrete shake signals.
///
/// Each call to [`detect`](Self::detect) consumes exactly one shake.
/// The future must be cancel-safe: dropping it before completion must
/// not lose a shake that has not been delivered yet.
#[async_trait::async_trait]
pub trait ShakeSource: Send + Sync {
    /// Waits for the next shake.
    async fn detect(&self);

    /// Drops shakes that arrived while nobody was listening.
    ///
    /// Called whenever a countdown starts, so only shakes during the
    /// countdown can reset it.
    fn discard_pending(&self) {}
}

/// Single-slot shake signal.
///
/// Shakes bump a counter; a detection completes once the counter moves past
/// the last consumed value. Shakes that pile up before a detection collapse
/// into one. A single consumer waits in [`detect`](ShakeSource::detect).
#[derive(Debug)]
pub struct ShakeSignal {
    emitted: watch::Sender<u64>,
    consumed: AtomicU64,
}

impl Default for ShakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShakeSignal {
    /// Creates a signal with no pending shake.
    #[must_use]
    pub fn new() -> Self {
        let (emitted, _) = watch::channel(0);
        Self {
            emitted,
            consumed: AtomicU64::new(0),
        }
    }

    /// Creates a shared signal.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Emits a shake.
    pub fn shake(&self) {
        trace!("shake emitted");
        self.emitted.send_modify(|count| *count = count.wrapping_add(1));
    }
}

#[async_trait::async_trait]
impl ShakeSource for ShakeSignal {
    async fn detect(&self) {
        let mut rx = self.emitted.subscribe();
        let consumed = self.consumed.load(Ordering::Acquire);
        let seen = rx.wait_for(|count| *count != consumed).await.map(|count| *count);
        // The sender lives in `self`, so the channel never closes while borrowed.
        let Ok(latest) = seen else {
            return std::future::pending().await;
        };
        self.consumed.store(latest, Ordering::Release);
        trace!("shake consumed");
    }

    fn discard_pending(&self) {
        let latest = *self.emitted.borrow();
        if self.consumed.swap(latest, Ordering::AcqRel) != latest {
            trace!("stale shake discarded");
        }
    }
}
