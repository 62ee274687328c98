//! Structured event stream for `Lullaby`.
//!
//! Discrete, typed timer events serialized as newline-delimited JSON
//! (JSONL), each with a monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted by the sleep timer.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind. Durations are in milliseconds.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A countdown was started.
    TimerStarted {
        /// When the countdown started.
        timestamp: DateTime<Utc>,
        /// Generation id of the new countdown.
        generation: u64,
        /// Full countdown length.
        duration_ms: u64,
    },

    /// The countdown entered the fade window.
    FadeStarted {
        /// When the fade began.
        timestamp: DateTime<Utc>,
        /// Generation id of the fading countdown.
        generation: u64,
        /// Time left when the fade began.
        remaining_ms: u64,
    },

    /// A shake restarted the countdown.
    ShakeReset {
        /// When the shake was handled.
        timestamp: DateTime<Utc>,
        /// Generation id that was reset.
        generation: u64,
        /// Time left just before the reset (zero after expiry).
        remaining_ms: u64,
        /// Duration the countdown restarted with.
        duration_ms: u64,
    },

    /// The countdown reached zero and playback was paused.
    TimerExpired {
        /// When the timer expired.
        timestamp: DateTime<Utc>,
        /// Generation id that expired.
        generation: u64,
    },

    /// The countdown was cancelled before expiry.
    TimerCancelled {
        /// When the timer was cancelled.
        timestamp: DateTime<Utc>,
        /// Generation id that was cancelled.
        generation: u64,
        /// Time left at cancellation.
        remaining_ms: u64,
    },

    /// The post-expiry shake window elapsed without a shake.
    ShakeWindowClosed {
        /// When the window closed.
        timestamp: DateTime<Utc>,
        /// Generation id whose window closed.
        generation: u64,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are dropped so that
/// the timer never fails because of its event sink.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

/// Converts a duration to whole milliseconds for event payloads.
#[must_use]
pub fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
