//! Metrics collection for `Lullaby`.
//!
//! Provides Prometheus-compatible metrics and typed convenience functions
//! for recording sleep timer activity. All labels come from closed enums,
//! so label cardinality is bounded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::LullabyError;
use crate::timer::TimerPhase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`.  When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `LullabyError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), LullabyError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| LullabyError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "lullaby_activations_total",
        "Countdowns started, by trigger"
    );
    describe_counter!(
        "lullaby_expirations_total",
        "Countdowns that reached zero and paused playback"
    );
    describe_counter!(
        "lullaby_cancellations_total",
        "Countdowns cancelled before expiry"
    );
    describe_counter!(
        "lullaby_shake_resets_total",
        "Shakes that restarted the countdown, by phase at the time of the shake"
    );
    describe_counter!(
        "lullaby_volume_commands_total",
        "Volume commands issued to the player"
    );
    describe_counter!(
        "lullaby_phase_transitions_total",
        "Timer phase transitions"
    );
    describe_gauge!(
        "lullaby_remaining_seconds",
        "Time left on the current countdown"
    );
}

/// What started a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit activation by the caller
    Activate,
    /// A shake restarted the countdown
    Shake,
}

impl Trigger {
    const fn label(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Shake => "shake",
        }
    }
}

/// Records a countdown start.
pub fn record_activation(trigger: Trigger) {
    counter!("lullaby_activations_total", "trigger" => trigger.label()).increment(1);
}

/// Records a countdown reaching zero.
pub fn record_expiry() {
    counter!("lullaby_expirations_total").increment(1);
}

/// Records a cancellation of a running countdown.
pub fn record_cancel() {
    counter!("lullaby_cancellations_total").increment(1);
}

/// Records a shake reset. `phase` is the phase the shake interrupted.
pub fn record_shake_reset(phase: TimerPhase) {
    counter!("lullaby_shake_resets_total", "phase" => phase_label(phase)).increment(1);
}

/// Records a volume command sent to the player.
pub fn record_volume_command() {
    counter!("lullaby_volume_commands_total").increment(1);
}

/// Records a phase transition.
pub fn record_phase_transition(from: TimerPhase, to: TimerPhase) {
    counter!(
        "lullaby_phase_transitions_total",
        "from" => phase_label(from),
        "to" => phase_label(to),
    )
    .increment(1);
}

/// Sets the remaining-time gauge.
pub fn set_remaining(remaining: Duration) {
    gauge!("lullaby_remaining_seconds").set(remaining.as_secs_f64());
}

const fn phase_label(phase: TimerPhase) -> &'static str {
    match phase {
        TimerPhase::Idle => "idle",
        TimerPhase::Counting => "counting",
        TimerPhase::Fading => "fading",
        TimerPhase::AwaitingShake => "awaiting_shake",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_labels_match_display() {
        for phase in [
            TimerPhase::Idle,
            TimerPhase::Counting,
            TimerPhase::Fading,
            TimerPhase::AwaitingShake,
        ] {
            assert_eq!(phase_label(phase), phase.to_string());
        }
    }

    #[test]
    fn trigger_labels() {
        assert_eq!(Trigger::Activate.label(), "activate");
        assert_eq!(Trigger::Shake.label(), "shake");
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // metrics macros silently no-op when no global recorder is installed
        record_activation(Trigger::Activate);
        record_activation(Trigger::Shake);
        record_expiry();
        record_cancel();
        record_shake_reset(TimerPhase::Fading);
        record_volume_command();
        record_phase_transition(TimerPhase::Counting, TimerPhase::Fading);
        set_remaining(Duration::from_secs(42));
    }
}
