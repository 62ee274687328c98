//! Sleep timer
//!
//! Countdown, fade-out, and shake reset.

pub mod engine;
pub mod fade;
pub mod state;

pub use engine::{SleepTimer, SleepTimerBuilder};
pub use fade::{fade_volume, in_fade_window};
pub use state::TimerPhase;
