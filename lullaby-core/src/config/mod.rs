//! Configuration schema for `Lullaby`.

pub mod schema;

pub use schema::{LullabyConfig, ObservabilityConfig, SleepTimerConfig};
