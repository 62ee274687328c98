//! Configuration loading and validation
//!
//! The schema lives in `lullaby-core`; this module reads YAML files into it.

pub mod loader;
pub mod validation;

pub use lullaby_core::config::{LullabyConfig, ObservabilityConfig, SleepTimerConfig};
pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use validation::{ValidationResult, Validator};
