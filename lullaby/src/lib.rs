//! `Lullaby` - sleep timer that fades audio out and pauses it
//!
//! The core is [`timer::SleepTimer`]: it counts a duration down, ramps the
//! player's volume to silence over the last stretch, pauses playback at
//! zero, and restarts when the listener shakes the device. The player and
//! the shake sensor are collaborators behind the traits in [`playback`]
//! and [`shake`].

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod playback;
pub mod shake;
pub mod timer;
