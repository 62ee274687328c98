//! Command-line interface
//!
//! Argument definitions and command handlers for the `lullaby` binary.

pub mod args;
pub mod commands;
