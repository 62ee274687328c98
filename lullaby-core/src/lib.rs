//! `Lullaby` Core: shared configuration schema and error types
//!
//! This crate provides the configuration types and error types shared
//! by the `lullaby` engine and CLI.

pub mod config;
pub mod error;
