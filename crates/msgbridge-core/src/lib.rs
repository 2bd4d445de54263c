//! # msgbridge-core
//!
//! Core types, configuration, and utilities for msgbridge.
//!
//! This crate provides shared functionality used across all msgbridge crates:
//!
//! - **Configuration**: Loading and validation of config files
//! - **Types**: Message envelopes and delegated-task contracts
//! - **Utilities**: ID generation

pub mod config;
pub mod error;
pub mod id;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
