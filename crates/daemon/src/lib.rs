//! `noisewatch-daemon` library half.
//!
//! The binary in `main.rs` only loads configuration and wires these pieces
//! together; everything here is usable from tests.

pub mod config;
pub mod ingest;
pub mod logging;
pub mod retention;
pub mod services;

pub use config::{ConfigError, DaemonConfig};
pub use services::Services;
