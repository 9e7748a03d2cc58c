//! Noisewatch domain logic.
//!
//! Everything in this crate is pure: no database access, no network. The
//! `db`, `events`, `alerting` and `daemon` crates build on these types.

pub mod alert;
pub mod clock;
pub mod decision;
pub mod error;
pub mod phone;
pub mod policy;
pub mod reading;
pub mod telemetry;
pub mod types;
