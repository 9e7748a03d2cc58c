//! Row structs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching a table
//! row and, where the engine needs one, a conversion to the domain type from
//! `noisewatch_core`. Timestamps are stored as epoch seconds.

pub mod alert;
pub mod device;
pub mod policy;
pub mod reading;
pub mod telemetry;
