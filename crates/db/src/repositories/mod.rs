//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&SqlitePool` as the first argument.

pub mod alert_repo;
pub mod device_repo;
pub mod policy_repo;
pub mod reading_repo;
pub mod telemetry_repo;

pub use alert_repo::AlertRepo;
pub use device_repo::DeviceRepo;
pub use policy_repo::PolicyRepo;
pub use reading_repo::ReadingRepo;
pub use telemetry_repo::TelemetryRepo;
