//! Noise-threshold alerting.
//!
//! - [`AlertEngine`]: observer that runs one decision pass per reading,
//!   serialized per device and parallel across devices.
//! - [`NotificationDispatcher`]: sends fired alerts in detached tasks and
//!   records each delivery outcome in the ledger.

pub mod dispatcher;
pub mod engine;

pub use dispatcher::NotificationDispatcher;
pub use engine::{AlertEngine, AlertEngineConfig, EvaluationTime};
