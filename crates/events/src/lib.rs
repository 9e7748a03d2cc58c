//! Noisewatch event distribution and notification delivery.
//!
//! - [`EventDistributor`]: in-process fan-out of device events to every
//!   registered [`DeviceObserver`], each running in its own task.
//! - [`ReadingPersistence`]: observer that durably writes readings and
//!   telemetry through a [`NoiseStore`](noisewatch_db::NoiseStore).
//! - [`delivery`]: external notification channels ([`SmsDelivery`]).

pub mod bus;
pub mod delivery;
pub mod persistence;

pub use bus::{DeviceEvent, DeviceObserver, DistributorError, EventDistributor, ObserverId};
pub use delivery::sms::{SmsConfig, SmsDelivery};
pub use delivery::{DeliveryError, DeliveryReceipt, Notifier};
pub use persistence::ReadingPersistence;
