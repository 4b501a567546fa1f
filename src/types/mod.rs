//! Core types for decoded hub data.
//!
//! Every reading embeds the [`PacketHeader`](crate::packet::PacketHeader) of
//! the frame it was decoded from, so consumers never need to keep frames
//! around. BLE readings additionally carry the parsed
//! [`BleAdvertisement`] envelope.
//!
//! ## Usage Example
//!
//! ```rust
//! use sensorhub::types::{HubEvent, SensorReading};
//!
//! fn describe(event: &HubEvent) -> String {
//!     match event {
//!         HubEvent::Reading(SensorReading::AntHeartRate(hr)) => {
//!             format!("{} bpm from {}", hr.heart_rate, hr.device_id)
//!         }
//!         HubEvent::Reading(other) => other.kind().to_string(),
//!         HubEvent::Idle => "idle".to_string(),
//!         _ => String::new(),
//!     }
//! }
//!
//! assert_eq!(describe(&HubEvent::Idle), "idle");
//! ```

mod event;
mod reading;

pub use event::HubEvent;
pub use reading::{
    AdvertisingFlags, AntCadence, AntHeartRate, AntSpeed, BleAdvertisement, BleBoxing,
    BleBoxingHeartRate, BleCadence, BleHeartRate, Fist, Hand, Heartbeat, PunchStats,
    SensorReading,
};
