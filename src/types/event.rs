//! Events delivered to channel subscribers.

use super::{BleHeartRate, SensorReading};
use crate::HubError;

/// Everything the decoder reports, as one discriminated value.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// A decoded sensor record
    Reading(SensorReading),

    /// Unescaped body of a verified frame, header through checksum
    RawFrame(Vec<u8>),

    /// A frame or record that failed to decode
    DecodeError { message: String, bytes: Vec<u8> },

    /// No bytes arrived within the configured idle threshold
    Idle,

    /// SOS raised by a wearable
    Sos(BleHeartRate),
}

impl HubEvent {
    pub fn decode_error(error: &HubError) -> Self {
        HubEvent::DecodeError {
            message: error.to_string(),
            bytes: error.offending_bytes().map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn reading(&self) -> Option<&SensorReading> {
        match self {
            HubEvent::Reading(reading) => Some(reading),
            _ => None,
        }
    }
}
