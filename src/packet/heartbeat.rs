//! Hub status heartbeat record.
//!
//! ## Layout
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 1    | battery percent                |
//! | 1      | 1    | send-frequency code            |
//! | 2      | 1    | data source                    |
//! | 3      | 1    | remarks length                 |
//! | 4      | 1    | limit BLE name length          |
//! | 5      | 1    | limit UUID length              |
//! | 6      | 1    | RSSI (signed)                  |
//! | 7      | 1    | network sign                   |
//! | 8      | 1    | IP length                      |
//! | 9      | 1    | port length                    |
//! | 10     | ...  | remarks, name, UUID, IP, port  |
//!
//! Optional `{len, bytes}` hardware and software info strings may follow.

use tracing::trace;

use super::header::PacketHeader;
use crate::codec::bytes::ascii;
use crate::types::Heartbeat;
use crate::{HubError, Result};

const FIXED_SIZE: usize = 10;

/// Upload interval for a frequency code, in seconds.
///
/// Codes 1 through 10 select half-second steps; anything else falls back
/// to the fastest rate.
pub fn send_frequency(code: u8) -> f64 {
    match code {
        1..=10 => f64::from(code) * 0.5,
        _ => 0.5,
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = self.offset + len;
        let Some(bytes) = self.data.get(self.offset..end) else {
            return Err(HubError::structural(
                "heartbeat record",
                format!(
                    "{field} declares {len} bytes, {} remain",
                    self.data.len().saturating_sub(self.offset)
                ),
                self.data,
            ));
        };
        self.offset = end;
        Ok(bytes)
    }

    fn text(&mut self, len: u8, field: &str) -> Result<String> {
        self.take(usize::from(len), field).map(ascii)
    }

    /// Optional `{len, bytes}` string at the end of the record.
    fn trailing_text(&mut self, field: &str) -> Result<Option<String>> {
        let Some(&len) = self.data.get(self.offset) else {
            return Ok(None);
        };
        self.offset += 1;
        self.text(len, field).map(Some)
    }
}

/// Decode a heartbeat record.
pub fn decode(header: &PacketHeader, data: &[u8]) -> Result<Heartbeat> {
    if data.len() < FIXED_SIZE {
        return Err(HubError::structural(
            "heartbeat record",
            format!("need {} fixed bytes, record has {}", FIXED_SIZE, data.len()),
            data,
        ));
    }

    let mut cursor = Cursor { data, offset: FIXED_SIZE };
    let remarks = cursor.text(data[3], "remarks")?;
    let limit_ble_name = cursor.text(data[4], "limit BLE name")?;
    let limit_uuid = cursor.text(data[5], "limit UUID")?;
    let ip = cursor.text(data[8], "ip")?;
    let port = cursor.text(data[9], "port")?;
    let hardware_info = cursor.trailing_text("hardware info")?;
    let software_info = cursor.trailing_text("software info")?;

    let heartbeat = Heartbeat {
        header: header.clone(),
        battery: data[0],
        send_frequency: send_frequency(data[1]),
        data_source: data[2],
        rssi: data[6] as i8,
        network_sign: data[7],
        remarks,
        limit_ble_name,
        limit_uuid,
        ip,
        port,
        hardware_info,
        software_info,
    };

    trace!(
        hub_id = header.hub_id,
        battery = heartbeat.battery,
        frequency = heartbeat.send_frequency,
        "Decoded heartbeat"
    );

    Ok(heartbeat)
}
