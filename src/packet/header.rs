//! Fixed 20-byte packet header.
//!
//! ## Layout (big-endian)
//!
//! | offset | size | field            |
//! |--------|------|------------------|
//! | 0      | 1    | magic            |
//! | 1      | 4    | hub id           |
//! | 5      | 2    | serial number    |
//! | 7      | 1    | protocol version |
//! | 8      | 2    | declared length  |
//! | 10     | 3    | firmware (BCD)   |
//! | 13     | 6    | hub MAC, reversed|
//! | 19     | 1    | command code     |

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::bytes::{format_firmware, format_mac, read_be, reversed};
use crate::{HubError, Result};

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Command code carried in header byte 19.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Command {
    /// ANT+ page set
    Ant,
    /// BLE advertisement set
    Ble,
    /// Hub heartbeat, answered with an ack frame
    Heartbeat,
    /// Reserved for future firmware
    Unknown(u8),
}

impl Command {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Command::Ant,
            2 => Command::Ble,
            4 => Command::Heartbeat,
            other => Command::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::Ant => 1,
            Command::Ble => 2,
            Command::Heartbeat => 4,
            Command::Unknown(code) => code,
        }
    }
}

/// Header fields shared by every reading decoded from one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct PacketHeader {
    pub magic: u8,
    pub hub_id: u32,
    pub serial_number: u16,
    pub version: u8,
    pub packet_len: u16,
    /// Firmware version rendered as `NN.NN.NN`
    pub firmware: String,
    /// Hub MAC, colon separated, most significant octet first
    pub hub_mac: String,
    pub command: Command,
}

impl PacketHeader {
    /// Parse the header at the start of an unescaped frame body.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        if frame.len() < HEADER_SIZE {
            return Err(HubError::structural(
                "packet header",
                format!("need {} bytes, frame has {}", HEADER_SIZE, frame.len()),
                frame,
            ));
        }

        let header = Self {
            magic: frame[0],
            hub_id: read_be(frame, 1, 4).unwrap_or_default() as u32,
            serial_number: read_be(frame, 5, 2).unwrap_or_default() as u16,
            version: frame[7],
            packet_len: read_be(frame, 8, 2).unwrap_or_default() as u16,
            firmware: format_firmware(&frame[10..13]),
            hub_mac: format_mac(&reversed(&frame[13..19])),
            command: Command::from_code(frame[19]),
        };

        trace!(
            hub_id = header.hub_id,
            serial = header.serial_number,
            command = header.command.code(),
            "Parsed packet header"
        );

        Ok(header)
    }

    /// Hub id bytes as they appear on the wire.
    pub fn hub_id_bytes(&self) -> [u8; 4] {
        self.hub_id.to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<u8> {
        vec![
            0xAA, // magic
            0x00, 0x01, 0x02, 0x03, // hub id
            0x00, 0x2A, // serial
            0x01, // version
            0x00, 0x30, // length
            0x01, 0x0C, 0x05, // firmware
            0x66, 0x55, 0x44, 0x33, 0x22, 0x11, // mac, reversed
            0x02, // command
        ]
    }

    #[test]
    fn parses_all_fields() {
        let header = PacketHeader::parse(&sample_header()).expect("header should parse");
        assert_eq!(header.magic, 0xAA);
        assert_eq!(header.hub_id, 0x0001_0203);
        assert_eq!(header.serial_number, 42);
        assert_eq!(header.version, 1);
        assert_eq!(header.packet_len, 0x30);
        assert_eq!(header.firmware, "01.12.05");
        assert_eq!(header.hub_mac, "11:22:33:44:55:66");
        assert_eq!(header.command, Command::Ble);
        assert_eq!(header.hub_id_bytes(), [0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn truncated_header_is_structural_error() {
        let bytes = &sample_header()[..19];
        let err = PacketHeader::parse(bytes).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Structural);
        assert_eq!(err.offending_bytes(), Some(bytes));
    }

    #[test]
    fn command_codes_round_trip() {
        for code in [1u8, 2, 4, 9] {
            assert_eq!(Command::from_code(code).code(), code);
        }
        assert_eq!(Command::from_code(3), Command::Unknown(3));
    }
}
