//! Reference encoder for hub frames.
//!
//! Produces exactly what the hub puts on the wire, which makes it useful for
//! simulators and fixtures as well as for the heartbeat acknowledgement.

use super::header::{Command, HEADER_SIZE};
use crate::codec::{escape, seal};
use crate::frame::TRAILER_SIZE;

/// Builder for a complete, escaped frame.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    magic: u8,
    hub_id: u32,
    serial_number: u16,
    version: u8,
    firmware: [u8; 3],
    /// Display order; written reversed
    hub_mac: [u8; 6],
    command: u8,
    payload: Vec<u8>,
}

impl FrameBuilder {
    pub fn new(command: Command) -> Self {
        Self {
            magic: 0xAA,
            hub_id: 0,
            serial_number: 0,
            version: 1,
            firmware: [0; 3],
            hub_mac: [0; 6],
            command: command.code(),
            payload: Vec::new(),
        }
    }

    pub fn magic(mut self, magic: u8) -> Self {
        self.magic = magic;
        self
    }

    pub fn hub_id(mut self, hub_id: u32) -> Self {
        self.hub_id = hub_id;
        self
    }

    pub fn serial_number(mut self, serial_number: u16) -> Self {
        self.serial_number = serial_number;
        self
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn firmware(mut self, firmware: [u8; 3]) -> Self {
        self.firmware = firmware;
        self
    }

    /// Hub MAC in display order (`11:22:…` → `[0x11, 0x22, …]`).
    pub fn hub_mac(mut self, hub_mac: [u8; 6]) -> Self {
        self.hub_mac = hub_mac;
        self
    }

    /// Append one `{key, length, data}` application record.
    pub fn record(mut self, key: u8, data: &[u8]) -> Self {
        self.payload.push(key);
        self.payload.extend_from_slice(&(data.len() as u16).to_be_bytes());
        self.payload.extend_from_slice(data);
        self
    }

    /// Append bytes to the application payload as-is.
    pub fn raw_payload(mut self, bytes: &[u8]) -> Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    /// Unescaped body: header, payload and checksum.
    pub fn body(&self) -> Vec<u8> {
        let total = HEADER_SIZE + self.payload.len() + TRAILER_SIZE;
        let mut body = Vec::with_capacity(total);
        body.push(self.magic);
        body.extend_from_slice(&self.hub_id.to_be_bytes());
        body.extend_from_slice(&self.serial_number.to_be_bytes());
        body.push(self.version);
        body.extend_from_slice(&(total as u16).to_be_bytes());
        body.extend_from_slice(&self.firmware);
        body.extend(self.hub_mac.iter().rev());
        body.push(self.command);
        body.extend_from_slice(&self.payload);
        seal(&mut body);
        body
    }

    /// Escaped frame including delimiters.
    pub fn build(&self) -> Vec<u8> {
        escape(&self.body())
    }
}
