//! Application payload walking and routing.
//!
//! The payload is a run of `{key: u8, length: u16 BE, data}` records. Only
//! key `1` carries sensor data today; other keys are skipped by length. What
//! the data holds depends on the header command:
//!
//! - ANT: back-to-back fixed 15-byte pages
//! - BLE: variable records, each prefixed by its own length minus one
//! - heartbeat: a single status record

use tracing::trace;

use super::header::Command;
use crate::ant::ANT_PAGE_SIZE;
use crate::codec::bytes::read_be;
use crate::{HubError, Result};

/// Key of records that carry sensor data.
pub const SENSOR_RECORD_KEY: u8 = 1;

const RECORD_HEADER_SIZE: usize = 3;

/// One `{key, length, data}` entry of the application payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationRecord<'a> {
    pub key: u8,
    pub data: &'a [u8],
}

/// A sub-record ready for a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed<'a> {
    AntPage(&'a [u8]),
    BleRecord(&'a [u8]),
    Heartbeat(&'a [u8]),
}

/// Iterator over application records.
///
/// Yields an error and stops if a record header or body overruns the payload.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    payload: &'a [u8],
    consumed: usize,
    failed: bool,
}

/// Walk the application payload.
pub fn records(payload: &[u8]) -> Records<'_> {
    Records { payload, consumed: 0, failed: false }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<ApplicationRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.consumed >= self.payload.len() {
            return None;
        }

        let offset = self.consumed;
        let remaining = self.payload.len() - offset;
        let Some(length) = read_be(self.payload, offset + 1, 2).map(|l| l as usize) else {
            self.failed = true;
            return Some(Err(HubError::structural(
                "application record",
                format!("{remaining} trailing bytes cannot hold a record header"),
                &self.payload[offset..],
            )));
        };

        let start = offset + RECORD_HEADER_SIZE;
        let Some(data) = self.payload.get(start..start + length) else {
            self.failed = true;
            return Some(Err(HubError::structural(
                "application record",
                format!(
                    "declared length {} exceeds remaining {} bytes",
                    length,
                    remaining - RECORD_HEADER_SIZE
                ),
                &self.payload[offset..],
            )));
        };

        self.consumed = start + length;
        Some(Ok(ApplicationRecord { key: self.payload[offset], data }))
    }
}

/// Split a payload into decoder inputs according to `command`.
///
/// Errors are returned in place; everything routed before an error is kept.
pub fn route(command: Command, payload: &[u8]) -> Vec<Result<Routed<'_>>> {
    let mut routed = Vec::new();

    if let Command::Unknown(code) = command {
        trace!(command = code, "Ignoring frame with unknown command");
        return routed;
    }

    for record in records(payload) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                routed.push(Err(e));
                break;
            }
        };

        if record.key != SENSOR_RECORD_KEY {
            trace!(key = record.key, len = record.data.len(), "Skipping reserved record key");
            continue;
        }

        match command {
            Command::Ant => {
                let pages = record.data.chunks_exact(ANT_PAGE_SIZE);
                if !pages.remainder().is_empty() {
                    trace!(left = pages.remainder().len(), "Ignoring partial ANT page");
                }
                routed.extend(pages.map(|page| Ok(Routed::AntPage(page))));
            }
            Command::Ble => split_ble_records(record.data, &mut routed),
            Command::Heartbeat => routed.push(Ok(Routed::Heartbeat(record.data))),
            Command::Unknown(_) => {}
        }
    }

    routed
}

fn split_ble_records<'a>(data: &'a [u8], routed: &mut Vec<Result<Routed<'a>>>) {
    let mut offset = 0;
    while offset < data.len() {
        let record_len = usize::from(data[offset]) + 1;
        match data.get(offset..offset + record_len) {
            Some(record) => routed.push(Ok(Routed::BleRecord(record))),
            None => {
                routed.push(Err(HubError::structural(
                    "BLE record",
                    format!(
                        "declared length {} exceeds remaining {} bytes",
                        record_len,
                        data.len() - offset
                    ),
                    &data[offset..],
                )));
                return;
            }
        }
        offset += record_len;
    }
}
