//! ANT+ page records.
//!
//! ## Record layout (15 bytes)
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 1    | page type / device type                |
//! | 0      | 2    | extended-addressing marker (BE)        |
//! | 2      | 4    | device id (BE)                         |
//! | 6      | 8    | ANT data page                          |
//! | 14     | 1    | RSSI, stored as an unsigned byte       |

use tracing::trace;

use super::rate::{RateMetric, RateTracker, cadence_rpm, speed_kmh};
use crate::codec::bytes::{read_be, read_le};
use crate::packet::PacketHeader;
use crate::types::{AntCadence, AntHeartRate, AntSpeed, SensorReading};
use crate::{HubError, Result};

/// Size of one ANT record inside an application record.
pub const ANT_PAGE_SIZE: usize = 15;

/// Heart-rate monitor page.
pub const PAGE_HEART_RATE: u8 = 0x78;
/// Bike cadence sensor page.
pub const PAGE_CADENCE: u8 = 0x7A;
/// Bike speed sensor page.
pub const PAGE_SPEED: u8 = 0x7B;

/// Marker in bytes 0..2 announcing extended (transmission-type) addressing.
const EXTENDED_ADDRESS_MARKER: u64 = 0xABCD;

const DATA_PAGE_OFFSET: usize = 6;

/// Default wheel perimeter, in millimeters.
pub const DEFAULT_PERIMETER_MM: u32 = 2340;

/// Device id of an ANT record.
///
/// Records starting with `00 00` or the `AB CD` marker use extended
/// addressing: the upper nibble of byte 1 is prepended to the low 16 bits
/// of the id field, and a zero nibble means the id is unknown.
pub fn device_id(page: &[u8]) -> u32 {
    let marker = read_be(page, 0, 2).unwrap_or_default();
    if marker == 0 || marker == EXTENDED_ADDRESS_MARKER {
        let extension = u32::from(page.get(1).copied().unwrap_or_default() >> 4);
        if extension == 0 {
            return 0;
        }
        let low = read_be(page, 4, 2).unwrap_or_default() as u32;
        return extension << 16 | low;
    }
    read_be(page, 2, 4).unwrap_or_default() as u32
}

/// RSSI with the hub's bias applied: the byte is read unsigned, minus 256.
fn rssi(page: &[u8]) -> i32 {
    page.last().map(|&b| i32::from(b) - 256).unwrap_or_default()
}

/// Decodes ANT records, holding rate state across frames.
#[derive(Debug)]
pub struct AntPageDecoder {
    rates: RateTracker,
    perimeter_mm: u32,
}

impl Default for AntPageDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_PERIMETER_MM)
    }
}

impl AntPageDecoder {
    pub fn new(perimeter_mm: u32) -> Self {
        Self { rates: RateTracker::new(), perimeter_mm }
    }

    pub fn perimeter_mm(&self) -> u32 {
        self.perimeter_mm
    }

    /// Change the wheel perimeter used for speed; existing rate state is kept.
    pub fn set_perimeter_mm(&mut self, perimeter_mm: u32) {
        self.perimeter_mm = perimeter_mm;
    }

    pub fn rates(&self) -> &RateTracker {
        &self.rates
    }

    /// Decode one record. Unknown page types yield `Ok(None)`.
    pub fn decode(&mut self, header: &PacketHeader, page: &[u8]) -> Result<Option<SensorReading>> {
        if page.len() < ANT_PAGE_SIZE {
            return Err(HubError::structural(
                "ANT page",
                format!("need {} bytes, record has {}", ANT_PAGE_SIZE, page.len()),
                page,
            ));
        }

        let device_id = device_id(page);
        let reading = match page[0] {
            PAGE_HEART_RATE => SensorReading::AntHeartRate(AntHeartRate {
                header: header.clone(),
                device_id,
                device_type: page[0],
                heart_rate: page[13],
                battery: (page[6] == 7).then_some(page[7]),
                rssi: rssi(page),
            }),
            PAGE_CADENCE => {
                let data = &page[DATA_PAGE_OFFSET..DATA_PAGE_OFFSET + 8];
                let time = read_le(data, 0, 2).unwrap_or_default() as f64 / 1024.0;
                let count = read_le(data, 2, 2).unwrap_or_default() as f64;
                let cadence =
                    self.rates.observe(device_id, RateMetric::Cadence, time, count, cadence_rpm);
                SensorReading::AntCadence(AntCadence {
                    header: header.clone(),
                    device_id,
                    cadence: cadence as u64,
                    rssi: rssi(page),
                })
            }
            PAGE_SPEED => {
                // Speed sensors put the revolution count first.
                let data = &page[DATA_PAGE_OFFSET..DATA_PAGE_OFFSET + 8];
                let count = read_le(data, 0, 2).unwrap_or_default() as f64;
                let time = read_le(data, 2, 2).unwrap_or_default() as f64 / 1024.0;
                let perimeter = self.perimeter_mm;
                let speed = self.rates.observe(device_id, RateMetric::Speed, time, count, |dc, dt| {
                    speed_kmh(dc, dt, perimeter)
                });
                SensorReading::AntSpeed(AntSpeed {
                    header: header.clone(),
                    device_id,
                    speed,
                    rssi: rssi(page),
                    perimeter_mm: perimeter,
                })
            }
            other => {
                trace!(page_type = other, device_id, "Ignoring unknown ANT page type");
                return Ok(None);
            }
        };

        trace!(kind = reading.kind(), device_id, "Decoded ANT page");
        Ok(Some(reading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Command;
    use crate::test_utils::ant_rate_page;

    fn header() -> PacketHeader {
        PacketHeader {
            magic: 0xAA,
            hub_id: 1,
            serial_number: 0,
            version: 1,
            packet_len: 0,
            firmware: "01.00.00".to_string(),
            hub_mac: "00:00:00:00:00:01".to_string(),
            command: Command::Ant,
        }
    }

    #[test]
    fn plain_device_id() {
        let page = [0x78, 0x01, 0x00, 0x01, 0xE2, 0x40, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(device_id(&page), 123_456);
    }

    #[test]
    fn extended_device_id_uses_nibble_and_low_bytes() {
        let page = [0xAB, 0xCD, 0xFF, 0xFF, 0x12, 0x34, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(device_id(&page), 0x0C_1234);

        let page = [0x00, 0x00, 0x00, 0x00, 0x12, 0x34, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(device_id(&page), 0);
    }

    #[test]
    fn heart_rate_page() {
        let mut page = vec![0x78, 0x01, 0x00, 0x00, 0x30, 0x39, 7, 85, 0, 0, 0, 0, 0, 142, 0xC4];
        let mut decoder = AntPageDecoder::default();
        let Some(SensorReading::AntHeartRate(hr)) = decoder.decode(&header(), &page).unwrap() else {
            panic!("expected heart rate");
        };
        assert_eq!(hr.device_id, 12345);
        assert_eq!(hr.device_type, 0x78);
        assert_eq!(hr.heart_rate, 142);
        assert_eq!(hr.battery, Some(85));
        assert_eq!(hr.rssi, -60);

        page[6] = 4;
        let Some(SensorReading::AntHeartRate(hr)) = decoder.decode(&header(), &page).unwrap() else {
            panic!("expected heart rate");
        };
        assert_eq!(hr.battery, None);
    }

    #[test]
    fn cadence_from_consecutive_pages() {
        let mut decoder = AntPageDecoder::default();
        // time ticks first, then revolutions
        let first = ant_rate_page(PAGE_CADENCE, 7, 1024, 10);
        let second = ant_rate_page(PAGE_CADENCE, 7, 3072, 13);

        let reading = decoder.decode(&header(), &first).unwrap();
        assert!(matches!(reading, Some(SensorReading::AntCadence(ref c)) if c.cadence == 0));
        let Some(SensorReading::AntCadence(cadence)) = decoder.decode(&header(), &second).unwrap()
        else {
            panic!("expected cadence");
        };
        assert_eq!(cadence.cadence, 90);
        assert_eq!(cadence.rssi, -56);
    }

    #[test]
    fn speed_from_consecutive_pages() {
        let mut decoder = AntPageDecoder::new(2000);
        // revolutions first, then time ticks
        decoder.decode(&header(), &ant_rate_page(PAGE_SPEED, 9, 100, 1024)).unwrap();
        let Some(SensorReading::AntSpeed(speed)) =
            decoder.decode(&header(), &ant_rate_page(PAGE_SPEED, 9, 105, 3072)).unwrap()
        else {
            panic!("expected speed");
        };
        // 5 revs / 2 s * 2000 mm * 3.6 / 1000
        assert_eq!(speed.speed, 18.0);
        assert_eq!(speed.perimeter_mm, 2000);
    }

    #[test]
    fn unknown_page_type_is_ignored() {
        let mut decoder = AntPageDecoder::default();
        assert_eq!(decoder.decode(&header(), &[0x50; 15]).unwrap(), None);
    }

    #[test]
    fn short_record_is_structural_error() {
        let mut decoder = AntPageDecoder::default();
        assert!(decoder.decode(&header(), &[0x78; 10]).is_err());
    }
}
