//! Sensor broadcasts carried in BLE advertisements.
//!
//! Vendor wearables put a subtype at byte 5 of the record, just after the
//! company id. Devices that only advertise a standard GATT service are
//! recognised by the 16-bit service UUID at bytes 6..8 instead.
//!
//! | selector           | reading                  |
//! |--------------------|--------------------------|
//! | byte 5 = `A1`/`A2` | wearable heart rate      |
//! | byte 5 = `A4`      | boxing glove             |
//! | byte 5 = `A5`      | boxing glove heart rate  |
//! | UUID `180D`        | standard heart rate      |
//! | UUID `1816`        | cycling speed/cadence    |

use tracing::{debug, trace};

use super::advertisement;
use crate::codec::bytes::{read_be, read_le, reversed, to_hex_lower};
use crate::packet::PacketHeader;
use crate::types::{
    BleAdvertisement, BleBoxing, BleBoxingHeartRate, BleCadence, BleHeartRate, Fist, Hand,
    PunchStats, SensorReading,
};
use crate::{HubError, Result};

/// Records with `ble_len` at or below this carry no sensor payload.
pub const MIN_SENSOR_BLE_LEN: u8 = 10;

pub const SUBTYPE_HEART_RATE: u8 = 0xA1;
pub const SUBTYPE_HEART_RATE_EXTENDED: u8 = 0xA2;
pub const SUBTYPE_BOXING: u8 = 0xA4;
pub const SUBTYPE_BOXING_HEART_RATE: u8 = 0xA5;

/// Heart Rate service UUID, little-endian as it appears in the record.
const SERVICE_HEART_RATE: [u8; 2] = [0x0D, 0x18];
/// Cycling Speed and Cadence service UUID.
const SERVICE_CYCLING: [u8; 2] = [0x16, 0x18];

/// Name prefix of wristbands with a panic button.
const SOS_NAME_PREFIX: &str = "XW100";
const SOS_MIN_SERVICE_LEN: u8 = 8;

/// Decode one BLE record. Unrecognised broadcasts yield `Ok(None)`.
///
/// A [`BleHeartRate`] with `sos` set should additionally be surfaced as an
/// SOS event.
pub fn decode(header: &PacketHeader, record: &[u8]) -> Result<Option<SensorReading>> {
    let Some(&ble_len) = record.first() else {
        return Ok(None);
    };
    if ble_len <= MIN_SENSOR_BLE_LEN {
        trace!(ble_len, "Ignoring short BLE record");
        return Ok(None);
    }

    let advertisement = advertisement::parse(record)?;
    let reader = Fields { record };

    let reading = match record[5] {
        subtype @ (SUBTYPE_HEART_RATE | SUBTYPE_HEART_RATE_EXTENDED) => {
            wearable_heart_rate(header, advertisement, &reader, subtype)?
        }
        SUBTYPE_BOXING => boxing(header, advertisement, &reader)?,
        SUBTYPE_BOXING_HEART_RATE => boxing_heart_rate(header, advertisement, &reader)?,
        _ => match [record[6], record[7]] {
            SERVICE_HEART_RATE => standard_heart_rate(header, advertisement, &reader)?,
            SERVICE_CYCLING => cycling(header, advertisement, &reader)?,
            service => {
                trace!(
                    subtype = record[5],
                    service = %to_hex_lower(&service),
                    mac = %advertisement.mac,
                    "Ignoring unrecognised BLE broadcast"
                );
                return Ok(None);
            }
        },
    };

    trace!(kind = reading.kind(), "Decoded BLE record");
    Ok(Some(reading))
}

/// Bounds-checked field access into one record.
struct Fields<'a> {
    record: &'a [u8],
}

impl Fields<'_> {
    fn be(&self, offset: usize, len: usize, field: &str) -> Result<u64> {
        read_be(self.record, offset, len).ok_or_else(|| self.overrun(offset + len, field))
    }

    fn le(&self, offset: usize, len: usize, field: &str) -> Result<u64> {
        read_le(self.record, offset, len).ok_or_else(|| self.overrun(offset + len, field))
    }

    fn byte(&self, offset: usize, field: &str) -> Result<u8> {
        self.be(offset, 1, field).map(|v| v as u8)
    }

    fn u16(&self, offset: usize, field: &str) -> Result<u16> {
        self.be(offset, 2, field).map(|v| v as u16)
    }

    fn u24(&self, offset: usize, field: &str) -> Result<u32> {
        self.be(offset, 3, field).map(|v| v as u32)
    }

    fn u32(&self, offset: usize, field: &str) -> Result<u32> {
        self.be(offset, 4, field).map(|v| v as u32)
    }

    fn overrun(&self, needed: usize, field: &str) -> HubError {
        HubError::structural(
            "BLE sensor record",
            format!("{field} needs {needed} bytes, record has {}", self.record.len()),
            self.record,
        )
    }
}

fn wearable_heart_rate(
    header: &PacketHeader,
    advertisement: BleAdvertisement,
    f: &Fields<'_>,
    subtype: u8,
) -> Result<SensorReading> {
    let extended = subtype == SUBTYPE_HEART_RATE_EXTENDED;
    let temperature = if extended {
        Some(f32::from(f.u16(18, "temperature")?) / 10.0)
    } else {
        None
    };
    let oxygen = if extended && f.record.len() > 21 { Some(f.byte(20, "oxygen")?) } else { None };

    Ok(SensorReading::BleHeartRate(BleHeartRate {
        header: header.clone(),
        device_id: f.u32(6, "device id")?,
        heart_rate: f.byte(10, "heart rate")?,
        battery: f.byte(11, "battery")?,
        steps: f.u24(12, "steps")?,
        calories: f.u24(15, "calories")? as f32 / 10.0,
        temperature,
        oxygen,
        sos: false,
        advertisement,
    }))
}

fn standard_heart_rate(
    header: &PacketHeader,
    mut advertisement: BleAdvertisement,
    f: &Fields<'_>,
) -> Result<SensorReading> {
    let service_len = f.byte(8, "service length")?;
    let company = f.be(10, 2, "manufacturer")? as u16;
    advertisement.manufacturer = to_hex_lower(&reversed(&company.to_be_bytes()));
    let battery = f.byte(13, "battery")?;
    let heart_rate = f.byte(15, "heart rate")?;

    let sos_capable = advertisement.name.as_deref().is_some_and(|n| n.starts_with(SOS_NAME_PREFIX))
        && service_len >= SOS_MIN_SERVICE_LEN;
    let sos = sos_capable && f.byte(16, "sos flag")? == 1;
    if sos {
        debug!(mac = %advertisement.mac, "SOS raised by wristband");
    }

    Ok(SensorReading::BleHeartRate(BleHeartRate {
        header: header.clone(),
        advertisement,
        device_id: 0,
        heart_rate,
        battery,
        steps: 0,
        calories: 0.0,
        temperature: None,
        oxygen: None,
        sos,
    }))
}

fn boxing(
    header: &PacketHeader,
    advertisement: BleAdvertisement,
    f: &Fields<'_>,
) -> Result<SensorReading> {
    let hand_byte = f.byte(13, "hand")?;
    let hand = if hand_byte & 0x01 != 0 { Hand::Right } else { Hand::Left };
    let fist = match hand_byte >> 1 {
        2 => Fist::Uppercut,
        1 => Fist::Swing,
        _ => Fist::Straight,
    };
    let trains = PunchStats::unpack(0, f.u16(14, "trains")?);

    Ok(SensorReading::BleBoxing(BleBoxing {
        header: header.clone(),
        advertisement,
        hub_id: f.u16(6, "hub id")?,
        group: f.byte(8, "group")?,
        device_id: f.u32(9, "device id")?,
        hand,
        fist,
        power: trains.power,
        speed: trains.speed,
        time: f.u16(16, "time")?,
        battery: f.byte(18, "battery")?,
        straight: PunchStats::unpack(f.u16(19, "straight")?, f.u16(21, "straight stats")?),
        swing: PunchStats::unpack(f.u16(23, "swing")?, f.u16(25, "swing stats")?),
        uppercut: PunchStats::unpack(f.u16(27, "uppercut")?, f.u16(29, "uppercut stats")?),
    }))
}

fn boxing_heart_rate(
    header: &PacketHeader,
    advertisement: BleAdvertisement,
    f: &Fields<'_>,
) -> Result<SensorReading> {
    Ok(SensorReading::BleBoxingHeartRate(BleBoxingHeartRate {
        header: header.clone(),
        advertisement,
        hub_id: f.u16(6, "hub id")?,
        group: f.byte(8, "group")?,
        device_id: f.u32(9, "device id")?,
        heart_rate: f.byte(13, "heart rate")?,
        battery: f.byte(14, "battery")?,
        steps: f.u24(15, "steps")?,
        calories: f.u24(18, "calories")? as f32 / 10.0,
    }))
}

fn cycling(
    header: &PacketHeader,
    advertisement: BleAdvertisement,
    f: &Fields<'_>,
) -> Result<SensorReading> {
    Ok(SensorReading::BleCadence(BleCadence {
        header: header.clone(),
        advertisement,
        wheel: f.le(12, 3, "wheel revolutions")? as u32,
        time: f.le(15, 2, "wheel event time")? as u16,
    }))
}
