//! Typed sensor readings.

use serde::{Deserialize, Serialize};

use crate::packet::PacketHeader;

/// ANT+ heart-rate page (type `0x78`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct AntHeartRate {
    pub header: PacketHeader,
    pub device_id: u32,
    pub device_type: u8,
    pub heart_rate: u8,
    /// Present only on pages that carry battery status
    pub battery: Option<u8>,
    pub rssi: i32,
}

/// ANT+ cadence page (type `0x7A`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct AntCadence {
    pub header: PacketHeader,
    pub device_id: u32,
    /// Revolutions per minute
    pub cadence: u64,
    pub rssi: i32,
}

/// ANT+ speed page (type `0x7B`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct AntSpeed {
    pub header: PacketHeader,
    pub device_id: u32,
    /// km/h, one decimal
    pub speed: f64,
    pub rssi: i32,
    /// Wheel perimeter used for the conversion, in millimeters
    pub perimeter_mm: u32,
}

/// Flags AD structure (type `0x01`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct AdvertisingFlags {
    pub limited_discoverable: bool,
    pub general_discoverable: bool,
    pub br_edr_unsupported: bool,
    pub controller_edr: bool,
    pub host_edr: bool,
}

/// Fields common to every BLE broadcast relayed by the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct BleAdvertisement {
    pub ble_len: u8,
    pub adv_len: u8,
    /// Company identifier, lower-case hex
    pub manufacturer: String,
    pub device_type: u8,
    pub rssi: i8,
    pub mac: String,
    pub name: Option<String>,
    pub flags: AdvertisingFlags,
    /// Service UUIDs, comma separated
    pub uuids: Option<String>,
    /// Manufacturer-specific AD payload (type `0xFF`)
    pub manufacturer_data: Vec<u8>,
}

/// BLE heart-rate broadcast (vendor `0xA1`/`0xA2` or the standard HR service).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct BleHeartRate {
    pub header: PacketHeader,
    pub advertisement: BleAdvertisement,
    pub device_id: u32,
    pub heart_rate: u8,
    pub battery: u8,
    pub steps: u32,
    /// kcal
    pub calories: f32,
    /// °C, `0xA2` only
    pub temperature: Option<f32>,
    /// SpO2 percent, `0xA2` only
    pub oxygen: Option<u8>,
    pub sos: bool,
}

/// Which hand threw the punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Hand {
    Left,
    Right,
}

/// Punch type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Fist {
    Straight,
    Swing,
    Uppercut,
}

/// Count plus packed power/speed for one punch type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct PunchStats {
    pub count: u16,
    pub power: u16,
    pub speed: u8,
}

impl PunchStats {
    /// Split a packed word: power in bits 7..16, speed in bits 0..7.
    pub fn unpack(count: u16, packed: u16) -> Self {
        Self { count, power: (packed >> 7) & 0x1FF, speed: (packed & 0x7F) as u8 }
    }
}

/// Boxing glove telemetry (`0xA4`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct BleBoxing {
    pub header: PacketHeader,
    pub advertisement: BleAdvertisement,
    /// Hub id as reported by the glove, not the relaying hub
    pub hub_id: u16,
    pub group: u8,
    pub device_id: u32,
    pub hand: Hand,
    pub fist: Fist,
    pub power: u16,
    pub speed: u8,
    pub time: u16,
    pub battery: u8,
    pub straight: PunchStats,
    pub swing: PunchStats,
    pub uppercut: PunchStats,
}

/// Boxing glove heart-rate broadcast (`0xA5`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct BleBoxingHeartRate {
    pub header: PacketHeader,
    pub advertisement: BleAdvertisement,
    pub hub_id: u16,
    pub group: u8,
    pub device_id: u32,
    pub heart_rate: u8,
    pub battery: u8,
    pub steps: u32,
    pub calories: f32,
}

/// Cycling speed/cadence service broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct BleCadence {
    pub header: PacketHeader,
    pub advertisement: BleAdvertisement,
    /// Cumulative wheel revolutions
    pub wheel: u32,
    /// Last wheel event time, 1/1024 s
    pub time: u16,
}

/// Hub status heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Heartbeat {
    pub header: PacketHeader,
    pub battery: u8,
    /// Upload interval in seconds
    pub send_frequency: f64,
    pub data_source: u8,
    pub rssi: i8,
    pub network_sign: u8,
    pub remarks: String,
    pub limit_ble_name: String,
    pub limit_uuid: String,
    pub ip: String,
    pub port: String,
    pub hardware_info: Option<String>,
    pub software_info: Option<String>,
}

/// One decoded sensor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SensorReading {
    AntHeartRate(AntHeartRate),
    AntCadence(AntCadence),
    AntSpeed(AntSpeed),
    BleHeartRate(BleHeartRate),
    BleBoxing(BleBoxing),
    BleBoxingHeartRate(BleBoxingHeartRate),
    BleCadence(BleCadence),
    Heartbeat(Heartbeat),
}

impl SensorReading {
    /// Header of the frame this reading came from.
    pub fn header(&self) -> &PacketHeader {
        match self {
            SensorReading::AntHeartRate(r) => &r.header,
            SensorReading::AntCadence(r) => &r.header,
            SensorReading::AntSpeed(r) => &r.header,
            SensorReading::BleHeartRate(r) => &r.header,
            SensorReading::BleBoxing(r) => &r.header,
            SensorReading::BleBoxingHeartRate(r) => &r.header,
            SensorReading::BleCadence(r) => &r.header,
            SensorReading::Heartbeat(r) => &r.header,
        }
    }

    /// Short name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SensorReading::AntHeartRate(_) => "ant_heart_rate",
            SensorReading::AntCadence(_) => "ant_cadence",
            SensorReading::AntSpeed(_) => "ant_speed",
            SensorReading::BleHeartRate(_) => "ble_heart_rate",
            SensorReading::BleBoxing(_) => "ble_boxing",
            SensorReading::BleBoxingHeartRate(_) => "ble_boxing_heart_rate",
            SensorReading::BleCadence(_) => "ble_cadence",
            SensorReading::Heartbeat(_) => "heartbeat",
        }
    }

    /// BLE advertisement fields, for the BLE variants.
    pub fn advertisement(&self) -> Option<&BleAdvertisement> {
        match self {
            SensorReading::BleHeartRate(r) => Some(&r.advertisement),
            SensorReading::BleBoxing(r) => Some(&r.advertisement),
            SensorReading::BleBoxingHeartRate(r) => Some(&r.advertisement),
            SensorReading::BleCadence(r) => Some(&r.advertisement),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punch_stats_unpack_bit_fields() {
        // power 300 (0b1_0010_1100), speed 45
        let packed = (300u16 << 7) | 45;
        let stats = PunchStats::unpack(12, packed);
        assert_eq!(stats, PunchStats { count: 12, power: 300, speed: 45 });
    }
}
