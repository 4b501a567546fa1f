//! Wire fixtures shared by unit tests and benchmarks.
//!
//! Everything here produces bytes exactly as a hub would send them, using
//! [`FrameBuilder`] for the envelope.

use crate::packet::{Command, FrameBuilder};

/// Hub id written into every fixture frame.
pub const FIXTURE_HUB_ID: u32 = 0x0102_0304;

/// Hub MAC of every fixture frame, display order.
pub const FIXTURE_HUB_MAC: [u8; 6] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

/// Complete escaped frame for a command code and raw application payload.
pub fn build_frame(command: u8, payload: &[u8]) -> Vec<u8> {
    FrameBuilder::new(Command::from_code(command))
        .hub_id(FIXTURE_HUB_ID)
        .serial_number(1)
        .firmware([1, 2, 3])
        .hub_mac(FIXTURE_HUB_MAC)
        .raw_payload(payload)
        .build()
}

/// One `{key, length, data}` application record.
pub fn tlv(key: u8, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 3);
    out.push(key);
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// 15-byte ANT+ heart-rate page.
///
/// `device_id` must not start with `00 00` or `AB CD` to be read back
/// verbatim. The battery byte is only honored when `battery` is set.
pub fn ant_heart_rate_page(
    device_id: u32,
    heart_rate: u8,
    battery: Option<u8>,
    rssi: u8,
) -> Vec<u8> {
    let mut page = vec![0x78, 0x01];
    page.extend_from_slice(&device_id.to_be_bytes());
    match battery {
        Some(level) => page.extend([7, level]),
        None => page.extend([0, 0]),
    }
    page.extend([0; 5]);
    page.push(heart_rate);
    page.push(rssi);
    page
}

/// 15-byte ANT+ cadence or speed page carrying two little-endian words.
///
/// Cadence pages hold `{time, count}`, speed pages `{count, time}`.
pub fn ant_rate_page(page_type: u8, device_id: u32, first: u16, second: u16) -> Vec<u8> {
    let mut page = vec![page_type, 0x01];
    page.extend_from_slice(&device_id.to_be_bytes());
    page.extend_from_slice(&first.to_le_bytes());
    page.extend_from_slice(&second.to_le_bytes());
    page.extend([0; 4]);
    page.push(0xC8);
    page
}

/// Heartbeat record with fixed IP and port strings.
pub fn heartbeat_record(battery: u8) -> Vec<u8> {
    let ip = b"192.168.1.20";
    let port = b"8899";
    let mut record = vec![battery, 2, 1, 0, 0, 0, 0xC0, 1, ip.len() as u8, port.len() as u8];
    record.extend_from_slice(ip);
    record.extend_from_slice(port);
    record
}

/// BLE record wrapping one manufacturer AD structure, company id first.
///
/// RSSI byte `0xB0` and device MAC `01:02:03:04:05:06`.
pub fn vendor_ble_record(manufacturer_payload: &[u8]) -> Vec<u8> {
    let mut region = vec![(manufacturer_payload.len() + 1) as u8, 0xFF];
    region.extend_from_slice(manufacturer_payload);
    ble_record(region, 0xB0)
}

/// Standard Heart Rate service advertisement with a local name.
///
/// Flags, then service data for UUID 180D (company 0x1234, battery 88),
/// then the name. The SOS byte lands at record offset 16.
pub fn standard_heart_rate_record(name: &str, heart_rate: u8, sos: bool) -> Vec<u8> {
    let mut region = vec![0x02, 0x01, 0x06];
    region.extend([0x0C, 0x16, 0x0D, 0x18, 0x08, 0x00, 0x34, 0x12, 0x00, 88, 0x00]);
    region.push(heart_rate);
    region.push(u8::from(sos));
    region.push((name.len() + 1) as u8);
    region.push(0x09);
    region.extend_from_slice(name.as_bytes());
    ble_record(region, 0xC0)
}

/// Cycling speed and cadence service advertisement.
pub fn cycling_record(wheel: u32, time: u16) -> Vec<u8> {
    let mut region = vec![0x02, 0x01, 0x06, 0x0C, 0x16, 0x16, 0x18, 0, 0, 0, 0];
    region.extend_from_slice(&wheel.to_le_bytes()[..3]);
    region.extend_from_slice(&time.to_le_bytes());
    ble_record(region, 0xC0)
}

fn ble_record(region: Vec<u8>, rssi: u8) -> Vec<u8> {
    let mut out = vec![(region.len() + 7) as u8];
    out.extend(region);
    out.push(rssi);
    out.extend([6, 5, 4, 3, 2, 1]);
    out
}
