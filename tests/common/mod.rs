//! Frame fixtures for integration tests, built with the public encoder.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sensorhub::packet::{Command, FrameBuilder};
use sensorhub::sink::Listeners;
use sensorhub::SensorReading;

pub const HUB_ID: u32 = 0x00C0_FFEE;
pub const HUB_MAC: [u8; 6] = [0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6];

/// Log output for a failing test; `RUST_LOG=sensorhub=trace` shows every record.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn hub_frame(command: Command) -> FrameBuilder {
    FrameBuilder::new(command).hub_id(HUB_ID).serial_number(12).firmware([2, 1, 0]).hub_mac(HUB_MAC)
}

/// ANT+ heart-rate page with a battery byte.
pub fn ant_heart_rate(device_id: u32, heart_rate: u8) -> Vec<u8> {
    let mut page = vec![0x78, 0x01];
    page.extend_from_slice(&device_id.to_be_bytes());
    page.extend([7, 95, 0, 0, 0, 0, 0, heart_rate, 0xC4]);
    page
}

pub fn ant_frame(device_id: u32, heart_rate: u8) -> Vec<u8> {
    hub_frame(Command::Ant).record(1, &ant_heart_rate(device_id, heart_rate)).build()
}

pub fn heartbeat_frame() -> Vec<u8> {
    let mut record = vec![80, 2, 1, 4, 0, 0, 0xC8, 1, 8, 4];
    record.extend_from_slice(b"gym1");
    record.extend_from_slice(b"10.0.0.9");
    record.extend_from_slice(b"7000");
    hub_frame(Command::Heartbeat).record(1, &record).build()
}

/// Everything a decoder reported, in arrival order.
#[derive(Debug, Default)]
pub struct Recorded {
    pub readings: Vec<SensorReading>,
    pub errors: Vec<String>,
    pub raw_frames: usize,
}

pub fn recording_listeners() -> (Listeners, Arc<Mutex<Recorded>>) {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (r, e, f) = (recorded.clone(), recorded.clone(), recorded.clone());
    let listeners = Listeners::new()
        .reading(move |reading| r.lock().unwrap().readings.push(reading.clone()))
        .decode_error(move |error| e.lock().unwrap().errors.push(error.to_string()))
        .raw_frame(move |_| f.lock().unwrap().raw_frames += 1);
    (listeners, recorded)
}
