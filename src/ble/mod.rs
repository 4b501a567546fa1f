//! BLE advertisements relayed by the hub.

pub mod advertisement;
pub mod sensor;

pub use advertisement::parse as parse_advertisement;
pub use sensor::{MIN_SENSOR_BLE_LEN, decode};
