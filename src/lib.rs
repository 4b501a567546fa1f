//! Decoder for fitness sensor hubs that relay ANT+ and BLE telemetry.
//!
//! A hub uploads byte-stuffed, checksummed frames over a serial or network
//! transport. Each frame carries a fixed header plus `{key, length, data}`
//! records holding ANT+ pages, BLE advertisements or the hub's own status
//! heartbeat. [`HubDecoder`] turns arbitrary transport reads into typed
//! [`SensorReading`]s and answers heartbeats with an acknowledgement frame.
//!
//! # Features
//!
//! - **Streaming reassembly**: frames may be split across or packed into reads
//! - **ANT+**: heart rate, cadence and speed with rollover-safe rate tracking
//! - **BLE**: vendor wearables, boxing gloves and standard GATT services
//! - **Resilient**: a bad frame or record is reported and skipped, never fatal
//!
//! # Quick Start
//!
//! ```rust
//! use sensorhub::packet::{Command, FrameBuilder};
//! use sensorhub::sink::Listeners;
//! use sensorhub::{HubDecoder, SensorReading};
//!
//! fn main() -> sensorhub::Result<()> {
//!     let listeners = Listeners::new().reading(|reading: &SensorReading| {
//!         println!("{} from hub {}", reading.kind(), reading.header().hub_id);
//!     });
//!     let mut decoder = HubDecoder::builder().sink(listeners).build()?;
//!
//!     // One ANT+ heart-rate page from device 12345
//!     let page = [0x78, 0x01, 0x00, 0x00, 0x30, 0x39, 0, 0, 0, 0, 0, 0, 0, 72, 0xC4];
//!     let frame = FrameBuilder::new(Command::Ant).hub_id(7).record(1, &page).build();
//!
//!     let summary = decoder.feed(&frame);
//!     assert_eq!(summary.readings, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Example (serial port on a task)
//!
//! ```rust,no_run
//! use sensorhub::sources::ReaderSource;
//! use sensorhub::{ChannelSink, Driver, HubConfig, HubDecoder};
//! use futures::StreamExt;
//!
//! # async fn run(port: tokio::io::DuplexStream) -> sensorhub::Result<()> {
//! let sink = ChannelSink::default();
//! let mut events = sink.subscribe();
//!
//! let config = HubConfig::from_yaml_file("hub.yaml")?;
//! let decoder = HubDecoder::builder().config(config).sink(sink).build()?;
//! let driver = Driver::spawn(ReaderSource::new(port), decoder);
//!
//! while let Some(Ok(event)) = events.next().await {
//!     println!("{event:?}");
//! }
//! # let _ = driver.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Core types and error handling
pub mod codec;
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire decoding
pub mod ant;
pub mod ble;
pub mod frame;
pub mod hub;
pub mod packet;

// Delivery and background tasks
pub mod driver;
pub mod sink;
pub mod source;
pub mod sources;
pub mod watchdog;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::HubConfig;
pub use driver::{Driver, DriverHandle, DriverReport, ExitReason};
pub use hub::{FeedSummary, HubDecoder, HubDecoderBuilder};
pub use packet::{Command, PacketHeader};
pub use sink::{AckSender, ChannelSink, EventSink, Listeners, NullSink};
pub use source::ChunkSource;
