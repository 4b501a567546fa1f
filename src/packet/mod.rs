//! Unescaped frame contents: header, application records, heartbeat and ack.

pub mod ack;
pub mod builder;
pub mod demux;
pub mod header;
pub mod heartbeat;

pub use ack::build_ack;
pub use builder::FrameBuilder;
pub use demux::{ApplicationRecord, Routed, SENSOR_RECORD_KEY, records, route};
pub use header::{Command, HEADER_SIZE, PacketHeader};
