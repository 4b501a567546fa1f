//! Wire-level primitives: byte stuffing, field readers and the frame checksum.

pub mod bytes;
pub mod checksum;

pub use bytes::{END, ESCAPE, START, escape, has_valid_escapes, unescape};
pub use checksum::{checksum, seal, verify};
