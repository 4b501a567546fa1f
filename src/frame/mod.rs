//! Frame reassembly from a continuous byte stream.
//!
//! A frame on the wire is `7E <escaped body> 7F`, where the unescaped body is
//! the 20-byte [`PacketHeader`](crate::packet::PacketHeader), the application
//! payload, and a 2-byte checksum.

pub mod assembler;

pub use assembler::{Assembled, FrameAssembler};

use crate::packet::HEADER_SIZE;

/// Size of the checksum trailer.
pub const TRAILER_SIZE: usize = 2;

/// Smallest body that can hold a header and a trailer.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// An unescaped frame body whose checksum has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    bytes: Vec<u8>,
}

impl DecodedFrame {
    /// Wrap a verified body. Callers guarantee `bytes.len() >= MIN_FRAME_SIZE`.
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= MIN_FRAME_SIZE);
        Self { bytes }
    }

    /// Header, application payload and trailer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bytes between the header and the checksum trailer.
    pub fn application_payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..self.bytes.len() - TRAILER_SIZE]
    }

    /// Big-endian checksum trailer.
    pub fn checksum(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_be_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }
}
