//! Stateful reassembly of delimited frames.
//!
//! Transports hand over bytes in arbitrary chunks: a frame may be split
//! anywhere (including between an escape introducer and its selector), and a
//! single read may carry several frames back to back. The assembler buffers
//! until a chunk ends with the END delimiter, then extracts every complete
//! `START … END` span from the buffer and clears it. A read that lands
//! mid-frame with nothing buffered only resynchronises on its first START.

use tracing::{debug, trace, warn};

use super::{DecodedFrame, MIN_FRAME_SIZE};
use crate::codec::bytes::to_hex_upper;
use crate::codec::{END, START, has_valid_escapes, unescape, verify};
use crate::{HubError, Result};

/// Buffered bytes above which an unterminated frame is abandoned.
pub const DEFAULT_MAX_BUFFERED: usize = 64 * 1024;

/// One delimited span pulled out of the stream.
#[derive(Debug)]
pub struct Assembled {
    /// The span as received, delimiters and escapes included
    pub raw: Vec<u8>,
    /// The verified frame, or why it was rejected
    pub frame: Result<DecodedFrame>,
}

/// Accumulates chunks until complete frames can be extracted.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_buffered: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_max_buffered(DEFAULT_MAX_BUFFERED)
    }

    /// Create an assembler that gives up on frames longer than `max_buffered`.
    pub fn with_max_buffered(max_buffered: usize) -> Self {
        Self { buffer: Vec::new(), max_buffered }
    }

    /// Bytes held while waiting for an END delimiter.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// True while part of a frame is buffered.
    pub fn has_open_frame(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Consume one transport read and return every span it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Assembled> {
        trace!(len = chunk.len(), chunk = %to_hex_upper(chunk), "Assembler input");

        if self.buffer.is_empty() && chunk.first() != Some(&START) {
            // Mid-frame bytes with nothing buffered: keep from the next START
            // and wait for a terminal chunk, even if this one ends with END.
            let Some(index) = chunk.iter().position(|&b| b == START) else {
                trace!(len = chunk.len(), "Discarding bytes outside a frame");
                return Vec::new();
            };
            debug!(skipped = index, "Resynchronising on frame start");
            self.buffer.extend_from_slice(&chunk[index..]);
            return self.enforce_limit();
        }

        let (Some(&first), Some(&last)) = (chunk.first(), chunk.last()) else {
            return Vec::new();
        };

        if last != END {
            if first == START {
                self.buffer.clear();
            }
            self.buffer.extend_from_slice(chunk);
            return self.enforce_limit();
        }

        self.buffer.extend_from_slice(chunk);
        let spans = self.extract();
        self.buffer.clear();
        spans
    }

    fn enforce_limit(&mut self) -> Vec<Assembled> {
        if self.buffer.len() <= self.max_buffered {
            return Vec::new();
        }
        warn!(
            buffered = self.buffer.len(),
            limit = self.max_buffered,
            "Unterminated frame exceeds buffer limit, dropping"
        );
        let raw = std::mem::take(&mut self.buffer);
        let error = HubError::framing(
            format!("unterminated frame exceeds {} bytes", self.max_buffered),
            raw.clone(),
        );
        vec![Assembled { raw, frame: Err(error) }]
    }

    fn extract(&self) -> Vec<Assembled> {
        let mut spans = Vec::new();
        let mut open: Option<usize> = None;

        for (i, &b) in self.buffer.iter().enumerate() {
            match b {
                START => open = Some(i),
                END => {
                    if let Some(start) = open.take() {
                        let raw = self.buffer[start..=i].to_vec();
                        let frame = Self::decode_span(&raw);
                        spans.push(Assembled { raw, frame });
                    }
                }
                _ => {}
            }
        }

        if spans.is_empty() {
            trace!(len = self.buffer.len(), "Terminal chunk without a complete frame");
        }
        spans
    }

    fn decode_span(raw: &[u8]) -> Result<DecodedFrame> {
        let body = &raw[1..raw.len() - 1];

        if !has_valid_escapes(body) {
            return Err(HubError::framing("abnormal data: malformed escape sequence", body));
        }

        let unescaped = unescape(body);
        if unescaped.len() < MIN_FRAME_SIZE {
            return Err(HubError::framing(
                format!("truncated frame: {} bytes, need {}", unescaped.len(), MIN_FRAME_SIZE),
                unescaped,
            ));
        }

        if !verify(&unescaped) {
            return Err(HubError::framing("verification error: checksum mismatch", unescaped));
        }

        debug!(len = unescaped.len(), "Frame verified");
        Ok(DecodedFrame::new(unescaped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_utils::{ant_heart_rate_page, build_frame, tlv};
    use proptest::prelude::*;

    fn sample_frame() -> Vec<u8> {
        build_frame(1, &tlv(1, &ant_heart_rate_page(0x1234_5678, 72, Some(90), 0xC4)))
    }

    fn frames(out: Vec<Assembled>) -> Vec<DecodedFrame> {
        out.into_iter().filter_map(|a| a.frame.ok()).collect()
    }

    #[test]
    fn single_chunk_yields_one_frame() {
        let mut assembler = FrameAssembler::new();
        let out = assembler.feed(&sample_frame());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw, sample_frame());
        assert!(out[0].frame.is_ok());
        assert!(!assembler.has_open_frame());
    }

    #[test]
    fn concatenated_frames_in_one_read() {
        let mut stream = sample_frame();
        stream.extend(build_frame(4, &tlv(1, &[0; 10])));
        let mut assembler = FrameAssembler::new();
        assert_eq!(frames(assembler.feed(&stream)).len(), 2);
    }

    #[test]
    fn leading_garbage_resyncs_and_waits_for_next_read() {
        let mut stream = vec![0x01, 0x02, 0x7F];
        stream.extend(sample_frame());
        let mut assembler = FrameAssembler::new();

        assert!(assembler.feed(&stream).is_empty());
        assert_eq!(assembler.buffered(), sample_frame().as_slice());

        // The next terminal read releases the buffered frame along with its own.
        assert_eq!(frames(assembler.feed(&sample_frame())).len(), 2);
        assert!(!assembler.has_open_frame());
    }

    #[test]
    fn bytes_without_start_are_discarded() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.feed(&[0x01, 0x02, 0x03]).is_empty());
        assert!(!assembler.has_open_frame());
    }

    #[test]
    fn new_start_discards_stale_partial_frame() {
        let frame = sample_frame();
        let mut assembler = FrameAssembler::new();
        assert!(assembler.feed(&frame[..10]).is_empty());
        // A fresh START chunk replaces the abandoned partial frame.
        assert!(assembler.feed(&frame[..12]).is_empty());
        assert_eq!(assembler.buffered(), &frame[..12]);
        assert_eq!(frames(assembler.feed(&frame[12..])).len(), 1);
    }

    #[test]
    fn corrupted_checksum_is_reported_and_buffer_cleared() {
        let mut frame = sample_frame();
        let n = frame.len();
        frame[n - 2] ^= 0x01;
        let mut assembler = FrameAssembler::new();
        let out = assembler.feed(&frame);
        assert_eq!(out.len(), 1);
        let err = out[0].frame.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Framing);
        assert!(err.to_string().contains("checksum"));
        assert!(!assembler.has_open_frame());

        assert_eq!(frames(assembler.feed(&sample_frame())).len(), 1);
    }

    #[test]
    fn malformed_escape_is_abnormal_data() {
        let mut assembler = FrameAssembler::new();
        let out = assembler.feed(&[0x7E, 0x01, 0x7D, 0x09, 0x02, 0x7F]);
        assert_eq!(out.len(), 1);
        let err = out[0].frame.as_ref().unwrap_err();
        assert!(err.to_string().contains("abnormal"));
    }

    #[test]
    fn short_frame_is_truncated_error() {
        let mut assembler = FrameAssembler::new();
        let out = assembler.feed(&[0x7E, 0x3A, 0x3A, 0x7F]);
        let err = out[0].frame.as_ref().unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn oversized_unterminated_frame_is_dropped() {
        let mut assembler = FrameAssembler::with_max_buffered(16);
        assert!(assembler.feed(&[0x7E, 0x01, 0x02]).is_empty());
        let out = assembler.feed(&[0x03; 20]);
        assert_eq!(out.len(), 1);
        assert!(out[0].frame.is_err());
        assert!(!assembler.has_open_frame());
    }

    #[test]
    fn byte_at_a_time_matches_single_call() {
        let frame = sample_frame();
        let mut whole = FrameAssembler::new();
        let expected = frames(whole.feed(&frame));

        let mut assembler = FrameAssembler::new();
        let mut got = Vec::new();
        for b in &frame {
            got.extend(frames(assembler.feed(std::slice::from_ref(b))));
        }
        assert_eq!(got, expected);
    }

    proptest! {
        #[test]
        fn prop_any_split_yields_identical_frame(
            cuts in prop::collection::btree_set(1usize..sample_frame().len(), 0..6),
        ) {
            let frame = sample_frame();
            let mut expected = FrameAssembler::new();
            let expected = frames(expected.feed(&frame));

            let mut bounds: Vec<usize> = cuts.into_iter().collect();
            bounds.push(frame.len());

            let mut assembler = FrameAssembler::new();
            let mut got = Vec::new();
            let mut from = 0;
            for to in bounds {
                got.extend(frames(assembler.feed(&frame[from..to])));
                from = to;
            }
            prop_assert_eq!(got, expected);
        }
    }
}
