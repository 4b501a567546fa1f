//! Frame trailer checksum.
//!
//! The trailer is the two's complement of the byte sum, XORed with `0x3A3A`.
//! Hub firmware derives the trailer by printing that 32-bit value as hex and
//! reading back the last four digits, so the computation below goes through
//! the same text form.

use super::bytes::from_hex;

const CHECKSUM_MASK: i32 = 0x3A3A;

/// Checksum of `payload` (the frame body without its two trailer bytes).
pub fn checksum(payload: &[u8]) -> u16 {
    let sum = payload.iter().fold(0i32, |acc, &b| acc.wrapping_add(i32::from(b)));
    let neu = 0i32.wrapping_sub(sum) ^ CHECKSUM_MASK;

    let hex = format!("{:X}", neu as u32);
    let tail = &hex[hex.len().saturating_sub(4)..];
    let tail = format!("{tail:0>4}");
    match from_hex(&tail).as_deref() {
        Some([hi, lo]) => u16::from_be_bytes([*hi, *lo]),
        _ => 0,
    }
}

/// Verify the big-endian trailer of an unescaped frame body.
pub fn verify(frame: &[u8]) -> bool {
    let Some(split) = frame.len().checked_sub(2) else {
        return false;
    };
    let (payload, trailer) = frame.split_at(split);
    checksum(payload) == u16::from_be_bytes([trailer[0], trailer[1]])
}

/// Append the checksum of `payload` to it.
pub fn seal(payload: &mut Vec<u8>) {
    let sum = checksum(payload);
    payload.extend_from_slice(&sum.to_be_bytes());
}
