//! Byte-stuffing and field helpers shared by every layer of the decoder.
//!
//! Inside a frame body the delimiter values never appear verbatim:
//!
//! | literal | on the wire |
//! |---------|-------------|
//! | `0x7D`  | `7D 01`     |
//! | `0x7E`  | `7D 02`     |
//! | `0x7F`  | `7D 03`     |

use std::fmt::Write as _;

/// Frame start delimiter.
pub const START: u8 = 0x7E;
/// Frame end delimiter.
pub const END: u8 = 0x7F;
/// Escape introducer.
pub const ESCAPE: u8 = 0x7D;

fn escape_selector(byte: u8) -> Option<u8> {
    match byte {
        ESCAPE => Some(0x01),
        START => Some(0x02),
        END => Some(0x03),
        _ => None,
    }
}

fn unescape_selector(selector: u8) -> Option<u8> {
    match selector {
        0x01 => Some(ESCAPE),
        0x02 => Some(START),
        0x03 => Some(END),
        _ => None,
    }
}

/// Encode `payload` and wrap it in `START … END`.
pub fn escape(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(START);
    for &b in payload {
        match escape_selector(b) {
            Some(selector) => {
                out.push(ESCAPE);
                out.push(selector);
            }
            None => out.push(b),
        }
    }
    out.push(END);
    out
}

/// Decode an escaped frame body (delimiters already stripped).
///
/// A pair with an unknown selector is dropped, as is a trailing lone escape.
pub fn unescape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(b) = iter.next() {
        if b != ESCAPE {
            out.push(b);
            continue;
        }
        if let Some(literal) = iter.next().and_then(unescape_selector) {
            out.push(literal);
        }
    }
    out
}

/// True when every escape introducer is followed by a known selector.
pub fn has_valid_escapes(bytes: &[u8]) -> bool {
    bytes.iter().enumerate().all(|(i, &b)| {
        b != ESCAPE || bytes.get(i + 1).and_then(|&s| unescape_selector(s)).is_some()
    })
}

/// Upper-case hex rendering without separators.
pub fn to_hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out
}

/// Lower-case hex rendering without separators.
pub fn to_hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Parse a hex string (either case, whitespace ignored) into bytes.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi << 4 | lo) as u8)
        })
        .collect()
}

/// Big-endian unsigned read of `len` (≤ 8) bytes at `offset`.
pub fn read_be(bytes: &[u8], offset: usize, len: usize) -> Option<u64> {
    let field = bytes.get(offset..offset.checked_add(len)?)?;
    Some(field.iter().fold(0u64, |acc, &b| acc << 8 | u64::from(b)))
}

/// Little-endian unsigned read of `len` (≤ 8) bytes at `offset`.
pub fn read_le(bytes: &[u8], offset: usize, len: usize) -> Option<u64> {
    let field = bytes.get(offset..offset.checked_add(len)?)?;
    Some(field.iter().rev().fold(0u64, |acc, &b| acc << 8 | u64::from(b)))
}

/// Test bit `index` of `byte`; out-of-range indices test bit 0.
pub fn bit_set(byte: u8, index: u32) -> bool {
    let index = if index > 7 { 0 } else { index };
    byte & (1 << index) != 0
}

/// Copy of `bytes` in reverse order.
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// `AA:BB:CC:DD:EE:FF`, bytes rendered in the order given.
pub fn format_mac(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":")
}

/// Firmware version from three BCD-like bytes.
///
/// Values below ten are rendered as two hex digits, larger ones in decimal,
/// then dots are inserted after the second and fourth characters.
pub fn format_firmware(bytes: &[u8]) -> String {
    let mut raw = String::new();
    for &b in bytes {
        if b < 10 {
            let _ = write!(raw, "{b:02X}");
        } else {
            let _ = write!(raw, "{b}");
        }
    }
    if raw.len() >= 2 {
        raw.insert(2, '.');
    }
    if raw.len() >= 5 {
        raw.insert(5, '.');
    }
    raw
}

/// ASCII text, with anything outside the 7-bit range replaced.
pub fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
        .collect()
}
