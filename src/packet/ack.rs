//! Heartbeat acknowledgement.
//!
//! The reply echoes the hub id and the hub MAC (back in wire order) around a
//! fixed header template and a single empty-status record, then is sealed
//! and escaped like any other frame.

use tracing::debug;

use super::header::PacketHeader;
use crate::codec::bytes::{from_hex, reversed, to_hex_upper};
use crate::codec::{escape, seal};
use crate::{HubError, Result};

/// Magic byte of host-originated frames.
pub const ACK_MARKER: u8 = 0xAA;

/// Serial, version, length and firmware fields of the ack header.
pub const ACK_HEADER_TEMPLATE: [u8; 8] = [0x00, 0x00, 0x35, 0x00, 0x1B, 0x00, 0x00, 0x00];

/// Command `0x64` followed by a single empty-status record.
pub const ACK_BODY: [u8; 6] = [0x64, 0x01, 0x00, 0x02, 0x00, 0x00];

/// Build the escaped ack frame for a heartbeat's header.
pub fn build_ack(header: &PacketHeader) -> Result<Vec<u8>> {
    let mac = from_hex(&header.hub_mac.replace(':', ""))
        .filter(|octets| octets.len() == 6)
        .map(|octets| reversed(&octets))
        .ok_or_else(|| {
            HubError::structural(
                "ack frame",
                format!("hub MAC {:?} is not six hex octets", header.hub_mac),
                header.hub_mac.as_bytes(),
            )
        })?;

    let mut body = Vec::with_capacity(1 + 4 + ACK_HEADER_TEMPLATE.len() + 6 + ACK_BODY.len() + 2);
    body.push(ACK_MARKER);
    body.extend_from_slice(&header.hub_id_bytes());
    body.extend_from_slice(&ACK_HEADER_TEMPLATE);
    body.extend_from_slice(&mac);
    body.extend_from_slice(&ACK_BODY);
    seal(&mut body);

    debug!(hub_id = header.hub_id, body = %to_hex_upper(&body), "Built heartbeat ack");
    Ok(escape(&body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{unescape, verify};
    use crate::packet::{Command, FrameBuilder};

    fn header(hub_id: u32, mac: &str) -> PacketHeader {
        PacketHeader {
            magic: 0xAA,
            hub_id,
            serial_number: 3,
            version: 1,
            packet_len: 40,
            firmware: "01.00.00".to_string(),
            hub_mac: mac.to_string(),
            command: Command::Heartbeat,
        }
    }

    #[test]
    fn ack_is_delimited_and_verifies() {
        let ack = build_ack(&header(0x0102_0304, "A1:B2:C3:D4:E5:F6")).unwrap();
        assert_eq!(ack.first(), Some(&0x7E));
        assert_eq!(ack.last(), Some(&0x7F));

        let body = unescape(&ack[1..ack.len() - 1]);
        assert_eq!(body.len(), 27);
        assert!(verify(&body));
        assert_eq!(&body[..5], &[0xAA, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&body[13..19], &[0xF6, 0xE5, 0xD4, 0xC3, 0xB2, 0xA1]);
    }

    #[test]
    fn ack_matches_generic_frame_layout() {
        let ack = build_ack(&header(0x7E00_007D, "01:02:03:04:05:06")).unwrap();
        let expected = FrameBuilder::new(Command::Unknown(0x64))
            .hub_id(0x7E00_007D)
            .serial_number(0)
            .version(0x35)
            .hub_mac([0x01, 0x02, 0x03, 0x04, 0x05, 0x06])
            .record(1, &[0, 0])
            .build();
        assert_eq!(ack, expected);
    }

    #[test]
    fn malformed_mac_is_rejected() {
        assert!(build_ack(&header(1, "not-a-mac")).is_err());
        assert!(build_ack(&header(1, "01:02:03")).is_err());
    }
}
