//! Envelope of a relayed BLE advertisement.
//!
//! ```text
//! byte 0            ble_len (record is ble_len + 1 bytes)
//! byte 1 ..         AD structures, ble_len - 7 bytes
//! byte ble_len - 6  RSSI (signed)
//! byte ble_len - 5  MAC, 6 bytes, least significant octet first
//! ```
//!
//! The first AD structure is normally manufacturer data, which puts the
//! company id at bytes 3..5 and the vendor subtype at byte 5.

use tracing::trace;

use crate::codec::bytes::{ascii, bit_set, format_mac, reversed, to_hex_lower};
use crate::types::{AdvertisingFlags, BleAdvertisement};
use crate::{HubError, Result};

/// Bytes in a record around the AD region: length, RSSI and MAC.
const ENVELOPE_OVERHEAD: usize = 7;

const MAC_LEN: usize = 6;

const AD_FLAGS: u8 = 0x01;
const AD_UUID16_PARTIAL: u8 = 0x02;
const AD_UUID16_COMPLETE: u8 = 0x03;
const AD_UUID32_PARTIAL: u8 = 0x04;
const AD_UUID32_COMPLETE: u8 = 0x05;
const AD_UUID128_PARTIAL: u8 = 0x06;
const AD_UUID128_COMPLETE: u8 = 0x07;
const AD_NAME_SHORT: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;
const AD_MANUFACTURER: u8 = 0xFF;

/// Parse the envelope and AD structures of one record.
pub fn parse(record: &[u8]) -> Result<BleAdvertisement> {
    let ble_len = record.first().copied().unwrap_or_default();
    let region_len = usize::from(ble_len).checked_sub(ENVELOPE_OVERHEAD).ok_or_else(|| {
        HubError::structural(
            "BLE advertisement",
            format!("length {ble_len} cannot hold RSSI and MAC"),
            record,
        )
    })?;

    let mac_start = 1 + region_len + 1;
    if record.len() < mac_start + MAC_LEN {
        return Err(HubError::structural(
            "BLE advertisement",
            format!("need {} bytes, record has {}", mac_start + MAC_LEN, record.len()),
            record,
        ));
    }

    let mut advertisement = BleAdvertisement {
        ble_len,
        adv_len: record[1],
        manufacturer: to_hex_lower(&reversed(&record[3..5])),
        device_type: record[3],
        rssi: record[1 + region_len] as i8,
        mac: format_mac(&reversed(&record[mac_start..mac_start + MAC_LEN])),
        ..BleAdvertisement::default()
    };

    walk_ad_structures(&record[1..1 + region_len], &mut advertisement);
    Ok(advertisement)
}

fn walk_ad_structures(region: &[u8], advertisement: &mut BleAdvertisement) {
    let mut offset = 0;
    while offset < region.len() {
        let len = usize::from(region[offset]);
        if len == 0 || len >= region.len() {
            break;
        }
        let Some(structure) = region.get(offset + 1..offset + 1 + len) else {
            trace!(offset, len, "AD structure overruns region");
            break;
        };
        let (ad_type, data) = (structure[0], &structure[1..]);

        match ad_type {
            AD_FLAGS => {
                if let Some(&flags) = data.first() {
                    advertisement.flags = AdvertisingFlags {
                        limited_discoverable: bit_set(flags, 0),
                        general_discoverable: bit_set(flags, 1),
                        br_edr_unsupported: bit_set(flags, 2),
                        controller_edr: bit_set(flags, 3),
                        host_edr: bit_set(flags, 4),
                    };
                }
            }
            AD_UUID16_PARTIAL | AD_UUID16_COMPLETE => {
                advertisement.uuids = uuid_list(data, 2);
            }
            AD_UUID32_PARTIAL | AD_UUID32_COMPLETE => {
                advertisement.uuids = uuid_list(data, 4);
            }
            AD_UUID128_PARTIAL | AD_UUID128_COMPLETE => {
                advertisement.uuids = uuid_list(data, 16);
            }
            AD_NAME_SHORT | AD_NAME_COMPLETE => advertisement.name = Some(ascii(data)),
            AD_MANUFACTURER => advertisement.manufacturer_data = data.to_vec(),
            other => trace!(ad_type = other, "Skipping AD structure"),
        }

        offset += 1 + len;
    }
}

/// Little-endian UUIDs of `width` bytes, rendered as hex and comma separated.
fn uuid_list(data: &[u8], width: usize) -> Option<String> {
    let uuids: Vec<String> =
        data.chunks_exact(width).map(|uuid| to_hex_lower(&reversed(uuid))).collect();
    (!uuids.is_empty()).then(|| uuids.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Record with the given AD region, RSSI and MAC (display order).
    fn record(region: &[u8], rssi: i8, mac: [u8; 6]) -> Vec<u8> {
        let mut out = vec![(region.len() + ENVELOPE_OVERHEAD) as u8];
        out.extend_from_slice(region);
        out.push(rssi as u8);
        out.extend(mac.iter().rev());
        out
    }

    #[test]
    fn parses_envelope_fields() {
        let region = [5, 0xFF, 0x34, 0x12, 0xA1, 0x00];
        let rec = record(&region, -70, [0xC0, 0x01, 0x02, 0x03, 0x04, 0x05]);
        let adv = parse(&rec).unwrap();
        assert_eq!(adv.ble_len as usize, rec.len() - 1);
        assert_eq!(adv.adv_len, 5);
        assert_eq!(adv.manufacturer, "1234");
        assert_eq!(adv.device_type, 0x34);
        assert_eq!(adv.rssi, -70);
        assert_eq!(adv.mac, "C0:01:02:03:04:05");
        assert_eq!(adv.manufacturer_data, vec![0x34, 0x12, 0xA1, 0x00]);
    }

    #[test]
    fn walks_flags_uuids_and_name() {
        let mut region = vec![2, 0x01, 0b0000_0110];
        region.extend([5, 0x03, 0x0D, 0x18, 0x0F, 0x18]);
        region.extend([6, 0x09, b'X', b'W', b'1', b'0', b'0']);
        let adv = parse(&record(&region, -40, [0; 6])).unwrap();

        assert!(adv.flags.general_discoverable);
        assert!(adv.flags.br_edr_unsupported);
        assert!(!adv.flags.limited_discoverable);
        assert_eq!(adv.uuids.as_deref(), Some("180d,180f"));
        assert_eq!(adv.name.as_deref(), Some("XW100"));
    }

    #[test]
    fn walk_stops_on_zero_length() {
        let region = [0, 0x09, b'A', 2, 0x09, b'B'];
        let adv = parse(&record(&region, 0, [0; 6])).unwrap();
        assert_eq!(adv.name, None);
    }

    #[test]
    fn too_short_for_envelope_is_structural() {
        assert!(parse(&[3, 1, 2, 3]).is_err());
        assert!(parse(&[20, 1, 2, 3]).is_err());
    }

    #[test]
    fn uuid128_groups_are_reversed() {
        let uuid: Vec<u8> = (0u8..16).collect();
        assert_eq!(uuid_list(&uuid, 16).as_deref(), Some("0f0e0d0c0b0a09080706050403020100"));
    }
}
