//! Color frame wire format
//!
//! ```text
//! [0..4]  header      BB 00 20 B0 01
//! [5]     led count   u8
//! [6..]   RGB triples, one per LED
//! [last]  checksum    XOR of every preceding byte
//! ```
//!
//! The packet travels base64-encoded inside the device's JSON command.

use crate::error::{LightError, Result};
use crate::types::Rgb;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Fixed prefix of every color frame
pub const FRAME_HEADER: [u8; 5] = [0xBB, 0x00, 0x20, 0xB0, 0x01];

/// Largest number of colors a single count byte can describe
pub const MAX_COLORS: usize = u8::MAX as usize;

/// Bytes a frame adds on top of its colors: header, count byte, checksum
pub const FRAME_OVERHEAD: usize = FRAME_HEADER.len() + 2;

const MODE_SWITCH_HEADER: [u8; 4] = [0xBB, 0x00, 0x01, 0xB1];

/// XOR-fold of the given bytes
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Size in bytes of an encoded frame before base64
pub fn packet_len(color_count: usize) -> usize {
    FRAME_OVERHEAD + color_count * 3
}

/// Build the raw frame packet for a sequence of colors
pub fn encode_packet(colors: &[Rgb]) -> Result<Vec<u8>> {
    if colors.len() > MAX_COLORS {
        return Err(LightError::Capacity {
            count: colors.len(),
            max: MAX_COLORS,
        });
    }

    let mut packet = Vec::with_capacity(packet_len(colors.len()));
    packet.extend_from_slice(&FRAME_HEADER);
    packet.push(colors.len() as u8);
    for color in colors {
        packet.extend_from_slice(&color.channels());
    }
    packet.push(checksum(&packet));
    Ok(packet)
}

/// Encode colors into the base64 payload devices expect
pub fn encode(colors: &[Rgb]) -> Result<String> {
    Ok(STANDARD.encode(encode_packet(colors)?))
}

/// Parse a raw frame packet back into colors, verifying its checksum
pub fn decode_packet(packet: &[u8]) -> Result<Vec<Rgb>> {
    if packet.len() < FRAME_OVERHEAD {
        return Err(LightError::Malformed(format!(
            "frame is {} bytes, need at least {}",
            packet.len(),
            FRAME_OVERHEAD
        )));
    }
    if packet[..FRAME_HEADER.len()] != FRAME_HEADER {
        return Err(LightError::Malformed("frame header mismatch".to_string()));
    }

    let count = packet[FRAME_HEADER.len()] as usize;
    if packet.len() != packet_len(count) {
        return Err(LightError::Malformed(format!(
            "frame announces {} colors ({} bytes) but is {} bytes",
            count,
            packet_len(count),
            packet.len()
        )));
    }

    let (body, tail) = packet.split_at(packet.len() - 1);
    let expected = tail[0];
    let actual = checksum(body);
    if expected != actual {
        return Err(LightError::Checksum { expected, actual });
    }

    Ok(body[FRAME_HEADER.len() + 1..]
        .chunks_exact(3)
        .map(|c| Rgb::new(c[0], c[1], c[2]))
        .collect())
}

/// Decode a base64 payload produced by [`encode`]
pub fn decode(payload: &str) -> Result<Vec<Rgb>> {
    let packet = STANDARD.decode(payload.trim())?;
    decode_packet(&packet)
}

/// Packet that switches a device in or out of externally driven mode
pub fn mode_switch_packet(enabled: bool) -> [u8; 6] {
    let mut packet = [0u8; 6];
    packet[..4].copy_from_slice(&MODE_SWITCH_HEADER);
    packet[4] = enabled as u8;
    packet[5] = checksum(&packet[..5]);
    packet
}

/// Base64 form of [`mode_switch_packet`]
pub fn mode_switch(enabled: bool) -> String {
    STANDARD.encode(mode_switch_packet(enabled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(n: usize) -> Vec<Rgb> {
        (0..n)
            .map(|i| Rgb::new(i as u8, (i * 7 % 256) as u8, 255 - (i % 256) as u8))
            .collect()
    }

    #[test]
    fn test_round_trip_all_lengths() {
        for n in 0..=MAX_COLORS {
            let colors = palette(n);
            let decoded = decode(&encode(&colors).unwrap()).unwrap();
            assert_eq!(decoded, colors, "round trip failed for {} colors", n);
        }
    }

    #[test]
    fn test_capacity_rejected() {
        for n in [256, 300, 1024] {
            match encode_packet(&palette(n)) {
                Err(LightError::Capacity { count, max }) => {
                    assert_eq!(count, n);
                    assert_eq!(max, 255);
                }
                other => panic!("expected capacity error, got {:?}", other),
            }
            assert!(encode(&palette(n)).is_err());
        }
    }

    #[test]
    fn test_packet_length() {
        for n in [1, 2, 3, 4, 5, 6, 8, 10, 15, 20, 24, 30, 40] {
            let packet = encode_packet(&vec![Rgb::WHITE; n]).unwrap();
            assert_eq!(packet.len(), 7 + 3 * n);
            assert_eq!(packet[5] as usize, n);
        }
    }

    #[test]
    fn test_last_byte_is_xor_of_rest() {
        for n in [0, 1, 4, 17, 255] {
            let packet = encode_packet(&palette(n)).unwrap();
            let (body, last) = packet.split_at(packet.len() - 1);
            assert_eq!(last[0], body.iter().fold(0u8, |acc, b| acc ^ b));
        }
    }

    #[test]
    fn test_header_and_color_layout() {
        let packet = encode_packet(&[Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)]).unwrap();
        assert_eq!(&packet[..5], &FRAME_HEADER);
        assert_eq!(&packet[5..12], &[2, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_corrupted_checksum_detected() {
        let mut packet = encode_packet(&palette(4)).unwrap();
        packet[7] ^= 0x40;
        assert!(matches!(decode_packet(&packet), Err(LightError::Checksum { .. })));
    }

    #[test]
    fn test_truncated_and_foreign_packets_rejected() {
        let packet = encode_packet(&palette(4)).unwrap();
        assert!(matches!(decode_packet(&packet[..6]), Err(LightError::Malformed(_))));
        assert!(matches!(
            decode_packet(&packet[..packet.len() - 2]),
            Err(LightError::Malformed(_))
        ));

        let mut foreign = packet.clone();
        foreign[0] = 0xAA;
        assert!(matches!(decode_packet(&foreign), Err(LightError::Malformed(_))));

        assert!(matches!(decode("not base64!"), Err(LightError::Base64(_))));
    }

    #[test]
    fn test_mode_switch_payloads() {
        assert_eq!(mode_switch(true), "uwABsQEK");
        assert_eq!(mode_switch(false), "uwABsQAL");
    }
}
