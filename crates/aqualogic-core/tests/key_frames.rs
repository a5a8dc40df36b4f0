//! Golden wire vectors for every wireless remote key.
//!
//! The expected frames are fixed reference vectors, one per key.  The layout
//! is `10 02 00 8C 01 <code LE> <code LE> 00 <checksum BE> 10 03` with DLE
//! stuffing applied to the codes and the checksum.

use aqualogic_core::protocol::codec::{verify, FrameDecoder};
use aqualogic_core::{decode_type, encode_key_frame, FrameType, Key};

fn hex(s: &str) -> Vec<u8> {
    s.split('-')
        .map(|b| u8::from_str_radix(b, 16).expect("valid hex byte"))
        .collect()
}

fn golden(data: &str, crc: &str) -> Vec<u8> {
    hex(&format!("10-02-00-8C-01-{data}-{data}-00-{crc}-10-03"))
}

const VECTORS: &[(Key, &str, &str)] = &[
    (Key::Right, "01-00-00-00", "00-A1"),
    (Key::Menu, "02-00-00-00", "00-A3"),
    (Key::Left, "04-00-00-00", "00-A7"),
    (Key::Service, "08-00-00-00", "00-AF"),
    (Key::Minus, "10-00-00-00-00", "00-BF"),
    (Key::Plus, "20-00-00-00", "00-DF"),
    (Key::PoolSpa, "40-00-00-00", "01-1F"),
    (Key::Filter, "80-00-00-00", "01-9F"),
    (Key::Lights, "00-01-00-00", "00-A1"),
    (Key::Aux1, "00-02-00-00", "00-A3"),
    (Key::Aux2, "00-04-00-00", "00-A7"),
    (Key::Aux3, "00-08-00-00", "00-AF"),
    (Key::Aux4, "00-10-00-00-00", "00-BF"),
    (Key::Aux5, "00-20-00-00", "00-DF"),
    (Key::Aux6, "00-40-00-00", "01-1F"),
    (Key::Aux7, "00-80-00-00", "01-9F"),
    (Key::Valve3, "00-00-01-00", "00-A1"),
    (Key::Valve4, "00-00-02-00", "00-A3"),
    (Key::Heater1, "00-00-04-00", "00-A7"),
    (Key::Aux8, "00-00-08-00", "00-AF"),
    (Key::Aux9, "00-00-10-00-00", "00-BF"),
    (Key::Aux10, "00-00-20-00", "00-DF"),
    (Key::Aux11, "00-00-40-00", "01-1F"),
    (Key::Aux12, "00-00-80-00", "01-9F"),
    (Key::Aux13, "00-00-00-01", "00-A1"),
    (Key::Aux14, "00-00-00-02", "00-A3"),
];

#[test]
fn test_every_key_matches_its_golden_frame() {
    for &(key, data, crc) in VECTORS {
        assert_eq!(encode_key_frame(key), golden(data, crc), "key {key}");
    }
}

#[test]
fn test_golden_vectors_cover_every_key() {
    for key in Key::ALL {
        assert!(
            VECTORS.iter().any(|(k, _, _)| *k == key),
            "missing golden vector for {key}"
        );
    }
}

#[test]
fn test_encoded_key_frames_decode_back_to_wireless_key() {
    for key in Key::ALL {
        // Arrange
        let mut decoder = FrameDecoder::new();

        // Act
        let frames = decoder.push_slice(&encode_key_frame(key));

        // Assert
        assert_eq!(frames.len(), 1, "key {key}");
        let payload = verify(&frames[0]).expect("checksum must match");
        let frame = decode_type(payload).expect("known tag");
        assert_eq!(frame.frame_type, FrameType::WirelessKey);
        let code = u32::from_le_bytes([frame.body[1], frame.body[2], frame.body[3], frame.body[4]]);
        assert_eq!(code, key.code(), "key {key}");
    }
}
