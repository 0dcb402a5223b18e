//! Decoded D1 packet

use serde::{Deserialize, Serialize};

use super::field::Field;
use super::frame::ValidFrame;
use super::{CHECKSUM_OFFSET, SOURCE_ID_OFFSET, SPARE_OFFSET};

/// Typed contents of one D1 frame.
///
/// All eight numeric fields are raw protocol units in the 24-bit signed
/// range; use [`ConversionPolicy`](crate::convert::ConversionPolicy) to get
/// physical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPacket {
    pub message_type: u8,
    pub source_id: u8,
    pub pan: i32,
    pub tilt: i32,
    pub roll: i32,
    pub position_x: i32,
    pub position_y: i32,
    pub position_z: i32,
    pub zoom: i32,
    pub focus: i32,
    pub spare: [u8; 2],
    pub checksum_byte: u8,
}

impl DecodedPacket {
    /// Value of one of the 24-bit fields.
    pub fn field(&self, field: Field) -> i32 {
        match field {
            Field::Pan => self.pan,
            Field::Tilt => self.tilt,
            Field::Roll => self.roll,
            Field::PositionX => self.position_x,
            Field::PositionY => self.position_y,
            Field::PositionZ => self.position_z,
            Field::Zoom => self.zoom,
            Field::Focus => self.focus,
        }
    }

    /// Spare bytes read as a big-endian u16.
    ///
    /// Some trackers put a frame counter here, see [`crate::timecode`].
    pub fn spare_value(&self) -> u16 {
        u16::from_be_bytes(self.spare)
    }
}

/// Decode a validated frame.
///
/// Never fails: every 3-byte read lands in the 24-bit range by construction.
/// Integrity is the caller's job ([`checksum::verify`](super::checksum::verify)).
pub fn decode(frame: &ValidFrame<'_>) -> DecodedPacket {
    let bytes = frame.bytes();

    DecodedPacket {
        message_type: bytes[0],
        source_id: bytes[SOURCE_ID_OFFSET],
        pan: Field::Pan.read(bytes),
        tilt: Field::Tilt.read(bytes),
        roll: Field::Roll.read(bytes),
        position_x: Field::PositionX.read(bytes),
        position_y: Field::PositionY.read(bytes),
        position_z: Field::PositionZ.read(bytes),
        zoom: Field::Zoom.read(bytes),
        focus: Field::Focus.read(bytes),
        spare: [bytes[SPARE_OFFSET], bytes[SPARE_OFFSET + 1]],
        checksum_byte: bytes[CHECKSUM_OFFSET],
    }
}

/// Whether two packets carry the same telemetry, ignoring the trailing byte.
pub fn same_telemetry(a: &DecodedPacket, b: &DecodedPacket) -> bool {
    DecodedPacket { checksum_byte: 0, ..*a } == DecodedPacket { checksum_byte: 0, ..*b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MESSAGE_TYPE_D1, validate};

    #[rustfmt::skip]
    const SAMPLE: [u8; 29] = [
        0xD1, 0x01,
        0x00, 0x04, 0xD2, // pan 1234
        0x00, 0x16, 0x2E, // tilt 5678
        0x00, 0x00, 0x5A, // roll 90
        0x00, 0x27, 0x10, // x 10000
        0x00, 0x4E, 0x20, // y 20000
        0x00, 0x75, 0x30, // z 30000
        0x00, 0x0F, 0xA0, // zoom 4000
        0x00, 0x1F, 0x40, // focus 8000
        0x12, 0x34,
        0x00,
    ];

    #[test]
    fn decodes_every_field_at_its_offset() {
        let frame = validate(&SAMPLE).unwrap();
        let packet = decode(&frame);

        assert_eq!(packet.message_type, MESSAGE_TYPE_D1);
        assert_eq!(packet.source_id, 1);
        assert_eq!(packet.pan, 1234);
        assert_eq!(packet.tilt, 5678);
        assert_eq!(packet.roll, 90);
        assert_eq!(packet.position_x, 10_000);
        assert_eq!(packet.position_y, 20_000);
        assert_eq!(packet.position_z, 30_000);
        assert_eq!(packet.zoom, 4000);
        assert_eq!(packet.focus, 8000);
        assert_eq!(packet.spare, [0x12, 0x34]);
        assert_eq!(packet.spare_value(), 0x1234);
    }

    #[test]
    fn negative_fields_sign_extend() {
        let mut bytes = SAMPLE;
        bytes[2..5].copy_from_slice(&[0xFF, 0xFB, 0x2E]); // -1234
        bytes[17..20].copy_from_slice(&[0x80, 0x00, 0x00]);
        let packet = decode(&validate(&bytes).unwrap());
        assert_eq!(packet.pan, -1234);
        assert_eq!(packet.position_z, -8_388_608);
    }

    #[test]
    fn decoding_twice_is_identical() {
        let frame = validate(&SAMPLE).unwrap();
        assert_eq!(decode(&frame), decode(&frame));
    }

    #[test]
    fn field_accessor_matches_struct() {
        let packet = decode(&validate(&SAMPLE).unwrap());
        let values: Vec<i32> = Field::ALL.iter().map(|f| packet.field(*f)).collect();
        assert_eq!(values, vec![1234, 5678, 90, 10_000, 20_000, 30_000, 4000, 8000]);
    }

    #[test]
    fn same_telemetry_ignores_checksum_byte() {
        let mut other = SAMPLE;
        other[28] = 0xEE;
        let a = decode(&validate(&SAMPLE).unwrap());
        let b = decode(&validate(&other).unwrap());
        assert_ne!(a, b);
        assert!(same_telemetry(&a, &b));
    }
}
