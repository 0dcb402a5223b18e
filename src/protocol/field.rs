//! 24-bit signed field access

use serde::{Deserialize, Serialize};

use super::{I24_MAX, I24_MIN, RawFrame};

/// The eight 24-bit fields of a D1 frame, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Pan,
    Tilt,
    Roll,
    PositionX,
    PositionY,
    PositionZ,
    Zoom,
    Focus,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Pan,
        Field::Tilt,
        Field::Roll,
        Field::PositionX,
        Field::PositionY,
        Field::PositionZ,
        Field::Zoom,
        Field::Focus,
    ];

    /// Byte offset of the field's most significant byte.
    pub const fn offset(self) -> usize {
        2 + 3 * self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Pan => "pan",
            Field::Tilt => "tilt",
            Field::Roll => "roll",
            Field::PositionX => "position_x",
            Field::PositionY => "position_y",
            Field::PositionZ => "position_z",
            Field::Zoom => "zoom",
            Field::Focus => "focus",
        }
    }

    /// Read this field from a frame.
    pub fn read(self, frame: &RawFrame) -> i32 {
        let at = self.offset();
        read_i24([frame[at], frame[at + 1], frame[at + 2]])
    }

    /// Write this field into a frame, clamping to the 24-bit range.
    pub fn write(self, frame: &mut RawFrame, value: i32) {
        let at = self.offset();
        frame[at..at + 3].copy_from_slice(&write_i24(value));
    }
}

/// Decode three big-endian bytes as a two's-complement 24-bit integer.
pub fn read_i24(bytes: [u8; 3]) -> i32 {
    let raw = i32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
    if raw & 0x80_0000 != 0 { raw - 0x100_0000 } else { raw }
}

/// Encode a value as three big-endian bytes, saturating at the 24-bit bounds.
pub fn write_i24(value: i32) -> [u8; 3] {
    let [_, hi, mid, lo] = value.clamp(I24_MIN, I24_MAX).to_be_bytes();
    [hi, mid, lo]
}
