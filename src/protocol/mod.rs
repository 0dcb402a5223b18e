//! FreeD D1 wire format.
//!
//! A D1 frame is exactly 29 bytes, carried one per datagram:
//!
//! | Offset | Size | Field | Encoding |
//! |---|---|---|---|
//! | 0 | 1 | message type | `0xD1` |
//! | 1 | 1 | source (camera) id | u8 |
//! | 2..=4 | 3 | pan | i24 BE |
//! | 5..=7 | 3 | tilt | i24 BE |
//! | 8..=10 | 3 | roll | i24 BE |
//! | 11..=13 | 3 | position X | i24 BE |
//! | 14..=16 | 3 | position Y | i24 BE |
//! | 17..=19 | 3 | position Z | i24 BE |
//! | 20..=22 | 3 | zoom | i24 BE |
//! | 23..=25 | 3 | focus | i24 BE |
//! | 26..=27 | 2 | spare | passthrough |
//! | 28 | 1 | checksum | XOR of bytes 0..=27 |
//!
//! The pipeline stages live in their own modules: [`frame`] checks shape,
//! [`checksum`] checks integrity, [`packet`] decodes fields.

pub mod builder;
pub mod checksum;
pub mod field;
pub mod frame;
pub mod packet;

pub use builder::PacketBuilder;
pub use checksum::{ChecksumMode, ChecksumReport};
pub use field::{Field, read_i24, write_i24};
pub use frame::{ValidFrame, validate};
pub use packet::{DecodedPacket, decode, same_telemetry};

/// Size of a D1 frame in bytes.
pub const FRAME_LEN: usize = 29;

/// Tag byte identifying a D1 (camera position/orientation) message.
pub const MESSAGE_TYPE_D1: u8 = 0xD1;

/// Offset of the source id byte.
pub const SOURCE_ID_OFFSET: usize = 1;

/// Offset of the two spare bytes.
pub const SPARE_OFFSET: usize = 26;

/// Offset of the trailing checksum byte.
pub const CHECKSUM_OFFSET: usize = 28;

/// Smallest value a 24-bit two's-complement field can hold.
pub const I24_MIN: i32 = -0x80_0000;

/// Largest value a 24-bit two's-complement field can hold.
pub const I24_MAX: i32 = 0x7F_FFFF;

/// One complete D1 frame.
pub type RawFrame = [u8; FRAME_LEN];
