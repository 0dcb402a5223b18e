//! Frame fixtures shared by unit tests, integration tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use crate::protocol::{CHECKSUM_OFFSET, PacketBuilder, RawFrame};

/// Field values of the canonical sample frame, in wire order.
pub const SAMPLE_FIELDS: [i32; 8] = [1234, 5678, 90, 10_000, 20_000, 30_000, 4000, 8000];

/// A correctly sealed frame carrying [`SAMPLE_FIELDS`].
pub fn sample_frame(source_id: u8) -> RawFrame {
    let [pan, tilt, roll, x, y, z, zoom, focus] = SAMPLE_FIELDS;
    PacketBuilder::new(source_id).rotation(pan, tilt, roll).position(x, y, z).lens(zoom, focus).build()
}

/// The same frame with a trailing byte that no longer matches.
pub fn corrupt_checksum(mut frame: RawFrame) -> RawFrame {
    frame[CHECKSUM_OFFSET] ^= 0xFF;
    frame
}

/// A frame whose spare bytes carry `count` as a frame counter.
pub fn counter_frame(source_id: u8, count: u16) -> RawFrame {
    PacketBuilder::new(source_id).rotation(count as i32 * 16, 0, 0).frame_counter(count).build()
}

/// Hex rendering of a datagram, one capture line.
pub fn hex_line(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

/// A realistic mix: mostly good frames from a few cameras, with truncated,
/// mistagged and corrupted datagrams sprinkled in.
pub fn mixed_capture(len: usize) -> Vec<Vec<u8>> {
    (0..len)
        .map(|i| {
            let frame = counter_frame((i % 4) as u8, i as u16);
            match i % 20 {
                7 => frame[..17].to_vec(),
                11 => {
                    let mut mistagged = frame;
                    mistagged[0] = 0xD0;
                    mistagged.to_vec()
                }
                13 => corrupt_checksum(frame).to_vec(),
                _ => frame.to_vec(),
            }
        })
        .collect()
}
