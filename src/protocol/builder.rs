//! Frame assembly for senders, simulators and tests

use super::checksum;
use super::field::Field;
use super::{FRAME_LEN, MESSAGE_TYPE_D1, RawFrame, SOURCE_ID_OFFSET, SPARE_OFFSET};

/// Raw units per degree of rotation.
pub const UNITS_PER_DEGREE: f64 = 32_768.0;
/// Raw units per meter of position (1/64 mm resolution).
pub const UNITS_PER_METER: f64 = 64_000.0;
/// Raw zoom units per millimetre of focal length.
pub const ZOOM_UNITS_PER_MM: f64 = 1_000.0;
/// Raw focus units per meter of focus distance.
pub const FOCUS_UNITS_PER_METER: f64 = 1_000.0;
/// Zoom value sent when the lens reports no zoom data.
pub const ZOOM_NO_DATA: i32 = 0;
/// Focus value sent when the lens reports no focus data.
pub const FOCUS_NO_DATA: i32 = 65_535;

/// Builds a sealed D1 frame.
///
/// Fields start at zero. Raw setters take protocol units; the `*_degrees`,
/// `*_meters` and lens setters take physical units and truncate toward zero
/// like common FreeD senders do. Out-of-range values saturate at the 24-bit
/// bounds.
///
/// ```rust
/// use freed::protocol::{PacketBuilder, decode, validate};
///
/// let frame = PacketBuilder::new(3).pan_degrees(-12.5).focal_length_mm(35.0).build();
/// let packet = decode(&validate(&frame).unwrap());
/// assert_eq!(packet.source_id, 3);
/// assert_eq!(packet.pan, -409_600);
/// assert_eq!(packet.zoom, 35_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketBuilder {
    frame: RawFrame,
}

impl PacketBuilder {
    pub fn new(source_id: u8) -> Self {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = MESSAGE_TYPE_D1;
        frame[SOURCE_ID_OFFSET] = source_id;
        Self { frame }
    }

    /// Set any 24-bit field in raw units.
    pub fn raw(mut self, field: Field, value: i32) -> Self {
        field.write(&mut self.frame, value);
        self
    }

    pub fn rotation(self, pan: i32, tilt: i32, roll: i32) -> Self {
        self.raw(Field::Pan, pan).raw(Field::Tilt, tilt).raw(Field::Roll, roll)
    }

    pub fn position(self, x: i32, y: i32, z: i32) -> Self {
        self.raw(Field::PositionX, x).raw(Field::PositionY, y).raw(Field::PositionZ, z)
    }

    pub fn lens(self, zoom: i32, focus: i32) -> Self {
        self.raw(Field::Zoom, zoom).raw(Field::Focus, focus)
    }

    pub fn pan_degrees(self, degrees: f64) -> Self {
        self.raw(Field::Pan, scaled(degrees, UNITS_PER_DEGREE))
    }

    pub fn tilt_degrees(self, degrees: f64) -> Self {
        self.raw(Field::Tilt, scaled(degrees, UNITS_PER_DEGREE))
    }

    pub fn roll_degrees(self, degrees: f64) -> Self {
        self.raw(Field::Roll, scaled(degrees, UNITS_PER_DEGREE))
    }

    pub fn position_meters(self, x: f64, y: f64, z: f64) -> Self {
        self.position(
            scaled(x, UNITS_PER_METER),
            scaled(y, UNITS_PER_METER),
            scaled(z, UNITS_PER_METER),
        )
    }

    /// Zoom as focal length; negative lengths are sent as zero.
    pub fn focal_length_mm(self, mm: f64) -> Self {
        self.raw(Field::Zoom, scaled(mm, ZOOM_UNITS_PER_MM).max(0))
    }

    /// Focus as distance; negative distances are sent as zero.
    pub fn focus_meters(self, meters: f64) -> Self {
        self.raw(Field::Focus, scaled(meters, FOCUS_UNITS_PER_METER).max(0))
    }

    pub fn zoom_no_data(self) -> Self {
        self.raw(Field::Zoom, ZOOM_NO_DATA)
    }

    pub fn focus_no_data(self) -> Self {
        self.raw(Field::Focus, FOCUS_NO_DATA)
    }

    pub fn spare(mut self, spare: [u8; 2]) -> Self {
        self.frame[SPARE_OFFSET..SPARE_OFFSET + 2].copy_from_slice(&spare);
        self
    }

    /// Spare bytes carrying a running frame counter.
    pub fn frame_counter(self, count: u16) -> Self {
        self.spare(count.to_be_bytes())
    }

    /// Genlock phase counter in the high nibble of the first spare byte.
    pub fn genlock_phase(self, phase: u8) -> Self {
        self.spare([(phase & 0x0F) << 4, 0x00])
    }

    /// Finish the frame with a correct checksum.
    pub fn build(self) -> RawFrame {
        let mut frame = self.frame;
        checksum::seal(&mut frame);
        frame
    }
}

fn scaled(value: f64, units: f64) -> i32 {
    // `as` saturates on overflow and maps NaN to 0.
    (value * units) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, validate};

    #[test]
    fn built_frames_pass_validation_and_checksum() {
        let frame = PacketBuilder::new(9).rotation(1, -1, 0).position(5, 6, 7).lens(8, 9).build();
        let valid = validate(&frame).unwrap();
        assert!(checksum::report(valid.bytes()).is_match());

        let packet = decode(&valid);
        assert_eq!((packet.pan, packet.tilt, packet.roll), (1, -1, 0));
        assert_eq!((packet.position_x, packet.position_y, packet.position_z), (5, 6, 7));
        assert_eq!((packet.zoom, packet.focus), (8, 9));
    }

    #[test]
    fn physical_units_use_sender_scales() {
        let frame = PacketBuilder::new(1)
            .pan_degrees(90.0)
            .tilt_degrees(-45.0)
            .roll_degrees(0.5)
            .position_meters(1.5, -2.0, 0.25)
            .focal_length_mm(50.0)
            .focus_meters(4.17)
            .build();
        let packet = decode(&validate(&frame).unwrap());

        assert_eq!(packet.pan, 2_949_120);
        assert_eq!(packet.tilt, -1_474_560);
        assert_eq!(packet.roll, 16_384);
        assert_eq!(packet.position_x, 96_000);
        assert_eq!(packet.position_y, -128_000);
        assert_eq!(packet.position_z, 16_000);
        assert_eq!(packet.zoom, 50_000);
        assert_eq!(packet.focus, 4_170);
    }

    #[test]
    fn out_of_range_values_saturate() {
        let frame = PacketBuilder::new(1).pan_degrees(1_000.0).tilt_degrees(-1_000.0).build();
        let packet = decode(&validate(&frame).unwrap());
        assert_eq!(packet.pan, 8_388_607);
        assert_eq!(packet.tilt, -8_388_608);
    }

    #[test]
    fn no_data_markers() {
        let frame = PacketBuilder::new(1).focal_length_mm(28.0).zoom_no_data().focus_no_data().build();
        let packet = decode(&validate(&frame).unwrap());
        assert_eq!(packet.zoom, ZOOM_NO_DATA);
        assert_eq!(packet.focus, FOCUS_NO_DATA);
    }

    #[test]
    fn genlock_phase_uses_high_nibble() {
        let frame = PacketBuilder::new(1).genlock_phase(0x1A).build();
        assert_eq!(frame[SPARE_OFFSET], 0xA0);
        assert_eq!(frame[SPARE_OFFSET + 1], 0x00);
    }

    #[test]
    fn frame_counter_is_big_endian() {
        let frame = PacketBuilder::new(1).frame_counter(0x0102).build();
        assert_eq!(decode(&validate(&frame).unwrap()).spare_value(), 0x0102);
    }
}
