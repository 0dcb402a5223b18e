//! Unit conversion from raw protocol units to physical units.
//!
//! Rotation and position use fixed linear scales. Zoom and focus encodings
//! are lens specific, so they go through piecewise-linear calibration curves
//! measured on the lens in use.
//!
//! ```rust
//! use freed::convert::{Calibration, ConversionPolicy};
//! use freed::protocol::{PacketBuilder, decode, validate};
//!
//! let frame = PacketBuilder::new(1).pan_degrees(90.0).focal_length_mm(50.0).build();
//! let packet = decode(&validate(&frame).unwrap());
//!
//! let policy = ConversionPolicy::Physical(Calibration::default());
//! let reading = policy.apply(packet);
//! let physical = reading.physical().unwrap();
//! assert!((physical.pan_deg - 90.0).abs() < 1e-9);
//! assert!((physical.focal_length_mm - 50.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::DecodedPacket;
use crate::{FreedError, Result};

const INCHES_PER_METER: f64 = 39.3701;

/// One measured point on a lens curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub raw: i32,
    pub value: f64,
}

/// Piecewise-linear mapping from raw lens units to a physical value.
///
/// Raw values below the first point or above the last clamp to the end
/// values. Points are strictly increasing in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CalibrationPoint>", into = "Vec<CalibrationPoint>")]
pub struct CalibrationCurve {
    points: Vec<CalibrationPoint>,
}

impl CalibrationCurve {
    pub fn new(points: Vec<CalibrationPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(FreedError::config("calibration curve", "at least one point is required"));
        }
        if let Some(pair) = points.windows(2).find(|pair| pair[0].raw >= pair[1].raw) {
            return Err(FreedError::config(
                "calibration curve",
                format!("raw values must increase ({} then {})", pair[0].raw, pair[1].raw),
            ));
        }
        if let Some(point) = points.iter().find(|point| !point.value.is_finite()) {
            return Err(FreedError::config(
                "calibration curve",
                format!("value at raw {} is not finite", point.raw),
            ));
        }
        Ok(Self { points })
    }

    /// Build from `(raw, value)` pairs.
    pub fn from_pairs(pairs: &[(i32, f64)]) -> Result<Self> {
        Self::new(pairs.iter().map(|&(raw, value)| CalibrationPoint { raw, value }).collect())
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn interpolate(&self, raw: i32) -> f64 {
        // `new` guarantees at least one point.
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if raw <= first.raw {
            return first.value;
        }
        if raw >= last.raw {
            return last.value;
        }

        // First point strictly above `raw`; its predecessor is at or below.
        let upper = self.points.partition_point(|point| point.raw <= raw);
        let (lo, hi) = (self.points[upper - 1], self.points[upper]);
        let t = f64::from(raw - lo.raw) / f64::from(hi.raw - lo.raw);
        lo.value + t * (hi.value - lo.value)
    }
}

impl TryFrom<Vec<CalibrationPoint>> for CalibrationCurve {
    type Error = FreedError;

    fn try_from(points: Vec<CalibrationPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<CalibrationCurve> for Vec<CalibrationPoint> {
    fn from(curve: CalibrationCurve) -> Self {
        curve.points
    }
}

/// Fixed calibration constants for one tracking setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Degrees per raw rotation unit.
    pub rotation_scale: f64,
    /// Millimetres per raw position unit.
    pub position_scale: f64,
    /// Raw zoom → focal length in mm.
    pub zoom: CalibrationCurve,
    /// Raw focus → focus distance in meters.
    pub focus: CalibrationCurve,
}

impl Default for Calibration {
    /// Scales used by most FreeD trackers and curves for a 28-100mm cine zoom.
    fn default() -> Self {
        let zoom = CalibrationCurve {
            points: [(28_000, 28.0), (35_000, 35.0), (50_000, 50.0), (70_000, 70.0), (100_000, 100.0)]
                .into_iter()
                .map(|(raw, value)| CalibrationPoint { raw, value })
                .collect(),
        };
        let focus = CalibrationCurve {
            points: [(800, 0.8), (892, 0.892), (1_299, 1.299), (4_170, 4.170), (629_000, 629.0)]
                .into_iter()
                .map(|(raw, value)| CalibrationPoint { raw, value })
                .collect(),
        };

        Self { rotation_scale: 1.0 / 32_768.0, position_scale: 1.0 / 64.0, zoom, focus }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<()> {
        for (name, scale) in [("rotation_scale", self.rotation_scale), ("position_scale", self.position_scale)] {
            if !scale.is_finite() || scale == 0.0 {
                return Err(FreedError::config(
                    format!("calibration.{}", name),
                    format!("scale must be finite and non-zero, got {}", scale),
                ));
            }
        }
        // Curves were checked on construction; deserialization goes through `new`.
        Ok(())
    }
}

/// A packet expressed in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPacket {
    pub source_id: u8,
    pub pan_deg: f64,
    pub tilt_deg: f64,
    pub roll_deg: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub focal_length_mm: f64,
    pub focus_distance_m: f64,
    /// The packet this was converted from.
    pub raw: DecodedPacket,
}

impl PhysicalPacket {
    /// Focus distance as whole feet plus remaining inches.
    ///
    /// Negative distances, which an inverted focus curve can produce, read as zero.
    pub fn focus_feet_inches(&self) -> (u32, f64) {
        let total_inches = self.focus_distance_m.max(0.0) * INCHES_PER_METER;
        let feet = (total_inches / 12.0).floor();
        (feet as u32, total_inches - feet * 12.0)
    }
}

/// A decoded packet after the conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "units", rename_all = "snake_case")]
pub enum Reading {
    Raw(DecodedPacket),
    Physical(PhysicalPacket),
}

impl Reading {
    /// The decoded packet regardless of conversion.
    pub fn raw(&self) -> &DecodedPacket {
        match self {
            Reading::Raw(packet) => packet,
            Reading::Physical(physical) => &physical.raw,
        }
    }

    pub fn physical(&self) -> Option<&PhysicalPacket> {
        match self {
            Reading::Raw(_) => None,
            Reading::Physical(physical) => Some(physical),
        }
    }
}

/// Whether accepted packets are rescaled.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConversionPolicy {
    #[default]
    Raw,
    Physical(Calibration),
}

impl ConversionPolicy {
    pub fn new(convert_units: bool, calibration: &Calibration) -> Self {
        if convert_units { ConversionPolicy::Physical(calibration.clone()) } else { ConversionPolicy::Raw }
    }

    /// Apply the policy. Total: any 24-bit input converts.
    pub fn apply(&self, packet: DecodedPacket) -> Reading {
        match self {
            ConversionPolicy::Raw => Reading::Raw(packet),
            ConversionPolicy::Physical(calibration) => Reading::Physical(convert(&packet, calibration)),
        }
    }
}

fn convert(packet: &DecodedPacket, calibration: &Calibration) -> PhysicalPacket {
    let degrees = |raw: i32| f64::from(raw) * calibration.rotation_scale;
    let meters = |raw: i32| f64::from(raw) * calibration.position_scale / 1_000.0;

    PhysicalPacket {
        source_id: packet.source_id,
        pan_deg: degrees(packet.pan),
        tilt_deg: degrees(packet.tilt),
        roll_deg: degrees(packet.roll),
        x_m: meters(packet.position_x),
        y_m: meters(packet.position_y),
        z_m: meters(packet.position_z),
        focal_length_mm: calibration.zoom.interpolate(packet.zoom),
        focus_distance_m: calibration.focus.interpolate(packet.focus),
        raw: *packet,
    }
}
