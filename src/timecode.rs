//! Timecode tagging from the spare bytes.
//!
//! FreeD leaves bytes 26–27 unassigned. Several trackers put a running
//! frame counter there; read as a big-endian u16 it can be rendered as
//! `HH:MM:SS:FF` at a known frame rate. Whether a given sender really does
//! this is not signalled on the wire, so [`SpareTracker`] watches the
//! sequence and reports when it looks like a counter.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FreedError, Result};

/// Consecutive +1 steps after which the spare value is treated as a counter.
pub const LIKELY_TIMECODE_RUN: u32 = 10;

/// Frame rate used to split a frame count into timecode components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FrameRate(f64);

impl FrameRate {
    /// Fractional rates such as 29.97 are accepted; counting uses the
    /// whole-frame part. Rates below 1 fps cannot form a timecode.
    pub fn new(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps < 1.0 {
            return Err(FreedError::config("timecode_fps", format!("frame rate must be at least 1 fps, got {}", fps)));
        }
        Ok(Self(fps))
    }

    pub fn fps(&self) -> f64 {
        self.0
    }

    fn whole_frames(&self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<f64> for FrameRate {
    type Error = FreedError;

    fn try_from(fps: f64) -> Result<Self> {
        Self::new(fps)
    }
}

impl From<FrameRate> for f64 {
    fn from(rate: FrameRate) -> Self {
        rate.0
    }
}

/// A non-drop-frame timecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u16,
}

impl Timecode {
    pub fn from_frame_count(count: u16, rate: FrameRate) -> Self {
        let fps = rate.whole_frames();
        let count = u32::from(count);

        let frames = count % fps;
        let total_seconds = count / fps;
        let total_minutes = total_seconds / 60;

        Self {
            hours: total_minutes / 60,
            minutes: (total_minutes % 60) as u8,
            seconds: (total_seconds % 60) as u8,
            // `frames` is below `count`, which came from a u16.
            frames: frames as u16,
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds, self.frames)
    }
}

/// How the spare value moved relative to the previous packet from the same source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpareTrend {
    First,
    Incrementing { run: u32 },
    Unchanged { run: u32 },
    Jumped { delta: i32 },
}

/// Per-source history of spare values.
#[derive(Debug, Clone, Default)]
pub struct SpareTracker {
    last: Option<u16>,
    increments: u32,
    repeats: u32,
}

impl SpareTracker {
    pub fn observe(&mut self, value: u16) -> SpareTrend {
        let trend = match self.last {
            None => SpareTrend::First,
            Some(last) => match i32::from(value) - i32::from(last) {
                1 => {
                    self.increments += 1;
                    SpareTrend::Incrementing { run: self.increments }
                }
                0 => {
                    self.repeats += 1;
                    SpareTrend::Unchanged { run: self.repeats }
                }
                delta => {
                    self.increments = 0;
                    self.repeats = 0;
                    SpareTrend::Jumped { delta }
                }
            },
        };
        self.last = Some(value);
        trend
    }

    pub fn likely_timecode(&self) -> bool {
        self.increments > LIKELY_TIMECODE_RUN
    }
}

/// Timecode attached to an accepted reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimecodeTag {
    pub spare_value: u16,
    pub timecode: Timecode,
    pub rate: FrameRate,
    pub trend: SpareTrend,
    pub likely_timecode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(fps: f64) -> FrameRate {
        FrameRate::new(fps).unwrap()
    }

    #[test]
    fn splits_frame_count() {
        let tc = Timecode::from_frame_count(0, rate(24.0));
        assert_eq!(tc.to_string(), "00:00:00:00");

        let tc = Timecode::from_frame_count(25, rate(24.0));
        assert_eq!(tc.to_string(), "00:00:01:01");

        // 65535 frames at 25 fps = 2621 s + 10 frames
        let tc = Timecode::from_frame_count(u16::MAX, rate(25.0));
        assert_eq!(tc, Timecode { hours: 0, minutes: 43, seconds: 41, frames: 10 });
    }

    #[test]
    fn fractional_rates_count_whole_frames() {
        let tc = Timecode::from_frame_count(58, rate(29.97));
        assert_eq!(tc.to_string(), "00:00:02:00");
    }

    #[test]
    fn one_fps_reaches_hours() {
        let tc = Timecode::from_frame_count(3_661, rate(1.0));
        assert_eq!(tc.to_string(), "01:01:01:00");
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(FrameRate::new(0.0).is_err());
        assert!(FrameRate::new(0.5).is_err());
        assert!(FrameRate::new(-24.0).is_err());
        assert!(FrameRate::new(f64::NAN).is_err());
    }

    #[test]
    fn tracker_classifies_sequence() {
        let mut tracker = SpareTracker::default();
        assert_eq!(tracker.observe(10), SpareTrend::First);
        assert_eq!(tracker.observe(11), SpareTrend::Incrementing { run: 1 });
        assert_eq!(tracker.observe(12), SpareTrend::Incrementing { run: 2 });
        assert_eq!(tracker.observe(12), SpareTrend::Unchanged { run: 1 });
        assert_eq!(tracker.observe(5), SpareTrend::Jumped { delta: -7 });
        assert_eq!(tracker.observe(6), SpareTrend::Incrementing { run: 1 });
    }

    #[test]
    fn long_increment_run_looks_like_timecode() {
        let mut tracker = SpareTracker::default();
        for value in 0..=LIKELY_TIMECODE_RUN as u16 {
            tracker.observe(value);
        }
        assert!(!tracker.likely_timecode());
        tracker.observe(LIKELY_TIMECODE_RUN as u16 + 1);
        assert!(tracker.likely_timecode());
    }
}
