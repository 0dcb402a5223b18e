//! Display rate control for update streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants to see updates.
///
/// Trackers commonly send at the video rate (50 or 60 Hz, sometimes more);
/// a console view rarely needs that many redraws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRate {
    /// Every processed datagram, in order.
    #[default]
    Native,

    /// At most this many updates per second, latest wins.
    /// Zero, or a rate at or above the source rate, means `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Effective rate against the nominal source rate.
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Max(hz) if hz == 0 || f64::from(hz) >= source_hz => UpdateRate::Native,
            rate => rate,
        }
    }

    pub fn needs_throttle(self, source_hz: f64) -> bool {
        matches!(self.normalize(source_hz), UpdateRate::Max(_))
    }

    /// Minimum spacing between updates, if throttling applies.
    pub fn throttle_interval(self, source_hz: f64) -> Option<Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
