//! Arrival-rate measurement.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of intervals averaged.
pub const RATE_WINDOW: usize = 30;

/// A pause longer than this starts a fresh measurement.
pub const RATE_RESET_GAP: Duration = Duration::from_secs(2);

/// Smoothed arrival rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    /// Mean interval between datagrams in milliseconds.
    pub interval_ms: f64,
    /// Datagrams per second.
    pub fps: f64,
}

/// Rolling average of datagram arrival intervals.
#[derive(Debug, Clone, Default)]
pub struct PacketRate {
    last_arrival: Option<Instant>,
    intervals: VecDeque<Duration>,
}

impl PacketRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival and return the current average, if there is one.
    pub fn record(&mut self, at: Instant) -> Option<RateSample> {
        if let Some(last) = self.last_arrival {
            let gap = at.saturating_duration_since(last);
            if gap > RATE_RESET_GAP {
                self.intervals.clear();
            } else {
                if self.intervals.len() == RATE_WINDOW {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(gap);
            }
        }
        self.last_arrival = Some(at);
        self.current()
    }

    pub fn current(&self) -> Option<RateSample> {
        if self.intervals.is_empty() {
            return None;
        }
        let total: Duration = self.intervals.iter().sum();
        let mean = total.as_secs_f64() / self.intervals.len() as f64;
        if mean <= 0.0 {
            return None;
        }
        Some(RateSample { interval_ms: mean * 1_000.0, fps: 1.0 / mean })
    }
}
