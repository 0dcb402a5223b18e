//! Replay provider for captured datagrams

use std::collections::VecDeque;
use std::path::Path;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::provider::Provider;
use crate::types::Datagram;
use crate::{FreedError, Result};

/// Plays back a capture of datagrams, one byte block per call.
///
/// Captures can be built in memory or loaded from a text file holding one
/// hex-encoded datagram per line (`#` starts a comment, whitespace between
/// bytes is ignored).
pub struct ReplayProvider {
    datagrams: VecDeque<Vec<u8>>,
    total: usize,
    /// Pacing period; `None` replays as fast as the consumer reads.
    period: Option<Duration>,
    /// Created on first read so construction needs no runtime.
    interval: Option<Interval>,
    label: String,
}

impl ReplayProvider {
    pub fn new(datagrams: Vec<Vec<u8>>) -> Self {
        let total = datagrams.len();
        Self { datagrams: datagrams.into(), total, period: None, interval: None, label: "memory".to_string() }
    }

    /// Load a hex capture file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FreedError::file_error(path.to_path_buf(), e))?;
        let mut provider = Self::new(parse_hex_capture(&text)?);
        provider.label = path.display().to_string();
        info!(path = %path.display(), datagrams = provider.total, "Loaded capture");
        Ok(provider)
    }

    /// Deliver datagrams at `hz` per second instead of back to back.
    pub fn paced(mut self, hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(FreedError::config("replay rate", format!("must be a positive rate, got {}", hz)));
        }
        self.period = Some(Duration::from_secs_f64(1.0 / hz));
        Ok(self)
    }

    pub fn remaining(&self) -> usize {
        self.datagrams.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn next_datagram(&mut self) -> Result<Option<Datagram>> {
        if self.datagrams.is_empty() {
            debug!(total = self.total, "Reached end of replay");
            return Ok(None);
        }

        if let Some(period) = self.period {
            let pacing = self.interval.get_or_insert_with(|| {
                let mut pacing = interval(period);
                pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
                pacing
            });
            pacing.tick().await;
        }

        Ok(self.datagrams.pop_front().map(|payload| Datagram::new(payload, None)))
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.label)
    }
}

/// Parse one datagram per non-empty line of hex text.
pub fn parse_hex_capture(text: &str) -> Result<Vec<Vec<u8>>> {
    let mut datagrams = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default();
        let digits: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        if digits.is_empty() {
            continue;
        }

        let context = || format!("capture line {}", index + 1);
        if digits.len() % 2 != 0 {
            return Err(FreedError::config(context(), "odd number of hex digits"));
        }

        let payload = digits
            .chunks(2)
            .map(|pair| match (hex_value(pair[0]), hex_value(pair[1])) {
                (Some(high), Some(low)) => Ok((high << 4) | low),
                _ => Err(FreedError::config(context(), format!("invalid hex byte {:?}", String::from_utf8_lossy(pair)))),
            })
            .collect::<Result<Vec<u8>>>()?;
        datagrams.push(payload);
    }

    Ok(datagrams)
}

fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).map(|value| value as u8)
}
