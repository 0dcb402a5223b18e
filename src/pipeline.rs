//! The per-datagram decode pipeline.
//!
//! Each call to [`Pipeline::process`] takes one received byte block through
//!
//! ```text
//! RECEIVED → VALIDATED → CHECKSUM_CHECKED → DECODED → (CONVERTED) → TRACKED
//! ```
//!
//! A failure at VALIDATED or CHECKSUM_CHECKED ends in REJECTED, which only
//! bumps an error counter. Processing is synchronous and owns all of its
//! state, so a pipeline is driven from exactly one task.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::config::SessionSettings;
use crate::convert::{ConversionPolicy, Reading};
use crate::error::{FrameError, RejectReason};
use crate::protocol::{self, ChecksumMode, ChecksumReport, checksum};
use crate::timecode::{FrameRate, SpareTracker, Timecode, TimecodeTag};
use crate::tracking::{SourceKey, TrackingEntry, TrackingTable};
use crate::Result;

/// What happened to one datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    Accepted {
        reading: Reading,
        timecode: Option<TimecodeTag>,
    },
    Rejected {
        reason: RejectReason,
        #[serde(skip)]
        error: Option<FrameError>,
    },
    /// Well-formed frame from a source excluded by the source filter.
    Filtered,
}

/// Result of processing one datagram, as handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Bucket the datagram was attributed to.
    pub source: SourceKey,
    pub disposition: Disposition,
    /// Checksum diagnostics, present once the frame reached that stage.
    pub checksum: Option<ChecksumReport>,
    /// Tracking entry for `source` after this datagram was counted.
    pub entry: Option<TrackingEntry>,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.disposition, Disposition::Accepted { .. })
    }

    pub fn reading(&self) -> Option<&Reading> {
        match &self.disposition {
            Disposition::Accepted { reading, .. } => Some(reading),
            _ => None,
        }
    }

    pub fn timecode(&self) -> Option<&TimecodeTag> {
        match &self.disposition {
            Disposition::Accepted { timecode, .. } => timecode.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FrameError> {
        match &self.disposition {
            Disposition::Rejected { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

/// Attaches timecode to accepted readings.
#[derive(Debug, Clone)]
struct TimecodeTagger {
    rate: FrameRate,
    trackers: HashMap<u8, SpareTracker>,
}

impl TimecodeTagger {
    fn tag(&mut self, reading: &Reading) -> TimecodeTag {
        let packet = reading.raw();
        let spare_value = packet.spare_value();
        let tracker = self.trackers.entry(packet.source_id).or_default();
        let trend = tracker.observe(spare_value);

        TimecodeTag {
            spare_value,
            timecode: Timecode::from_frame_count(spare_value, self.rate),
            rate: self.rate,
            trend,
            likely_timecode: tracker.likely_timecode(),
        }
    }
}

/// Validates, decodes, converts and tracks datagrams.
#[derive(Debug, Clone)]
pub struct Pipeline {
    checksum_mode: ChecksumMode,
    conversion: ConversionPolicy,
    source_filter: Option<u8>,
    tagger: Option<TimecodeTagger>,
    table: TrackingTable,
}

impl Pipeline {
    /// Build a pipeline from validated session settings.
    pub fn new(settings: &SessionSettings) -> Result<Self> {
        settings.validate()?;

        let tagger = settings
            .frame_rate()?
            .map(|rate| TimecodeTagger { rate, trackers: HashMap::new() });

        Ok(Self {
            checksum_mode: ChecksumMode::from_ignore_flag(settings.ignore_checksum),
            conversion: ConversionPolicy::new(settings.convert_units, &settings.calibration),
            source_filter: settings.source_filter,
            tagger,
            table: TrackingTable::new(),
        })
    }

    pub fn checksum_mode(&self) -> ChecksumMode {
        self.checksum_mode
    }

    pub fn conversion(&self) -> &ConversionPolicy {
        &self.conversion
    }

    pub fn tracking(&self) -> &TrackingTable {
        &self.table
    }

    pub fn snapshot(&self, source: impl Into<SourceKey>) -> Option<TrackingEntry> {
        self.table.snapshot(source)
    }

    /// Run one received byte block through every stage.
    pub fn process(&mut self, block: &[u8]) -> Outcome {
        let frame = match protocol::validate(block) {
            Ok(frame) => frame,
            Err(error) => return self.rejected(error, None),
        };

        let source_id = frame.source_id();
        if self.source_filter.is_some_and(|wanted| wanted != source_id) {
            trace!(source_id, "Frame skipped by source filter");
            return Outcome {
                source: SourceKey::Camera(source_id),
                disposition: Disposition::Filtered,
                checksum: None,
                entry: self.table.snapshot(source_id),
            };
        }

        let report = match checksum::verify(&frame, self.checksum_mode) {
            Ok(report) => report,
            Err(error) => {
                let report = checksum::report(frame.bytes());
                return self.rejected(error, Some(report));
            }
        };
        if !report.is_match() {
            trace!(source_id, received = report.received, computed = report.computed, "Checksum mismatch ignored");
        }

        let packet = protocol::decode(&frame);
        let reading = self.conversion.apply(packet);
        let entry = self.table.accept(source_id, packet).clone();
        let timecode = self.tagger.as_mut().map(|tagger| tagger.tag(&reading));

        trace!(source_id, packet_count = entry.packet_count, "Frame accepted");

        Outcome {
            source: SourceKey::Camera(source_id),
            disposition: Disposition::Accepted { reading, timecode },
            checksum: Some(report),
            entry: Some(entry),
        }
    }

    fn rejected(&mut self, error: FrameError, checksum: Option<ChecksumReport>) -> Outcome {
        let source = error.attributed_to();
        let entry = self.table.reject(source).clone();

        debug!(%source, reason = %error.reason(), error_count = entry.error_count, "Frame rejected: {}", error);

        Outcome {
            source,
            disposition: Disposition::Rejected { reason: error.reason(), error: Some(error) },
            checksum,
            entry: Some(entry),
        }
    }
}
