//! Per-source tracking state.
//!
//! The table is owned by the [`Pipeline`](crate::pipeline::Pipeline) that
//! feeds it; its accessor methods are the only way counters change. Entries
//! are created on the first frame seen from a source and never evicted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::protocol::DecodedPacket;

/// Identity a frame is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    /// A camera id read from byte 1 of a well-formed frame.
    Camera(u8),
    /// Frames whose source id could not be trusted.
    Unknown,
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKey::Camera(id) => write!(f, "camera {}", id),
            SourceKey::Unknown => f.write_str("unknown"),
        }
    }
}

impl From<u8> for SourceKey {
    fn from(id: u8) -> Self {
        SourceKey::Camera(id)
    }
}

/// Counters and last accepted packet for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub packet_count: u64,
    pub error_count: u64,
    /// `None` until a frame from this source has been accepted.
    pub last_packet: Option<DecodedPacket>,
}

/// All sources seen during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingTable {
    entries: BTreeMap<SourceKey, TrackingEntry>,
}

impl TrackingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an accepted packet and make it the latest for its source.
    pub fn accept(&mut self, source_id: u8, packet: DecodedPacket) -> &TrackingEntry {
        let entry = self.entries.entry(SourceKey::Camera(source_id)).or_default();
        entry.packet_count = entry.packet_count.saturating_add(1);
        entry.last_packet = Some(packet);
        entry
    }

    /// Count a rejected frame against the best-known source.
    pub fn reject(&mut self, source: SourceKey) -> &TrackingEntry {
        let entry = self.entries.entry(source).or_default();
        entry.error_count = entry.error_count.saturating_add(1);
        entry
    }

    /// Copy of the entry for `source`, or `None` if it has never reported.
    pub fn snapshot(&self, source: impl Into<SourceKey>) -> Option<TrackingEntry> {
        self.entries.get(&source.into()).cloned()
    }

    pub fn get(&self, source: impl Into<SourceKey>) -> Option<&TrackingEntry> {
        self.entries.get(&source.into())
    }

    /// Entries in source order, cameras first, `Unknown` last.
    pub fn iter(&self) -> impl Iterator<Item = (&SourceKey, &TrackingEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accepted packets across all sources.
    pub fn total_packets(&self) -> u64 {
        self.entries.values().map(|entry| entry.packet_count).sum()
    }

    /// Rejected frames across all sources, including `Unknown`.
    pub fn total_errors(&self) -> u64 {
        self.entries.values().map(|entry| entry.error_count).sum()
    }
}
