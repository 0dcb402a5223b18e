//! Checksum engine
//!
//! The D1 checksum is the XOR of every byte before it (bytes 0..=27),
//! stored in byte 28.

use serde::{Deserialize, Serialize};

use super::{CHECKSUM_OFFSET, RawFrame};
use super::frame::ValidFrame;
use crate::error::FrameError;

/// Whether a checksum mismatch rejects the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumMode {
    /// Mismatching frames are rejected.
    #[default]
    Verify,
    /// Every frame is treated as matching. The computed value is still
    /// reported for diagnostics.
    Bypass,
}

impl ChecksumMode {
    pub fn from_ignore_flag(ignore_checksum: bool) -> Self {
        if ignore_checksum { ChecksumMode::Bypass } else { ChecksumMode::Verify }
    }
}

/// Computed and received checksum for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumReport {
    pub computed: u8,
    pub received: u8,
}

impl ChecksumReport {
    pub fn is_match(&self) -> bool {
        self.computed == self.received
    }
}

/// XOR of bytes 0..=27.
pub fn compute(frame: &RawFrame) -> u8 {
    frame[..CHECKSUM_OFFSET].iter().fold(0, |acc, byte| acc ^ byte)
}

/// Compare the computed checksum against the trailing byte.
pub fn report(frame: &RawFrame) -> ChecksumReport {
    ChecksumReport { computed: compute(frame), received: frame[CHECKSUM_OFFSET] }
}

/// Verify a validated frame under the given mode.
///
/// Returns the report on success so callers can surface mismatches that
/// were let through in [`ChecksumMode::Bypass`].
pub fn verify(frame: &ValidFrame<'_>, mode: ChecksumMode) -> Result<ChecksumReport, FrameError> {
    let report = report(frame.bytes());

    if !report.is_match() && mode == ChecksumMode::Verify {
        return Err(FrameError::ChecksumMismatch {
            source_id: frame.source_id(),
            received: report.received,
            computed: report.computed,
        });
    }

    Ok(report)
}

/// Overwrite byte 28 with the correct checksum.
pub fn seal(frame: &mut RawFrame) {
    frame[CHECKSUM_OFFSET] = compute(frame);
}
