//! Frame shape validation

use super::{MESSAGE_TYPE_D1, RawFrame, SOURCE_ID_OFFSET};
use crate::error::FrameError;

/// A byte block that has passed the length and message-type checks.
///
/// Borrowing the original block keeps validation zero-copy; the frame is
/// only valid for as long as the datagram buffer it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidFrame<'a> {
    bytes: &'a RawFrame,
}

impl<'a> ValidFrame<'a> {
    pub fn bytes(&self) -> &'a RawFrame {
        self.bytes
    }

    /// Source id as carried in byte 1 (not yet integrity checked).
    pub fn source_id(&self) -> u8 {
        self.bytes[SOURCE_ID_OFFSET]
    }
}

/// Check that `block` is exactly one D1 frame.
///
/// Datagrams are never buffered or reassembled, so any block that is not
/// exactly [`FRAME_LEN`](super::FRAME_LEN) bytes is rejected without looking at its content.
pub fn validate(block: &[u8]) -> Result<ValidFrame<'_>, FrameError> {
    let bytes: &RawFrame =
        block.try_into().map_err(|_| FrameError::wrong_length(block.len()))?;

    if bytes[0] != MESSAGE_TYPE_D1 {
        return Err(FrameError::wrong_message_type(bytes[0]));
    }

    Ok(ValidFrame { bytes })
}
