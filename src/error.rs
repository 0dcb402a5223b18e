//! Error types for FreeD decoding and transport.
//!
//! Two layers of errors exist in this crate:
//!
//! - [`FrameError`] describes why a single datagram was rejected by the
//!   decode pipeline. These are local, per-frame conditions: they are counted
//!   in the tracking table and reported to observers, but never end a session.
//! - [`FreedError`] covers everything around the pipeline: binding the
//!   listener socket, receiving datagrams, loading settings.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use freed::FreedError;
//!
//! let error = FreedError::receive_failed(std::io::Error::other("network is down"));
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::protocol::{FRAME_LEN, MESSAGE_TYPE_D1};
use crate::tracking::SourceKey;

/// Result type alias for FreeD operations.
pub type Result<T, E = FreedError> = std::result::Result<T, E>;

/// Why a received byte block was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame length {actual} bytes (expected {expected})")]
    Length { actual: usize, expected: usize },

    #[error("Invalid message type {found:#04x} (expected {expected:#04x})")]
    MessageType { found: u8, expected: u8 },

    #[error("Checksum mismatch from source {source_id}: received {received:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { source_id: u8, received: u8, computed: u8 },
}

/// Short machine-readable rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    WrongLength,
    WrongMessageType,
    ChecksumMismatch,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::WrongLength => "wrong_length",
            RejectReason::WrongMessageType => "wrong_message_type",
            RejectReason::ChecksumMismatch => "checksum_mismatch",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FrameError {
    /// Helper constructor for a block of the wrong size.
    pub fn wrong_length(actual: usize) -> Self {
        FrameError::Length { actual, expected: FRAME_LEN }
    }

    /// Helper constructor for a block with the wrong leading tag.
    pub fn wrong_message_type(found: u8) -> Self {
        FrameError::MessageType { found, expected: MESSAGE_TYPE_D1 }
    }

    pub fn reason(&self) -> RejectReason {
        match self {
            FrameError::Length { .. } => RejectReason::WrongLength,
            FrameError::MessageType { .. } => RejectReason::WrongMessageType,
            FrameError::ChecksumMismatch { .. } => RejectReason::ChecksumMismatch,
        }
    }

    /// The tracking bucket this rejection is counted against.
    ///
    /// Length and tag failures mean the block is not a D1 frame at all, so
    /// byte 1 cannot be trusted as a source id. A checksum failure happens on a
    /// correctly shaped frame, so it is charged to the camera named in byte 1.
    pub fn attributed_to(&self) -> SourceKey {
        match self {
            FrameError::Length { .. } | FrameError::MessageType { .. } => SourceKey::Unknown,
            FrameError::ChecksumMismatch { source_id, .. } => SourceKey::Camera(*source_id),
        }
    }
}

/// Main error type for listener, configuration and transport operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FreedError {
    #[error("Failed to bind FreeD listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive datagram")]
    Receive {
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {context}: {details}")]
    Config { context: String, details: String },
}

impl FreedError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FreedError::Receive { .. } => true,
            FreedError::Bind { .. } => true,
            FreedError::File { .. } => false,
            FreedError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FreedError::Bind { .. } => vec![
                "Check that no other application holds the UDP port exclusively",
                "Verify the listen address belongs to a local interface",
                "Use a port above 1024 when running unprivileged",
            ],
            FreedError::Receive { .. } => vec![
                "Check the network interface is up",
                "Verify firewall rules allow inbound UDP",
            ],
            FreedError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            FreedError::Config { .. } => vec![
                "Check the setting named in the error",
                "Compare against the documented defaults",
            ],
        }
    }

    /// Helper constructor for socket bind failures.
    pub fn bind_failed(addr: SocketAddr, source: std::io::Error) -> Self {
        FreedError::Bind { addr, source }
    }

    /// Helper constructor for receive failures.
    pub fn receive_failed(source: std::io::Error) -> Self {
        FreedError::Receive { source }
    }

    /// Helper constructor for settings file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        FreedError::File { path, source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        FreedError::Config { context: context.into(), details: details.into() }
    }
}
