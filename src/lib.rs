//! Decoder, validator and live tracker for FreeD D1 camera tracking telemetry.
//!
//! Camera trackers and PTZ heads broadcast one 29-byte D1 frame per UDP
//! datagram carrying pan/tilt/roll, XYZ position, zoom and focus. This crate
//! validates each frame, checks its XOR checksum, decodes the 24-bit signed
//! fields, optionally converts them to physical units, and keeps per-camera
//! counters.
//!
//! # Layers
//!
//! - [`protocol`]: the wire format (validation, checksum, field decoding, frame building)
//! - [`Pipeline`]: one synchronous pass per datagram, owning the [`TrackingTable`]
//! - [`Connection`]: a spawned driver feeding a pipeline from UDP or a capture,
//!   publishing [`Update`]s to any number of observers
//!
//! # Example (live UDP)
//!
//! ```rust,no_run
//! use freed::{FreeD, SessionSettings, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> freed::Result<()> {
//!     let settings = SessionSettings::default().convert_units(true);
//!     let connection = FreeD::listen(settings).await?;
//!     let mut updates = connection.updates(UpdateRate::Max(10));
//!
//!     while let Some(update) = updates.next().await {
//!         if let Some(reading) = update.outcome.reading() {
//!             println!("camera {} pan {}", reading.raw().source_id, reading.raw().pan);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Example (single frame)
//!
//! ```rust
//! use freed::{Pipeline, PacketBuilder, SessionSettings};
//!
//! let mut pipeline = Pipeline::new(&SessionSettings::default()).unwrap();
//! let frame = PacketBuilder::new(1).rotation(1234, 5678, 90).build();
//!
//! let outcome = pipeline.process(&frame);
//! assert!(outcome.is_accepted());
//! assert_eq!(pipeline.snapshot(1).unwrap().packet_count, 1);
//! ```

pub mod config;
pub mod convert;
mod error;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod rate;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod timecode;
pub mod tracking;
pub mod types;

pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

pub use config::{ListenSettings, SessionSettings};
pub use connection::Connection;
pub use convert::{Calibration, CalibrationCurve, ConversionPolicy, PhysicalPacket, Reading};
pub use driver::Update;
pub use error::*;
pub use pipeline::{Disposition, Outcome, Pipeline};
pub use protocol::{ChecksumMode, ChecksumReport, DecodedPacket, PacketBuilder};
pub use providers::{ReplayProvider, UdpProvider};
pub use timecode::{FrameRate, Timecode, TimecodeTag};
pub use tracking::{SourceKey, TrackingEntry, TrackingTable};
pub use types::UpdateRate;

/// Entry point for decode sessions.
///
/// ```rust,no_run
/// use freed::{FreeD, SessionSettings};
///
/// # #[tokio::main]
/// # async fn main() -> freed::Result<()> {
/// let settings = SessionSettings::from_file("freed.yaml")?;
/// let connection = FreeD::listen(settings).await?;
/// println!("listening on {:?}", connection.local_addr());
/// # Ok(())
/// # }
/// ```
pub struct FreeD;

impl FreeD {
    /// Bind the configured UDP endpoint and start decoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the socket cannot be bound.
    pub async fn listen(settings: SessionSettings) -> Result<Connection> {
        Connection::listen(settings).await
    }

    /// Decode a hex capture file, paced at the settings' nominal rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the settings are invalid.
    pub fn replay<P: AsRef<std::path::Path>>(path: P, settings: SessionSettings) -> Result<Connection> {
        let provider = ReplayProvider::from_file(path)?.paced(settings.nominal_rate_hz)?;
        Connection::replay(provider, settings)
    }
}
