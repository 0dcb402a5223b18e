//! Session settings.
//!
//! Settings are read once when a session starts and never change while it
//! runs. They can be built in code or loaded from YAML:
//!
//! ```yaml
//! listen:
//!   host: 0.0.0.0
//!   port: 45000
//! ignore_checksum: false
//! convert_units: true
//! source_filter: 1
//! timecode_fps: 25
//! calibration:
//!   rotation_scale: 0.000030517578125
//!   zoom:
//!     - { raw: 28000, value: 28.0 }
//!     - { raw: 100000, value: 100.0 }
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing::debug;

use crate::convert::Calibration;
use crate::protocol::FRAME_LEN;
use crate::timecode::FrameRate;
use crate::{FreedError, Result};

/// Default UDP port for FreeD senders.
pub const DEFAULT_PORT: u16 = 45_000;

/// Receive buffer large enough for oversized datagrams to be seen (and rejected) whole.
pub const DEFAULT_RECV_BUFFER: usize = 1_024;

/// Where and how to listen for datagrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenSettings {
    pub host: IpAddr,
    pub port: u16,
    /// Bytes read per datagram. Must exceed [`FRAME_LEN`] so an oversized
    /// datagram arrives long and is rejected, not cut down to a valid frame.
    pub recv_buffer: usize,
    /// Accept broadcast datagrams.
    pub broadcast: bool,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            recv_buffer: DEFAULT_RECV_BUFFER,
            broadcast: true,
        }
    }
}

impl ListenSettings {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Everything a session needs, fixed at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub listen: ListenSettings,
    /// Accept frames whose checksum does not match.
    pub ignore_checksum: bool,
    /// Report readings in physical units.
    pub convert_units: bool,
    /// Only track this camera id; other well-formed frames are skipped.
    pub source_filter: Option<u8>,
    /// Render the spare bytes as timecode at this rate.
    pub timecode_fps: Option<f64>,
    /// Expected sender rate, used to decide whether display throttling is needed.
    pub nominal_rate_hz: f64,
    pub calibration: Calibration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            listen: ListenSettings::default(),
            ignore_checksum: false,
            convert_units: false,
            source_filter: None,
            timecode_fps: None,
            nominal_rate_hz: 60.0,
            calibration: Calibration::default(),
        }
    }
}

impl SessionSettings {
    /// Parse and validate settings from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: SessionSettings = serde_yaml_ng::from_str(yaml)
            .map_err(|e| FreedError::config("settings YAML", e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a YAML settings file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| FreedError::file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), bytes = yaml.len(), "Loaded settings file");
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| FreedError::config("settings YAML", e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen.recv_buffer <= FRAME_LEN {
            return Err(FreedError::config(
                "listen.recv_buffer",
                format!("must be larger than the {}-byte frame, got {}", FRAME_LEN, self.listen.recv_buffer),
            ));
        }
        if !self.nominal_rate_hz.is_finite() || self.nominal_rate_hz <= 0.0 {
            return Err(FreedError::config(
                "nominal_rate_hz",
                format!("must be a positive rate, got {}", self.nominal_rate_hz),
            ));
        }
        self.frame_rate()?;
        self.calibration.validate()
    }

    /// Validated timecode frame rate, if timecode tagging is enabled.
    pub fn frame_rate(&self) -> Result<Option<FrameRate>> {
        self.timecode_fps.map(FrameRate::new).transpose()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.listen.port = port;
        self
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.listen.host = host;
        self
    }

    pub fn ignore_checksum(mut self, ignore: bool) -> Self {
        self.ignore_checksum = ignore;
        self
    }

    pub fn convert_units(mut self, convert: bool) -> Self {
        self.convert_units = convert;
        self
    }

    pub fn source_filter(mut self, source_id: Option<u8>) -> Self {
        self.source_filter = source_id;
        self
    }

    pub fn timecode_fps(mut self, fps: Option<f64>) -> Self {
        self.timecode_fps = fps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn empty_document_gives_defaults() -> Result<()> {
        let settings = SessionSettings::from_yaml_str("{}").context("empty mapping should parse")?;
        assert_eq!(settings, SessionSettings::default());
        assert_eq!(settings.listen.addr().to_string(), "0.0.0.0:45000");
        Ok(())
    }

    #[test]
    fn parses_partial_document() -> Result<()> {
        let yaml = r#"
listen:
  host: 127.0.0.1
  port: 40000
ignore_checksum: true
convert_units: true
source_filter: 3
timecode_fps: 29.97
calibration:
  position_scale: 0.0625
  focus:
    - { raw: 0, value: 0.5 }
    - { raw: 10000, value: 10.0 }
"#;
        let settings = SessionSettings::from_yaml_str(yaml)?;

        assert_eq!(settings.listen.addr().to_string(), "127.0.0.1:40000");
        assert_eq!(settings.listen.recv_buffer, DEFAULT_RECV_BUFFER);
        assert!(settings.ignore_checksum);
        assert!(settings.convert_units);
        assert_eq!(settings.source_filter, Some(3));
        assert_eq!(settings.frame_rate()?.map(|r| r.fps()), Some(29.97));
        assert_eq!(settings.calibration.position_scale, 0.0625);
        assert_eq!(settings.calibration.focus.points().len(), 2);
        assert_eq!(settings.calibration.zoom, Calibration::default().zoom);
        Ok(())
    }

    #[test]
    fn rejects_unordered_calibration_curve() {
        let yaml = r#"
calibration:
  zoom:
    - { raw: 50000, value: 50.0 }
    - { raw: 28000, value: 28.0 }
"#;
        let error = SessionSettings::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, FreedError::Config { .. }));
    }

    #[test]
    fn rejects_sub_one_fps_timecode() {
        let error = SessionSettings::from_yaml_str("timecode_fps: 0").unwrap_err();
        assert!(error.to_string().contains("timecode_fps"));
    }

    #[test]
    fn receive_buffer_must_exceed_one_frame() {
        let with_buffer = |recv_buffer| SessionSettings {
            listen: ListenSettings { recv_buffer, ..Default::default() },
            ..Default::default()
        };

        for too_small in [0, 1, FRAME_LEN] {
            let error = with_buffer(too_small).validate().unwrap_err();
            assert!(error.to_string().contains("listen.recv_buffer"));
        }
        assert!(with_buffer(FRAME_LEN + 1).validate().is_ok());
        assert!(SessionSettings::from_yaml_str("listen:\n  recv_buffer: 29\n").is_err());
    }

    #[test]
    fn yaml_round_trip_keeps_settings() -> Result<()> {
        let settings = SessionSettings::default().convert_units(true).source_filter(Some(9)).timecode_fps(Some(24.0));
        let yaml = settings.to_yaml_string()?;
        assert_eq!(SessionSettings::from_yaml_str(&yaml)?, settings);
        Ok(())
    }

    #[test]
    fn missing_file_reports_path() {
        let error = SessionSettings::from_file("/nonexistent/freed.yaml").unwrap_err();
        match error {
            FreedError::File { path, .. } => assert_eq!(path, Path::new("/nonexistent/freed.yaml")),
            other => panic!("Expected File error, got {:?}", other),
        }
    }
}
