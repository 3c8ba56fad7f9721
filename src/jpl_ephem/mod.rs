//! Ephemeris store: barycentric positions and velocities of Solar System bodies.
//!
//! [`Ephemeris`] is the seam the reduction pipeline depends on. The production
//! implementation is [`SpkEphemeris`](naif::spk_ephemeris::SpkEphemeris), an SPK kernel
//! decoded entirely at load time; tests substitute small synthetic kernels.
//!
//! States are returned in the ICRF/J2000 barycentric frame, positions in AU and velocities
//! in AU/day.
use std::{fmt, str::FromStr};

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::{
    frames::{Barycentric, FramedVector},
    skypos_errors::SkyPosError,
    time::Instant,
};

pub mod naif;

use naif::spk_ephemeris::SpkEphemeris;

/// A Solar System body resolved against a loaded ephemeris.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Body {
    key: String,
    naif_id: i32,
}

impl Body {
    pub fn new(key: impl Into<String>, naif_id: i32) -> Self {
        Body {
            key: key.into(),
            naif_id,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn naif_id(&self) -> i32 {
        self.naif_id
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.naif_id)
    }
}

/// Barycentric position (AU) and velocity (AU/day).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: FramedVector<Barycentric>,
    pub velocity: FramedVector<Barycentric>,
}

/// Read-only source of body states, shared across concurrent queries.
pub trait Ephemeris: Send + Sync {
    /// Resolve a body key. Unknown keys, and keys the loaded data cannot serve, fail with
    /// [`SkyPosError::UnknownBody`].
    fn body(&self, key: &str) -> Result<Body, SkyPosError>;

    /// Barycentric state at `instant`. Instants outside the loaded span fail with
    /// [`SkyPosError::EphemerisRange`].
    fn state(&self, body: &Body, instant: &Instant) -> Result<BodyState, SkyPosError>;

    fn position(
        &self,
        body: &Body,
        instant: &Instant,
    ) -> Result<FramedVector<Barycentric>, SkyPosError> {
        Ok(self.state(body, instant)?.position)
    }

    fn velocity(
        &self,
        body: &Body,
        instant: &Instant,
    ) -> Result<FramedVector<Barycentric>, SkyPosError> {
        Ok(self.state(body, instant)?.velocity)
    }
}

/// Where the ephemeris comes from, written `"naif:<path>"` (or a bare path to a `.bsp`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum EphemerisSource {
    Naif(Utf8PathBuf),
}

impl EphemerisSource {
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            EphemerisSource::Naif(path) => path,
        }
    }

    /// Load the ephemeris eagerly.
    pub fn load(&self) -> Result<SpkEphemeris, SkyPosError> {
        match self {
            EphemerisSource::Naif(path) => SpkEphemeris::read_spk_file(path),
        }
    }
}

impl FromStr for EphemerisSource {
    type Err = SkyPosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, path) = match s.split_once(':') {
            Some((kind, path)) if !kind.contains(['/', '\\', '.']) && kind.len() > 1 => {
                (kind.to_ascii_lowercase(), path)
            }
            _ => ("naif".to_string(), s),
        };

        if path.is_empty() {
            return Err(SkyPosError::InvalidEphemerisSource(format!(
                "missing file path in {s:?}"
            )));
        }

        match kind.as_str() {
            "naif" => Ok(EphemerisSource::Naif(Utf8PathBuf::from(path))),
            other => Err(SkyPosError::InvalidEphemerisSource(format!(
                "unsupported ephemeris kind {other:?}, expected \"naif:<path>\""
            ))),
        }
    }
}

impl TryFrom<&str> for EphemerisSource {
    type Error = SkyPosError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for EphemerisSource {
    type Error = SkyPosError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for EphemerisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EphemerisSource::Naif(path) => write!(f, "naif:{path}"),
        }
    }
}

#[cfg(test)]
mod test_ephemeris_source {
    use super::*;

    #[test]
    fn test_parse_source() {
        let source: EphemerisSource = "naif:data/de421.bsp".try_into().unwrap();
        assert_eq!(source, EphemerisSource::Naif("data/de421.bsp".into()));
        assert_eq!(source.to_string(), "naif:data/de421.bsp");

        let bare: EphemerisSource = "/opt/kernels/de440s.bsp".parse().unwrap();
        assert_eq!(bare.path(), "/opt/kernels/de440s.bsp");

        // a drive letter is not an ephemeris kind
        let windows: EphemerisSource = "C:\\kernels\\de421.bsp".parse().unwrap();
        assert_eq!(windows.path(), "C:\\kernels\\de421.bsp");
    }

    #[test]
    fn test_invalid_source() {
        assert!(matches!(
            "horizon:DE440".parse::<EphemerisSource>(),
            Err(SkyPosError::InvalidEphemerisSource(_))
        ));
        assert!(matches!(
            "naif:".parse::<EphemerisSource>(),
            Err(SkyPosError::InvalidEphemerisSource(_))
        ));
    }

    #[test]
    fn test_missing_kernel_is_fatal() {
        let source = EphemerisSource::Naif("does/not/exist.bsp".into());
        assert!(matches!(source.load(), Err(SkyPosError::IoError(_))));
    }
}
