use hifitime::Epoch;
use thiserror::Error;

use crate::constants::MJD;

/// Errors raised by the skypos crate.
///
/// Caller errors (`UnknownBody`, `StarNotFound`, `InvalidObserver`) and range errors
/// (`EphemerisRange`, `TimeOutOfRange`) are deterministic functions of the query, so
/// nothing in the crate retries them. Range errors carry the valid bounds.
#[derive(Error, Debug)]
pub enum SkyPosError {
    #[error("Unknown body: {0}")]
    UnknownBody(String),

    #[error("Star not found in catalog: {0}")]
    StarNotFound(String),

    #[error(
        "Epoch {requested} is outside the ephemeris span of segment {target} wrt {center}: valid from {start} to {end}"
    )]
    EphemerisRange {
        target: i32,
        center: i32,
        requested: Epoch,
        start: Epoch,
        end: Epoch,
    },

    #[error("MJD {requested} is outside the time offset table: valid from MJD {start} to MJD {end}")]
    TimeOutOfRange { requested: MJD, start: MJD, end: MJD },

    #[error("Invalid observer: {0}")]
    InvalidObserver(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Light-time iteration did not converge after {iterations} iterations (last correction {last_correction_days} days)")]
    LightTimeDiverged {
        iterations: usize,
        last_correction_days: f64,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid time offset table: {0}")]
    InvalidTimeTable(String),

    #[error("Invalid star catalog entry: {0}")]
    InvalidStarCatalog(String),

    #[error("Invalid ephemeris file source: {0}")]
    InvalidEphemerisSource(String),

    #[error("Unsupported ephemeris file: {0}")]
    UnsupportedEphemerisFile(String),

    #[error("Corrupted ephemeris file: {0}")]
    CorruptedEphemerisFile(String),

    #[error("Invalid SPK data type: {0}")]
    InvalidSpkDataType(i32),

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for SkyPosError {
    fn eq(&self, other: &Self) -> bool {
        use SkyPosError::*;
        match (self, other) {
            (UnknownBody(a), UnknownBody(b)) => a == b,
            (StarNotFound(a), StarNotFound(b)) => a == b,
            (
                EphemerisRange {
                    target: ta,
                    center: ca,
                    requested: ra,
                    start: sa,
                    end: ea,
                },
                EphemerisRange {
                    target: tb,
                    center: cb,
                    requested: rb,
                    start: sb,
                    end: eb,
                },
            ) => ta == tb && ca == cb && ra == rb && sa == sb && ea == eb,
            (
                TimeOutOfRange {
                    requested: ra,
                    start: sa,
                    end: ea,
                },
                TimeOutOfRange {
                    requested: rb,
                    start: sb,
                    end: eb,
                },
            ) => ra == rb && sa == sb && ea == eb,
            (InvalidObserver(a), InvalidObserver(b)) => a == b,
            (DegenerateGeometry(a), DegenerateGeometry(b)) => a == b,
            (
                LightTimeDiverged {
                    iterations: ia,
                    last_correction_days: la,
                },
                LightTimeDiverged {
                    iterations: ib,
                    last_correction_days: lb,
                },
            ) => ia == ib && la == lb,
            (InvalidTimestamp(a), InvalidTimestamp(b)) => a == b,
            (InvalidTimeTable(a), InvalidTimeTable(b)) => a == b,
            (InvalidStarCatalog(a), InvalidStarCatalog(b)) => a == b,
            (InvalidEphemerisSource(a), InvalidEphemerisSource(b)) => a == b,
            (UnsupportedEphemerisFile(a), UnsupportedEphemerisFile(b)) => a == b,
            (CorruptedEphemerisFile(a), CorruptedEphemerisFile(b)) => a == b,
            (InvalidSpkDataType(a), InvalidSpkDataType(b)) => a == b,
            (NomParsingError(a), NomParsingError(b)) => a == b,

            // not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for SkyPosError {
    fn from(err: nom::Err<E>) -> Self {
        SkyPosError::NomParsingError(format!("{err:?}"))
    }
}
