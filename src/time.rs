//! # Time scales: civil UTC, dynamical TT/TDB and UT1
//!
//! Civil timestamps are [`hifitime::Epoch`] values read in UTC. The offset between civil and
//! dynamical time is taken from a [`TimeOffsetTable`] loaded from a CSV file (one row per
//! leap second and per year), never from constants compiled into the crate:
//!
//! ```text
//! TT  = UTC + (TAI − UTC) + 32.184 s      (TAI − UTC: step function of the table)
//! UT1 = TT − ΔT                           (ΔT: linear interpolation of the table)
//! TDB ≈ TT + 0.001657 s · sin g + …       (SPK time argument)
//! ```
//!
//! Requests outside the table fall back to the nearest row and come back flagged through
//! [`DynamicalTime::approximation`]; [`TimeSystem::to_dynamical_time_strict`] refuses them
//! with [`SkyPosError::TimeOutOfRange`] instead.
use std::io::Read;

use camino::Utf8Path;
use hifitime::{Epoch, TimeScale};
use itertools::Itertools;
use log::{info, warn};
use serde::Deserialize;

use crate::{
    constants::{
        Degree, EphemerisSeconds, Radian, DAYS_PER_JULIAN_CENTURY, DPI, MJD, RADEG,
        SECONDS_PER_DAY, SIDEREAL_RATE, T2000, TT_MINUS_TAI,
    },
    earth_orientation::equation_of_equinoxes,
    skypos_errors::SkyPosError,
};

/// A point in dynamical time (TT), with the ΔT used to relate it to Earth rotation.
///
/// Immutable once built; ordering follows TT.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Instant {
    mjd_tt: MJD,
    delta_t: f64,
}

impl Instant {
    /// Build an instant from a TT Modified Julian Date and ΔT = TT − UT1 in seconds.
    pub fn from_tt_mjd(mjd_tt: MJD, delta_t: f64) -> Self {
        Instant { mjd_tt, delta_t }
    }

    pub fn mjd_tt(&self) -> MJD {
        self.mjd_tt
    }

    /// TT − UT1 in seconds.
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn mjd_ut1(&self) -> MJD {
        self.mjd_tt - self.delta_t / SECONDS_PER_DAY
    }

    /// Julian centuries of TT elapsed since J2000.
    pub fn julian_centuries(&self) -> f64 {
        (self.mjd_tt - T2000) / DAYS_PER_JULIAN_CENTURY
    }

    /// TDB seconds past J2000, the time argument of SPK kernels.
    pub fn et_seconds(&self) -> EphemerisSeconds {
        let days = self.mjd_tt - T2000;
        let g = (357.53 + 0.98560028 * days) * RADEG;
        days * SECONDS_PER_DAY + 0.001657 * g.sin() + 0.000014 * (2.0 * g).sin()
    }

    /// The same clock reading shifted by `days` (negative to go back in time).
    pub fn shifted_days(&self, days: f64) -> Instant {
        Instant {
            mjd_tt: self.mjd_tt + days,
            delta_t: self.delta_t,
        }
    }

    pub fn to_epoch(&self) -> Epoch {
        Epoch::from_mjd_in_time_scale(self.mjd_tt, TimeScale::TT)
    }
}

impl std::fmt::Display for Instant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (ΔT = {:.3} s)", self.to_epoch(), self.delta_t)
    }
}

/// Marks a conversion that used the nearest table row instead of a bracketing one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetApproximation {
    pub requested_mjd: MJD,
    pub table_start: MJD,
    pub table_end: MJD,
}

/// Result of a civil → dynamical conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicalTime {
    pub instant: Instant,
    pub approximation: Option<OffsetApproximation>,
}

impl DynamicalTime {
    pub fn is_approximate(&self) -> bool {
        self.approximation.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OffsetRow {
    pub mjd_utc: MJD,
    pub tai_minus_utc: f64,
    pub delta_t: f64,
}

/// Leap-second and ΔT table, sorted by UTC day.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeOffsetTable {
    rows: Vec<OffsetRow>,
}

impl TimeOffsetTable {
    pub fn new(rows: Vec<OffsetRow>) -> Result<Self, SkyPosError> {
        if rows.is_empty() {
            return Err(SkyPosError::InvalidTimeTable("the table is empty".into()));
        }
        if let Some((a, b)) = rows
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.mjd_utc >= b.mjd_utc)
        {
            return Err(SkyPosError::InvalidTimeTable(format!(
                "rows are not strictly increasing: MJD {} followed by MJD {}",
                a.mjd_utc, b.mjd_utc
            )));
        }
        if let Some(row) = rows
            .iter()
            .find(|r| !(r.mjd_utc.is_finite() && r.tai_minus_utc.is_finite() && r.delta_t.is_finite()))
        {
            return Err(SkyPosError::InvalidTimeTable(format!(
                "non finite value in row {row:?}"
            )));
        }
        Ok(TimeOffsetTable { rows })
    }

    /// Read a CSV table with `mjd_utc`, `tai_minus_utc` and `delta_t` columns.
    /// Lines starting with `#` are comments; extra columns are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SkyPosError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let rows = csv_reader
            .deserialize::<OffsetRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rows)
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, SkyPosError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        let (start, end) = table.span();
        info!(
            "Loaded time offset table {path}: {} rows, MJD {start} to {end}",
            table.rows.len()
        );
        Ok(table)
    }

    pub fn rows(&self) -> &[OffsetRow] {
        &self.rows
    }

    /// First and last tabulated UTC days.
    pub fn span(&self) -> (MJD, MJD) {
        // non-empty by construction
        let first = self.rows.first().map_or(0.0, |r| r.mjd_utc);
        let last = self.rows.last().map_or(0.0, |r| r.mjd_utc);
        (first, last)
    }

    pub fn contains(&self, mjd_utc: MJD) -> bool {
        let (start, end) = self.span();
        (start..=end).contains(&mjd_utc)
    }

    /// TAI − UTC in seconds in force on `mjd_utc` (nearest row outside the table).
    pub fn tai_minus_utc(&self, mjd_utc: MJD) -> f64 {
        let idx = self.rows.partition_point(|r| r.mjd_utc <= mjd_utc);
        self.rows[idx.saturating_sub(1)].tai_minus_utc
    }

    /// ΔT = TT − UT1 in seconds at `mjd_utc`, clamped to the end rows outside the table.
    pub fn delta_t(&self, mjd_utc: MJD) -> f64 {
        let idx = self.rows.partition_point(|r| r.mjd_utc <= mjd_utc);
        if idx == 0 {
            return self.rows[0].delta_t;
        }
        if idx == self.rows.len() {
            return self.rows[idx - 1].delta_t;
        }
        let (a, b) = (&self.rows[idx - 1], &self.rows[idx]);
        let fraction = (mjd_utc - a.mjd_utc) / (b.mjd_utc - a.mjd_utc);
        a.delta_t + fraction * (b.delta_t - a.delta_t)
    }

    /// Inverse of the leap-second step: TAI − UTC in force at a TAI date.
    fn tai_minus_utc_at_tai(&self, mjd_tai: MJD) -> f64 {
        let idx = self
            .rows
            .partition_point(|r| r.mjd_utc + r.tai_minus_utc / SECONDS_PER_DAY <= mjd_tai);
        self.rows[idx.saturating_sub(1)].tai_minus_utc
    }
}

/// Conversions between civil time, dynamical time and sidereal time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSystem {
    table: TimeOffsetTable,
}

impl TimeSystem {
    pub fn new(table: TimeOffsetTable) -> Self {
        TimeSystem { table }
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, SkyPosError> {
        Ok(Self::new(TimeOffsetTable::from_path(path)?))
    }

    pub fn table(&self) -> &TimeOffsetTable {
        &self.table
    }

    /// Convert a civil (UTC) timestamp to dynamical time.
    ///
    /// Arguments
    /// ---------
    /// * `civil`: the timestamp; it is read in UTC whatever its own time scale.
    ///
    /// Returns
    /// --------
    /// * The [`Instant`] and, when `civil` falls outside the offset table, the
    ///   [`OffsetApproximation`] describing the fallback to the nearest row.
    pub fn to_dynamical_time(&self, civil: &Epoch) -> DynamicalTime {
        let mjd_utc = civil.to_mjd_utc_days();
        let approximation = if self.table.contains(mjd_utc) {
            None
        } else {
            let (table_start, table_end) = self.table.span();
            warn!(
                "{civil} is outside the time offset table (MJD {table_start} to {table_end}), using the nearest tabulated offsets"
            );
            Some(OffsetApproximation {
                requested_mjd: mjd_utc,
                table_start,
                table_end,
            })
        };

        let mjd_tt = mjd_utc
            + (self.table.tai_minus_utc(mjd_utc) + TT_MINUS_TAI) / SECONDS_PER_DAY;

        DynamicalTime {
            instant: Instant::from_tt_mjd(mjd_tt, self.table.delta_t(mjd_utc)),
            approximation,
        }
    }

    /// Same as [`Self::to_dynamical_time`], but refuses timestamps outside the table.
    pub fn to_dynamical_time_strict(&self, civil: &Epoch) -> Result<Instant, SkyPosError> {
        let converted = self.to_dynamical_time(civil);
        match converted.approximation {
            None => Ok(converted.instant),
            Some(approx) => Err(SkyPosError::TimeOutOfRange {
                requested: approx.requested_mjd,
                start: approx.table_start,
                end: approx.table_end,
            }),
        }
    }

    /// Convert a dynamical instant back to a civil UTC epoch.
    pub fn to_civil_time(&self, instant: &Instant) -> Epoch {
        let mjd_tai = instant.mjd_tt() - TT_MINUS_TAI / SECONDS_PER_DAY;
        let mjd_utc = mjd_tai - self.table.tai_minus_utc_at_tai(mjd_tai) / SECONDS_PER_DAY;
        Epoch::from_mjd_utc(mjd_utc)
    }

    /// Civil "now" as a dynamical time.
    pub fn now(&self) -> Result<DynamicalTime, SkyPosError> {
        let now = Epoch::now().map_err(|e| SkyPosError::InvalidTimestamp(e.to_string()))?;
        Ok(self.to_dynamical_time(&now))
    }

    /// Local apparent sidereal time at an east longitude, in radians within `[0, 2π)`.
    pub fn sidereal_time(&self, instant: &Instant, longitude: Degree) -> Radian {
        local_apparent_sidereal_time(instant, longitude)
    }
}

/// Parse a civil timestamp such as `"2024-06-20T08:06:00 UTC"` (UTC when no scale is given).
pub fn parse_civil(timestamp: &str) -> Result<Epoch, SkyPosError> {
    timestamp
        .trim()
        .parse::<Epoch>()
        .map_err(|e| SkyPosError::InvalidTimestamp(format!("{timestamp}: {e}")))
}

/// Greenwich mean sidereal time (IAU 1982).
///
/// Arguments
/// ---------
/// * `mjd_ut1`: Modified Julian Date in UT1.
///
/// Returns
/// --------
/// * GMST in radians, normalised to `[0, 2π)`.
///
/// The polynomial gives GMST at 0h UT1 of the day; the elapsed fraction of the day is then
/// added at the sidereal rate.
pub fn gmst(mjd_ut1: MJD) -> Radian {
    // seconds of sidereal time at 0h UT1
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    let midnight = mjd_ut1.floor();
    let t = (midnight - T2000) / DAYS_PER_JULIAN_CENTURY;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / SECONDS_PER_DAY;
    let day_fraction = (mjd_ut1 - midnight) * DPI;

    (gmst0 + day_fraction * SIDEREAL_RATE).rem_euclid(DPI)
}

/// Greenwich apparent sidereal time: GMST plus the equation of the equinoxes.
pub fn gast(instant: &Instant) -> Radian {
    (gmst(instant.mjd_ut1()) + equation_of_equinoxes(instant.mjd_tt())).rem_euclid(DPI)
}

/// Local apparent sidereal time at an east longitude, in radians.
pub fn local_apparent_sidereal_time(instant: &Instant, longitude: Degree) -> Radian {
    (gast(instant) + longitude * RADEG).rem_euclid(DPI)
}
