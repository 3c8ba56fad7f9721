//! # Constants and unit aliases for skypos
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **unit type
//! aliases** shared by the time system, the ephemeris reader, the Earth orientation model and
//! the reduction pipeline.
//!
//! ## Overview
//!
//! - Astronomical and geodetic constants (AU, speed of light, WGS84 ellipsoid)
//! - Unit conversions (degrees ↔ radians, arcseconds ↔ radians, days ↔ seconds)
//! - Time-scale anchors (J2000, MJD offset, TT − TAI)
//! - Reciprocal masses of the light deflectors

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days in a Julian year
pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

/// Days in a Julian century
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// TT − TAI in seconds
pub const TT_MINUS_TAI: f64 = 32.184;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Milliarcseconds → radians
pub const RADMAS: f64 = RADSEC / 1000.0;

/// Earth equatorial radius in meters (WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Inverse flattening of the WGS84 ellipsoid
pub const EARTH_INVERSE_FLATTENING: f64 = 298.257_223_563;

/// Earth polar radius in meters (WGS84)
pub const EARTH_MINOR_AXIS: f64 = EARTH_MAJOR_AXIS * (1.0 - 1.0 / EARTH_INVERSE_FLATTENING);

/// Ratio of the sidereal to the solar day rate
pub const SIDEREAL_RATE: f64 = 1.00273790934;

/// Earth rotation rate in radians per day
pub const EARTH_ROTATION_RATE: f64 = DPI * SIDEREAL_RATE;

/// Speed of light in km/s
pub const VLIGHT: f64 = 2.99792458e5;

/// Speed of light in astronomical units per day
pub const VLIGHT_AU: f64 = VLIGHT / AU * SECONDS_PER_DAY;

/// Heliocentric gravitational constant in km³/s² (DE4xx)
pub const GM_SUN: f64 = 1.327_124_400_18e11;

// -------------------------------------------------------------------------------------------------
// Light deflectors: (NAIF id, Sun mass / body mass)
// -------------------------------------------------------------------------------------------------

/// Bodies whose gravitational light deflection is applied, with their reciprocal masses.
pub const DEFLECTORS: [(i32, f64); 3] = [(10, 1.0), (5, 1_047.348_6), (6, 3_497.898)];

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
/// Seconds past J2000 in the TDB scale (SPK time argument)
pub type EphemerisSeconds = f64;
