//! # skypos
//!
//! Apparent sky positions of Solar System bodies and catalogued stars for an observer on
//! the Earth's surface.
//!
//! ## Modules
//!
//! - [`time`]: civil ↔ dynamical time from a leap-second/ΔT table, sidereal time
//! - [`jpl_ephem`]: SPK (types 2 and 3) ephemeris store behind the [`jpl_ephem::Ephemeris`] trait
//! - [`earth_orientation`]: precession, nutation and Earth rotation
//! - [`observers`]: WGS84 observer position and velocity, local horizon
//! - [`reduction`]: light time, deflection, aberration, horizontal coordinates
//! - [`star_catalog`]: CSV star table with proper motion and parallax
//! - [`skypos`]: configuration and the [`skypos::SkyPos`] query façade
//!
//! Vectors carry their reference frame in their type ([`frames`]).
pub mod constants;
pub mod earth_orientation;
pub mod frames;
pub mod jpl_ephem;
pub mod observers;
pub mod reduction;
pub mod skypos;
pub mod skypos_errors;
pub mod star_catalog;
pub mod time;
