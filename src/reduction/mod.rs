//! # Astrometric reduction
//!
//! Turns barycentric target data and an observer state into apparent horizontal
//! coordinates.
//!
//! Solar System bodies:
//!
//! 1. light-time iteration ([`light_time::solve_light_time`]),
//! 2. gravitational deflection by the Sun, Jupiter and Saturn (optional),
//! 3. aberration from the observer's barycentric velocity (orbital + diurnal, optional),
//! 4. rotation to the Earth-fixed frame and projection on the local horizon.
//!
//! Stars skip the light-time iteration: the catalog place is moved by proper motion to the
//! query instant, shifted by parallax when it is known, then deflected and aberrated the same
//! way.
//!
//! Altitudes below the horizon are returned as they are; nothing is filtered here.
use std::fmt;

use serde::Deserialize;

use crate::{
    constants::{Degree, DEFLECTORS, VLIGHT_AU},
    earth_orientation::{EarthOrientationModel, Orientation},
    frames::{Barycentric, FrameRotation, FramedVector, Horizontal, Topocentric},
    jpl_ephem::{Body, Ephemeris},
    observers::{Observer, ObserverState},
    skypos_errors::SkyPosError,
    star_catalog::{Star, StarPlace},
    time::{Instant, OffsetApproximation},
};

pub mod light_time;
pub mod relativity;

use light_time::{solve_light_time, LightTimeOptions};
use relativity::{add_aberration, add_deflection};

/// Distance used for the deflection geometry of stars without parallax (1 Gpc).
const DISTANT_STAR_AU: f64 = 2.062_648_062_470_964e14;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReductionOptions {
    pub light_time: LightTimeOptions,
    pub gravitational_deflection: bool,
    /// Off gives astrometric rather than apparent places.
    pub aberration: bool,
}

impl Default for ReductionOptions {
    fn default() -> Self {
        ReductionOptions {
            light_time: LightTimeOptions::default(),
            gravitational_deflection: true,
            aberration: true,
        }
    }
}

/// Apparent horizontal position: altitude in [−90, 90], azimuth in [0, 360) from north
/// through east, distance for Solar System bodies only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApparentPosition {
    pub altitude_deg: Degree,
    pub azimuth_deg: Degree,
    pub distance_au: Option<f64>,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

impl ApparentPosition {
    /// Presentation copy rounded to `angle_decimals` for the angles and
    /// `distance_decimals` for the distance.
    pub fn rounded(&self, angle_decimals: u32, distance_decimals: u32) -> ApparentPosition {
        let azimuth = round_to(self.azimuth_deg, angle_decimals);
        ApparentPosition {
            altitude_deg: round_to(self.altitude_deg, angle_decimals),
            azimuth_deg: if azimuth >= 360.0 { 0.0 } else { azimuth },
            distance_au: self.distance_au.map(|d| round_to(d, distance_decimals)),
        }
    }
}

impl fmt::Display for ApparentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "alt {:.4}°, az {:.4}°",
            self.altitude_deg, self.azimuth_deg
        )?;
        if let Some(distance) = self.distance_au {
            write!(f, ", {distance:.6} AU")?;
        }
        Ok(())
    }
}

/// Full result of a reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub apparent: ApparentPosition,
    /// Apparent right ascension of date (true equator and equinox), degrees in [0, 360).
    pub right_ascension_deg: Degree,
    /// Apparent declination of date, degrees.
    pub declination_deg: Degree,
    /// Light time for Solar System bodies, days.
    pub light_time_days: Option<f64>,
    pub light_time_iterations: usize,
    pub instant: Instant,
    /// Set when the civil time was converted with an extrapolated offset.
    pub time_approximation: Option<OffsetApproximation>,
}

/// Everything about the observer that depends on the query instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservingContext {
    pub instant: Instant,
    pub orientation: Orientation,
    pub state: ObserverState,
    pub horizon: FrameRotation<Topocentric, Horizontal>,
}

impl ObservingContext {
    pub fn new(
        observer: &Observer,
        ephemeris: &dyn Ephemeris,
        model: &dyn EarthOrientationModel,
        instant: Instant,
    ) -> Result<Self, SkyPosError> {
        let orientation = model.orientation_at(&instant);
        let state = observer.barycentric_state(ephemeris, &orientation, &instant)?;
        Ok(ObservingContext {
            instant,
            orientation,
            state,
            horizon: observer.horizon_rotation(&orientation),
        })
    }

    fn observation(
        &self,
        line_of_sight: &FramedVector<Topocentric>,
        distance_au: Option<f64>,
        light_time: Option<(f64, usize)>,
    ) -> Result<Observation, SkyPosError> {
        let local = self.horizon.apply(line_of_sight);
        let (altitude_deg, azimuth_deg) = horizontal_coordinates(&local)?;
        let (ra, dec) = self.orientation.equatorial_of_date(line_of_sight);

        Ok(Observation {
            apparent: ApparentPosition {
                altitude_deg,
                azimuth_deg,
                distance_au,
            },
            right_ascension_deg: ra.to_degrees(),
            declination_deg: dec.to_degrees(),
            light_time_days: light_time.map(|(days, _)| days),
            light_time_iterations: light_time.map_or(0, |(_, iterations)| iterations),
            instant: self.instant,
            time_approximation: None,
        })
    }
}

/// A resolved target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedTarget<'a> {
    Body(&'a Body),
    Star(&'a Star),
}

/// Altitude and azimuth (degrees) of a vector in the horizontal frame.
pub fn horizontal_coordinates(v: &FramedVector<Horizontal>) -> Result<(Degree, Degree), SkyPosError> {
    let (north, east, up) = (v.x(), v.y(), v.z());
    let horizontal = north.hypot(east);
    if !(horizontal > 0.0 || up != 0.0) || !horizontal.is_finite() || !up.is_finite() {
        return Err(SkyPosError::DegenerateGeometry(format!(
            "cannot take the direction of {v}"
        )));
    }

    let altitude = up.atan2(horizontal).to_degrees();
    let azimuth = east.atan2(north).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360 for tiny negative angles
    let azimuth = if azimuth >= 360.0 { 0.0 } else { azimuth };
    Ok((altitude, azimuth))
}

/// Bend `line_of_sight` around the deflectors available in the ephemeris, `skip` excepted.
fn deflect(
    line_of_sight: &mut FramedVector<Topocentric>,
    ephemeris: &dyn Ephemeris,
    context: &ObservingContext,
    skip: Option<i32>,
) -> Result<(), SkyPosError> {
    let observer = context.state.position;
    let mut corrected = *line_of_sight.as_vector();

    for (naif_id, rmass) in DEFLECTORS {
        if skip.is_some_and(|target| target == naif_id || target / 100 == naif_id) {
            continue;
        }
        let deflector = match ephemeris.body(&naif_id.to_string()) {
            Ok(body) => body,
            Err(SkyPosError::UnknownBody(_)) => continue,
            Err(e) => return Err(e),
        };

        // deflector where it was when the light passed it
        let now = ephemeris.position(&deflector, &context.instant)?;
        let delay = now.seen_from(&observer).norm() / VLIGHT_AU;
        let position = ephemeris.position(&deflector, &context.instant.shifted_days(-delay))?;

        add_deflection(
            &mut corrected,
            observer.as_vector(),
            position.as_vector(),
            rmass,
        );
    }

    *line_of_sight = FramedVector::from_vector(corrected);
    Ok(())
}

fn aberrate(
    line_of_sight: &FramedVector<Topocentric>,
    velocity: &FramedVector<Barycentric>,
    light_time_days: f64,
) -> FramedVector<Topocentric> {
    let mut corrected = *line_of_sight.as_vector();
    add_aberration(&mut corrected, velocity.as_vector(), light_time_days);
    FramedVector::from_vector(corrected)
}

/// Apparent position of a Solar System body.
pub fn apparent_body(
    ephemeris: &dyn Ephemeris,
    body: &Body,
    context: &ObservingContext,
    options: &ReductionOptions,
) -> Result<Observation, SkyPosError> {
    let solution = solve_light_time(
        ephemeris,
        body,
        &context.state.position,
        &context.instant,
        &options.light_time,
    )?;

    let mut line_of_sight = solution.line_of_sight;
    if options.gravitational_deflection {
        deflect(&mut line_of_sight, ephemeris, context, Some(body.naif_id()))?;
    }
    if options.aberration {
        line_of_sight = aberrate(
            &line_of_sight,
            &context.state.velocity,
            solution.light_time_days,
        );
    }

    context.observation(
        &line_of_sight,
        Some(line_of_sight.norm()),
        Some((solution.light_time_days, solution.iterations)),
    )
}

/// Apparent position of a catalog star.
pub fn apparent_star(
    ephemeris: &dyn Ephemeris,
    star: &Star,
    context: &ObservingContext,
    options: &ReductionOptions,
) -> Result<Observation, SkyPosError> {
    let degenerate =
        || SkyPosError::DegenerateGeometry(format!("star {} has no direction", star.id));

    let mut line_of_sight = match star.place_at(context.instant.mjd_tt()) {
        StarPlace::Finite(position) => position.seen_from(&context.state.position),
        StarPlace::Direction(direction) => direction
            .direction_from_anywhere()
            .ok_or_else(degenerate)?
            * DISTANT_STAR_AU,
    };

    if options.gravitational_deflection {
        deflect(&mut line_of_sight, ephemeris, context, None)?;
    }

    let mut direction = line_of_sight.unit().ok_or_else(degenerate)?;
    if options.aberration {
        // a unit vector is one AU long: light time 1/c
        direction = aberrate(&direction, &context.state.velocity, 1.0 / VLIGHT_AU);
    }

    context.observation(&direction, None, None)
}

/// Apparent position of a body or a star.
pub fn apparent_position(
    ephemeris: &dyn Ephemeris,
    target: ResolvedTarget<'_>,
    context: &ObservingContext,
    options: &ReductionOptions,
) -> Result<Observation, SkyPosError> {
    match target {
        ResolvedTarget::Body(body) => apparent_body(ephemeris, body, context, options),
        ResolvedTarget::Star(star) => apparent_star(ephemeris, star, context, options),
    }
}
