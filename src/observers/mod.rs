//! # Observer frame builder
//!
//! An [`Observer`] is a geodetic site (latitude, east longitude, elevation above the WGS84
//! ellipsoid). Its Earth-fixed position uses the geocentric parallax coordinates
//! `(ρ·cosφ', ρ·sinφ')`, so the ellipsoid flattening is accounted for:
//!
//! ```text
//! u        = atan((b/a) · tan φ)
//! ρ·sinφ'  = (b/a) · sin u + (h/a) · sin φ
//! ρ·cosφ'  =         cos u + (h/a) · cos φ
//! ```
//!
//! The Earth-fixed vector is rotated into the inertial frame with the
//! [`Orientation`] of the query instant and added to the Earth's barycentric position.
//! Nothing is cached across instants.
//!
//! ## Units
//!
//! - Latitude, longitude: **degrees** (east positive).
//! - Elevation: **meters** above the ellipsoid.
//! - Positions: **AU**; velocities: **AU/day** (diurnal velocity `ω × r`).
use nalgebra::{Matrix3, Vector3};
use ordered_float::NotNan;

use crate::{
    constants::{
        Degree, Meter, Radian, AU, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS, EARTH_ROTATION_RATE,
    },
    earth_orientation::{EarthOrientationModel, Orientation},
    frames::{
        Barycentric, EarthFixed, FrameRotation, FramedVector, Geocentric, Horizontal, Topocentric,
    },
    jpl_ephem::Ephemeris,
    skypos_errors::SkyPosError,
    time::Instant,
};

/// Earth equatorial radius in AU.
pub const EARTH_RADIUS_AU: f64 = EARTH_MAJOR_AXIS / 1000.0 / AU;

fn finite(value: f64, what: &str) -> Result<NotNan<f64>, SkyPosError> {
    if !value.is_finite() {
        return Err(SkyPosError::InvalidObserver(format!(
            "{what} must be a finite number, got {value}"
        )));
    }
    NotNan::new(value).map_err(|_| SkyPosError::InvalidObserver(format!("{what} is NaN")))
}

/// A geodetic observing site.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Observer {
    pub latitude: NotNan<f64>,
    pub longitude: NotNan<f64>,
    /// Elevation above the ellipsoid, meters.
    pub elevation: NotNan<f64>,
    pub rho_cos_phi: NotNan<f64>,
    pub rho_sin_phi: NotNan<f64>,
    pub name: Option<String>,
    earth_fixed_coord: Vector3<NotNan<f64>>,
}

/// Observer position and velocity relative to the Solar System barycenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverState {
    pub position: FramedVector<Barycentric>,
    pub velocity: FramedVector<Barycentric>,
}

impl Observer {
    /// Build a site from geodetic coordinates.
    ///
    /// Arguments
    /// ---------
    /// * `latitude`: geodetic latitude in degrees, within `[-90, 90]`.
    /// * `longitude`: east longitude in degrees.
    /// * `elevation`: height above the ellipsoid in meters.
    ///
    /// Returns
    /// --------
    /// * The observer, or [`SkyPosError::InvalidObserver`] for non-finite inputs, a
    ///   latitude out of range, or an elevation placing the site at or below the Earth's
    ///   centre.
    pub fn new(latitude: Degree, longitude: Degree, elevation: Meter) -> Result<Self, SkyPosError> {
        let latitude = finite(latitude, "latitude")?;
        let longitude = finite(longitude, "longitude")?;
        let elevation = finite(elevation, "elevation")?;

        if latitude.abs() > 90.0 {
            return Err(SkyPosError::InvalidObserver(format!(
                "latitude {latitude}° is outside [-90, 90]"
            )));
        }

        let phi = latitude.to_radians();
        let (rho_cos_phi, rho_sin_phi) = parallax_coordinates(phi, *elevation);

        // distance of the site from the centre, measured along its own vertical
        if rho_cos_phi * phi.cos() + rho_sin_phi * phi.sin() <= 0.0 {
            return Err(SkyPosError::InvalidObserver(format!(
                "elevation {elevation} m puts the site below the centre of the ellipsoid"
            )));
        }

        let lambda = longitude.to_radians();
        let earth_fixed_coord = Vector3::new(
            finite(EARTH_RADIUS_AU * rho_cos_phi * lambda.cos(), "x")?,
            finite(EARTH_RADIUS_AU * rho_cos_phi * lambda.sin(), "y")?,
            finite(EARTH_RADIUS_AU * rho_sin_phi, "z")?,
        );

        Ok(Observer {
            latitude,
            longitude,
            elevation,
            rho_cos_phi: finite(rho_cos_phi, "rho_cos_phi")?,
            rho_sin_phi: finite(rho_sin_phi, "rho_sin_phi")?,
            name: None,
            earth_fixed_coord,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Position in the Earth-fixed frame, AU.
    pub fn earth_fixed_position(&self) -> FramedVector<EarthFixed> {
        FramedVector::from_vector(self.earth_fixed_coord.map(NotNan::into_inner))
    }

    /// Velocity due to the Earth's rotation, `ω × r`, in the Earth-fixed frame (AU/day).
    pub fn earth_fixed_velocity(&self) -> FramedVector<EarthFixed> {
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE);
        FramedVector::from_vector(omega.cross(self.earth_fixed_position().as_vector()))
    }

    pub fn geocentric_position(&self, orientation: &Orientation) -> FramedVector<Geocentric> {
        orientation
            .terrestrial_to_celestial()
            .apply(&self.earth_fixed_position())
    }

    pub fn geocentric_velocity(&self, orientation: &Orientation) -> FramedVector<Geocentric> {
        orientation
            .terrestrial_to_celestial()
            .apply(&self.earth_fixed_velocity())
    }

    /// Barycentric position and velocity at `instant`: Earth's state from the ephemeris plus
    /// the rotated site vector.
    pub fn barycentric_state(
        &self,
        ephemeris: &dyn Ephemeris,
        orientation: &Orientation,
        instant: &Instant,
    ) -> Result<ObserverState, SkyPosError> {
        let earth = ephemeris.body("earth")?;
        let earth_state = ephemeris.state(&earth, instant)?;

        let position = earth_state
            .position
            .displaced_by(&self.geocentric_position(orientation));
        let velocity = earth_state
            .velocity
            .displaced_by(&self.geocentric_velocity(orientation));

        Ok(ObserverState { position, velocity })
    }

    /// Rotation from inertial directions seen by the observer to the local horizon
    /// (north, east, up).
    pub fn horizon_rotation(&self, orientation: &Orientation) -> FrameRotation<Topocentric, Horizontal> {
        let (sin_phi, cos_phi) = self.latitude.to_radians().sin_cos();
        let (sin_lambda, cos_lambda) = self.longitude.to_radians().sin_cos();

        #[rustfmt::skip]
        let earth_fixed_to_horizon = Matrix3::new(
            -sin_phi * cos_lambda, -sin_phi * sin_lambda, cos_phi,
            -sin_lambda,            cos_lambda,           0.0,
             cos_phi * cos_lambda,  cos_phi * sin_lambda, sin_phi,
        );

        FrameRotation::from_matrix(
            earth_fixed_to_horizon * orientation.celestial_to_terrestrial().matrix(),
        )
    }
}

impl std::fmt::Display for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name} ")?;
        }
        write!(
            f,
            "(lat {:.6}°, lon {:.6}°, {:.1} m)",
            *self.latitude, *self.longitude, *self.elevation
        )
    }
}

/// Geocentric parallax coordinates `(ρ·cosφ', ρ·sinφ')` in Earth equatorial radii.
///
/// Arguments
/// ---------
/// * `latitude`: geodetic latitude in radians.
/// * `elevation`: height above the ellipsoid in meters.
pub fn parallax_coordinates(latitude: Radian, elevation: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;
    let height = elevation / EARTH_MAJOR_AXIS;

    // parametric latitude
    let u = (latitude.sin() * axis_ratio).atan2(latitude.cos());

    (
        u.cos() + height * latitude.cos(),
        axis_ratio * u.sin() + height * latitude.sin(),
    )
}

/// Geocentric inertial position of a geodetic site at `instant`.
pub fn geocentric_position(
    latitude: Degree,
    longitude: Degree,
    elevation: Meter,
    model: &dyn EarthOrientationModel,
    instant: &Instant,
) -> Result<FramedVector<Geocentric>, SkyPosError> {
    let observer = Observer::new(latitude, longitude, elevation)?;
    Ok(observer.geocentric_position(&model.orientation_at(instant)))
}

#[cfg(test)]
mod observer_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::earth_orientation::Iau1980;

    #[test]
    fn test_observer_constructor() {
        let observer = Observer::new(0.0, 0.0, 0.0).unwrap();
        assert_eq!(observer.rho_cos_phi, 1.0);
        assert_eq!(observer.rho_sin_phi, 0.0);

        let rubin = Observer::new(-30.2446, 289.25058, 2647.)
            .unwrap()
            .with_name("Rubin Observatory");
        assert_relative_eq!(*rubin.rho_cos_phi, 0.8649760504617418, epsilon = 1e-8);
        assert_relative_eq!(*rubin.rho_sin_phi, -0.5009551027512434, epsilon = 1e-8);
        assert!(rubin.to_string().starts_with("Rubin Observatory (lat -30.244600°"));
    }

    #[test]
    fn test_pole_is_on_the_minor_axis() {
        let pole = Observer::new(90.0, 0.0, 0.0).unwrap();
        let position = pole.earth_fixed_position();
        assert_relative_eq!(position.x(), 0.0, epsilon = 1e-15);
        assert_relative_eq!(position.z(), EARTH_MINOR_AXIS / 1000.0 / AU, epsilon = 1e-15);
        assert_relative_eq!(pole.earth_fixed_velocity().norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_equatorial_rotation_speed() {
        let site = Observer::new(0.0, 58.5, 0.0).unwrap();
        assert_relative_eq!(
            site.earth_fixed_velocity().norm(),
            EARTH_ROTATION_RATE * EARTH_RADIUS_AU,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_invalid_observers() {
        for (lat, lon, elevation) in [
            (91.0, 0.0, 0.0),
            (-90.5, 0.0, 0.0),
            (f64::NAN, 0.0, 0.0),
            (0.0, f64::INFINITY, 0.0),
            (45.0, 0.0, -7.0e6),
        ] {
            assert!(matches!(
                Observer::new(lat, lon, elevation),
                Err(SkyPosError::InvalidObserver(_))
            ));
        }
        // deep but still above the centre
        assert!(Observer::new(45.0, 0.0, -6.0e6).is_ok());
    }

    #[test]
    fn test_horizon_rotation() {
        let orientation = Orientation::new(Matrix3::identity(), 0.0);

        // on the equator at the Greenwich meridian, +x points to the zenith
        let site = Observer::new(0.0, 0.0, 0.0).unwrap();
        let up = site
            .horizon_rotation(&orientation)
            .apply(&FramedVector::<Topocentric>::new(1.0, 0.0, 0.0));
        assert_relative_eq!(*up.as_vector(), Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-15);

        let north = site
            .horizon_rotation(&orientation)
            .apply(&FramedVector::<Topocentric>::new(0.0, 0.0, 1.0));
        assert_relative_eq!(*north.as_vector(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-15);

        // at the North Pole the celestial pole is overhead
        let pole = Observer::new(90.0, 0.0, 0.0).unwrap();
        let zenith = pole
            .horizon_rotation(&orientation)
            .apply(&FramedVector::<Topocentric>::new(0.0, 0.0, 1.0));
        assert_relative_eq!(zenith.z(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_geocentric_position_keeps_length() {
        let instant = Instant::from_tt_mjd(60481.5, 69.2);
        let position = geocentric_position(23.6, 58.5, 0.0, &Iau1980, &instant).unwrap();
        let site = Observer::new(23.6, 58.5, 0.0).unwrap();
        assert_relative_eq!(
            position.norm(),
            site.earth_fixed_position().norm(),
            epsilon = 1e-15
        );
        assert!(position.norm() < EARTH_RADIUS_AU);
        assert!(geocentric_position(123.0, 0.0, 0.0, &Iau1980, &instant).is_err());
    }
}
