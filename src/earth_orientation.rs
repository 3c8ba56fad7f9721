//! # Earth orientation: precession, nutation and Earth rotation
//!
//! The rotation from the inertial (ICRF/J2000) frame to the Earth-fixed frame is composed as
//!
//! ```text
//! C(t) = R3(GAST) · N(t) · P(t)
//! ```
//!
//! * `P`: IAU 1976 precession (Lieske angles ζ, z, θ);
//! * `N`: IAU 1980 nutation truncated to its 49 terms of at least
//!   0.0005″ (the dropped terms add up to less than 0.01″);
//! * `R3(GAST)`: Greenwich apparent sidereal time, i.e. GMST(UT1) plus the equation of the
//!   equinoxes.
//!
//! Polar motion and the frame bias between ICRF and the J2000 dynamical frame (≈ 0.02″) are
//! neglected. Within ±3 centuries of J2000 the model error stays below 0.05″; the dominant
//! remaining error comes from the ΔT used for UT1 (see [`crate::time`]).
use nalgebra::Matrix3;

use crate::{
    constants::{ArcSec, Radian, DAYS_PER_JULIAN_CENTURY, MJD, RADEG, RADSEC, T2000},
    frames::{rotation_matrix, Axis, EarthFixed, FrameRotation, FramedVector, Geocentric, Topocentric},
    time::{gast, Instant},
};

/// Multipliers of (l, l', F, D, Ω) and coefficients (Δψ sin, Δψ sin·T, Δε cos, Δε cos·T)
/// in units of 0.0001″.
#[rustfmt::skip]
const NUTATION_TERMS: [([i8; 5], [f64; 4]); 49] = [
    ([ 0,  0,  0,  0, 1], [-171996.0, -174.2, 92025.0,  8.9]),
    ([ 0,  0,  2, -2, 2], [ -13187.0,   -1.6,  5736.0, -3.1]),
    ([ 0,  0,  2,  0, 2], [  -2274.0,   -0.2,   977.0, -0.5]),
    ([ 0,  0,  0,  0, 2], [   2062.0,    0.2,  -895.0,  0.5]),
    ([ 0,  1,  0,  0, 0], [   1426.0,   -3.4,    54.0, -0.1]),
    ([ 1,  0,  0,  0, 0], [    712.0,    0.1,    -7.0,  0.0]),
    ([ 0,  1,  2, -2, 2], [   -517.0,    1.2,   224.0, -0.6]),
    ([ 0,  0,  2,  0, 1], [   -386.0,   -0.4,   200.0,  0.0]),
    ([ 1,  0,  2,  0, 2], [   -301.0,    0.0,   129.0, -0.1]),
    ([ 0, -1,  2, -2, 2], [    217.0,   -0.5,   -95.0,  0.3]),
    ([ 1,  0,  0, -2, 0], [   -158.0,    0.0,    -1.0,  0.0]),
    ([ 0,  0,  2, -2, 1], [    129.0,    0.1,   -70.0,  0.0]),
    ([-1,  0,  2,  0, 2], [    123.0,    0.0,   -53.0,  0.0]),
    ([ 0,  0,  0,  2, 0], [     63.0,    0.0,    -2.0,  0.0]),
    ([ 1,  0,  0,  0, 1], [     63.0,    0.1,   -33.0,  0.0]),
    ([-1,  0,  2,  2, 2], [    -59.0,    0.0,    26.0,  0.0]),
    ([-1,  0,  0,  0, 1], [    -58.0,   -0.1,    32.0,  0.0]),
    ([ 1,  0,  2,  0, 1], [    -51.0,    0.0,    27.0,  0.0]),
    ([ 2,  0,  0, -2, 0], [     48.0,    0.0,     1.0,  0.0]),
    ([-2,  0,  2,  0, 1], [     46.0,    0.0,   -24.0,  0.0]),
    ([ 0,  0,  2,  2, 2], [    -38.0,    0.0,    16.0,  0.0]),
    ([ 2,  0,  2,  0, 2], [    -31.0,    0.0,    13.0,  0.0]),
    ([ 2,  0,  0,  0, 0], [     29.0,    0.0,    -1.0,  0.0]),
    ([ 1,  0,  2, -2, 2], [     29.0,    0.0,   -12.0,  0.0]),
    ([ 0,  0,  2,  0, 0], [     26.0,    0.0,    -1.0,  0.0]),
    ([ 0,  0,  2, -2, 0], [    -22.0,    0.0,     0.0,  0.0]),
    ([-1,  0,  2,  0, 1], [     21.0,    0.0,   -10.0,  0.0]),
    ([ 0,  2,  0,  0, 0], [     17.0,   -0.1,     0.0,  0.0]),
    ([-1,  0,  0,  2, 1], [     16.0,    0.0,    -8.0,  0.0]),
    ([ 0,  2,  2, -2, 2], [    -16.0,    0.1,     7.0,  0.0]),
    ([ 0,  1,  0,  0, 1], [    -15.0,    0.0,     9.0,  0.0]),
    ([ 1,  0,  0, -2, 1], [    -13.0,    0.0,     7.0,  0.0]),
    ([ 0, -1,  0,  0, 1], [    -12.0,    0.0,     6.0,  0.0]),
    ([ 2,  0, -2,  0, 0], [     11.0,    0.0,     0.0,  0.0]),
    ([-1,  0,  2,  2, 1], [    -10.0,    0.0,     5.0,  0.0]),
    ([ 1,  0,  2,  2, 2], [     -8.0,    0.0,     3.0,  0.0]),
    ([ 0,  1,  2,  0, 2], [      7.0,    0.0,    -3.0,  0.0]),
    ([ 1,  1,  0, -2, 0], [     -7.0,    0.0,     0.0,  0.0]),
    ([ 0, -1,  2,  0, 2], [     -7.0,    0.0,     3.0,  0.0]),
    ([ 0,  0,  2,  2, 1], [     -7.0,    0.0,     3.0,  0.0]),
    ([ 1,  0,  0,  2, 0], [      6.0,    0.0,     0.0,  0.0]),
    ([ 2,  0,  2, -2, 2], [      6.0,    0.0,    -3.0,  0.0]),
    ([ 1,  0,  2, -2, 1], [      6.0,    0.0,    -3.0,  0.0]),
    ([ 0,  0,  0,  2, 1], [     -6.0,    0.0,     3.0,  0.0]),
    ([-2,  0,  0,  2, 1], [     -6.0,    0.0,     3.0,  0.0]),
    ([ 1, -1,  0,  0, 0], [      5.0,    0.0,     0.0,  0.0]),
    ([ 0, -1,  2, -2, 1], [     -5.0,    0.0,     3.0,  0.0]),
    ([ 0,  0,  0, -2, 1], [     -5.0,    0.0,     3.0,  0.0]),
    ([ 2,  0,  2,  0, 1], [     -5.0,    0.0,     3.0,  0.0]),
];

fn julian_centuries(mjd_tt: MJD) -> f64 {
    (mjd_tt - T2000) / DAYS_PER_JULIAN_CENTURY
}

/// Mean obliquity of the ecliptic (IAU 1976).
///
/// Arguments
/// ---------
/// * `mjd_tt`: Modified Julian Date (TT).
///
/// Returns
/// --------
/// * ε in radians, `ε = 84381.448″ − 46.815″ T − 0.00059″ T² + 0.001813″ T³`.
pub fn mean_obliquity(mjd_tt: MJD) -> Radian {
    let t = julian_centuries(mjd_tt);
    (((0.001813 * t - 0.00059) * t - 46.815) * t + 84381.448) * RADSEC
}

/// Delaunay arguments (l, l', F, D, Ω) in radians at `t` Julian centuries of TT.
fn fundamental_arguments(t: f64) -> [Radian; 5] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        485866.733 + 1717915922.633 * t + 31.310 * t2 + 0.064 * t3,
        1287099.804 + 129596581.224 * t - 0.577 * t2 - 0.012 * t3,
        335778.877 + 1739527263.137 * t - 13.257 * t2 + 0.011 * t3,
        1072261.307 + 1602961601.328 * t - 6.891 * t2 + 0.019 * t3,
        450160.280 - 6962890.539 * t + 7.455 * t2 + 0.008 * t3,
    ]
    .map(|arcsec| (arcsec % 1_296_000.0) * RADSEC)
}

/// Nutation in longitude and obliquity (truncated IAU 1980 series).
///
/// Arguments
/// ---------
/// * `mjd_tt`: Modified Julian Date (TT).
///
/// Returns
/// --------
/// * `(Δψ, Δε)` in arcseconds.
pub fn nutation(mjd_tt: MJD) -> (ArcSec, ArcSec) {
    let t = julian_centuries(mjd_tt);
    let args = fundamental_arguments(t);

    let (dpsi, deps) = NUTATION_TERMS
        .iter()
        .fold((0.0, 0.0), |(dpsi, deps), (multipliers, coeffs)| {
            let angle: f64 = multipliers
                .iter()
                .zip(args.iter())
                .map(|(&m, arg)| f64::from(m) * arg)
                .sum();
            let (s, c) = angle.sin_cos();
            (
                dpsi + (coeffs[0] + coeffs[1] * t) * s,
                deps + (coeffs[2] + coeffs[3] * t) * c,
            )
        });

    (dpsi * 1e-4, deps * 1e-4)
}

/// Nutation matrix, mean equator and equinox of date → true equator and equinox of date.
///
/// `N = R1(−ε − Δε) · R3(−Δψ) · R1(ε)`
pub fn nutation_matrix(mjd_tt: MJD) -> Matrix3<f64> {
    let eps_mean = mean_obliquity(mjd_tt);
    let (dpsi, deps) = nutation(mjd_tt);
    let eps_true = eps_mean + deps * RADSEC;

    rotation_matrix(-eps_true, Axis::X)
        * rotation_matrix(-dpsi * RADSEC, Axis::Z)
        * rotation_matrix(eps_mean, Axis::X)
}

/// Equation of the equinoxes `Δψ cos ε`, in radians.
pub fn equation_of_equinoxes(mjd_tt: MJD) -> Radian {
    let (dpsi, _) = nutation(mjd_tt);
    dpsi * RADSEC * mean_obliquity(mjd_tt).cos()
}

/// Precession matrix, J2000 mean equator → mean equator and equinox of date (IAU 1976).
///
/// `P = R3(−z) · R2(θ) · R3(−ζ)`, with
///
/// ```text
/// ζ = 0.6406161° T + 0.0000839° T² + 0.0000050° T³
/// z = 0.6406161° T + 0.0003041° T² + 0.0000051° T³
/// θ = 0.5567530° T − 0.0001185° T² − 0.0000116° T³
/// ```
pub fn precession_matrix(mjd_tt: MJD) -> Matrix3<f64> {
    let t = julian_centuries(mjd_tt);

    let zeta = ((0.0000050 * t + 0.0000839) * t + 0.6406161) * t * RADEG;
    let z = ((0.0000051 * t + 0.0003041) * t + 0.6406161) * t * RADEG;
    let theta = ((-0.0000116 * t - 0.0001185) * t + 0.5567530) * t * RADEG;

    rotation_matrix(-z, Axis::Z) * rotation_matrix(theta, Axis::Y) * rotation_matrix(-zeta, Axis::Z)
}

/// Earth orientation at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    precession_nutation: Matrix3<f64>,
    gast: Radian,
    celestial_to_terrestrial: FrameRotation<Geocentric, EarthFixed>,
}

impl Orientation {
    pub fn new(precession_nutation: Matrix3<f64>, gast: Radian) -> Self {
        let spin = rotation_matrix(gast, Axis::Z);
        Orientation {
            precession_nutation,
            gast,
            celestial_to_terrestrial: FrameRotation::from_matrix(spin * precession_nutation),
        }
    }

    /// Greenwich apparent sidereal time, radians.
    pub fn gast(&self) -> Radian {
        self.gast
    }

    /// Matrix taking ICRF vectors to the true equator and equinox of date.
    pub fn precession_nutation(&self) -> &Matrix3<f64> {
        &self.precession_nutation
    }

    pub fn celestial_to_terrestrial(&self) -> &FrameRotation<Geocentric, EarthFixed> {
        &self.celestial_to_terrestrial
    }

    pub fn terrestrial_to_celestial(&self) -> FrameRotation<EarthFixed, Geocentric> {
        self.celestial_to_terrestrial.inverse()
    }

    /// Right ascension and declination of date (true equator and equinox) of a line of sight.
    pub fn equatorial_of_date(&self, line_of_sight: &FramedVector<Topocentric>) -> (Radian, Radian) {
        let of_date = self.precession_nutation * line_of_sight.as_vector();
        let (ra, dec, _) = crate::frames::cartesian_to_spherical(&of_date);
        (ra, dec)
    }
}

/// Source of Earth orientation, injected into the reduction.
pub trait EarthOrientationModel: Send + Sync {
    fn orientation_at(&self, instant: &Instant) -> Orientation;
}

/// IAU 1976 precession, truncated IAU 1980 nutation, GMST 1982.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Iau1980;

impl EarthOrientationModel for Iau1980 {
    fn orientation_at(&self, instant: &Instant) -> Orientation {
        let mjd_tt = instant.mjd_tt();
        let precession_nutation = nutation_matrix(mjd_tt) * precession_matrix(mjd_tt);
        Orientation::new(precession_nutation, gast(instant))
    }
}

#[cfg(test)]
mod test_earth_orientation {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_obliquity() {
        assert_relative_eq!(mean_obliquity(T2000), 0.40909280422232897, epsilon = 1e-15);
    }

    #[test]
    fn test_nutation_at_j2000() {
        // full IAU 1980 series: Δψ = -13.923385″, Δε = -5.773808″
        let (dpsi, deps) = nutation(T2000);
        assert_relative_eq!(dpsi, -13.923385, epsilon = 0.02);
        assert_relative_eq!(deps, -5.773808, epsilon = 0.02);
    }

    #[test]
    fn test_nutation_is_bounded() {
        for k in 0..40 {
            let (dpsi, deps) = nutation(T2000 + 500.0 * k as f64);
            assert!(dpsi.abs() < 20.0, "Δψ = {dpsi}");
            assert!(deps.abs() < 11.0, "Δε = {deps}");
        }
    }

    #[test]
    fn test_nutation_matrix_at_j2000() {
        let n = nutation_matrix(T2000);
        // off-diagonal terms are -Δψ cos ε, -Δψ sin ε and Δε at first order
        assert_relative_eq!(n[(0, 1)], 6.19323e-5, epsilon = 2e-7);
        assert_relative_eq!(n[(0, 2)], 2.68509e-5, epsilon = 2e-7);
        assert_relative_eq!(n[(1, 2)], 2.79914e-5, epsilon = 2e-7);
        assert_relative_eq!(n * n.transpose(), Matrix3::identity(), epsilon = 1e-14);
    }

    #[test]
    fn test_precession_matrix() {
        assert_relative_eq!(precession_matrix(T2000), Matrix3::identity(), epsilon = 1e-15);

        // one century later the pole has moved by θ
        let p = precession_matrix(T2000 + DAYS_PER_JULIAN_CENTURY);
        let theta = (0.5567530 - 0.0001185 - 0.0000116) * RADEG;
        let pole = p * Vector3::z();
        assert_relative_eq!(pole.z, theta.cos(), epsilon = 1e-14);

        // the J2000 equinox drifts eastward by about ζ + z
        let equinox = p * Vector3::x();
        let ra = equinox.y.atan2(equinox.x) / RADEG;
        assert!(ra > 1.27 && ra < 1.29, "ra = {ra}");
        assert_relative_eq!(p * p.transpose(), Matrix3::identity(), epsilon = 1e-14);
    }

    #[test]
    fn test_equation_of_equinoxes() {
        let expected = nutation(T2000).0 * RADSEC * mean_obliquity(T2000).cos();
        assert_relative_eq!(equation_of_equinoxes(T2000), expected, epsilon = 1e-15);
        assert!((equation_of_equinoxes(60000.0) / RADSEC).abs() < 18.0);
    }

    #[test]
    fn test_orientation_maps_greenwich_meridian() {
        let instant = Instant::from_tt_mjd(60_310.3, 69.2);
        let orientation = Iau1980.orientation_at(&instant);

        // a true-of-date direction at right ascension GAST lies on the Greenwich meridian
        let ra = orientation.gast();
        let of_date = Vector3::new(ra.cos(), ra.sin(), 0.0);
        let icrf = orientation.precession_nutation().transpose() * of_date;
        let fixed = orientation
            .celestial_to_terrestrial()
            .apply(&FramedVector::<Geocentric>::from_vector(icrf));
        assert_relative_eq!(fixed.as_vector(), &Vector3::x(), epsilon = 1e-12);

        let back = orientation.terrestrial_to_celestial().apply(&fixed);
        assert_relative_eq!(back.as_vector(), &icrf, epsilon = 1e-12);
    }
}
