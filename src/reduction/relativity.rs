//! Aberration and gravitational light deflection.
//!
//! Both corrections act on a line of sight expressed in ICRF axes (AU) and follow the
//! formulation used by the IERS conventions: aberration after Klioner (2003), deflection by a
//! point mass after the IERS 2003 conventions.
use nalgebra::Vector3;

use crate::constants::{AU, GM_SUN, VLIGHT, VLIGHT_AU};

/// Lines of sight this close to the direction of the deflector are left untouched
/// (about 1″ from its centre).
const DEFLECTION_ALIGNMENT_LIMIT: f64 = 0.99999999999;

/// Apply the aberration due to the observer's velocity.
///
/// Arguments
/// ---------
/// * `position`: observer → target vector in AU, corrected in place.
/// * `velocity`: barycentric velocity of the observer in AU/day.
/// * `light_time`: light time along `position`, days.
pub fn add_aberration(position: &mut Vector3<f64>, velocity: &Vector3<f64>, light_time: f64) {
    let p1mag = light_time * VLIGHT_AU;
    let vemag = velocity.norm();
    if vemag == 0.0 || p1mag == 0.0 {
        return;
    }

    let beta = vemag / VLIGHT_AU;
    let cosd = position.dot(velocity) / (p1mag * vemag);
    let gammai = (1.0 - beta * beta).sqrt();
    let p = beta * cosd;
    let q = (1.0 + p / (1.0 + gammai)) * light_time;
    let r = 1.0 + p;

    *position = (*position * gammai + velocity * q) / r;
}

/// Bend a line of sight around one deflecting mass.
///
/// Arguments
/// ---------
/// * `position`: observer → target vector in AU, corrected in place.
/// * `observer`: barycentric position of the observer, AU.
/// * `deflector`: barycentric position of the deflecting body, AU.
/// * `rmass`: reciprocal mass of the deflector in solar masses.
pub fn add_deflection(
    position: &mut Vector3<f64>,
    observer: &Vector3<f64>,
    deflector: &Vector3<f64>,
    rmass: f64,
) {
    // deflector to target, deflector to observer
    let pq = observer + *position - deflector;
    let pe = observer - deflector;

    let pmag = position.norm();
    let qmag = pq.norm();
    let emag = pe.norm();
    if pmag == 0.0 || qmag == 0.0 || emag == 0.0 {
        return;
    }

    let phat = *position / pmag;
    let qhat = pq / qmag;
    let ehat = pe / emag;

    let pdotq = phat.dot(&qhat);
    let qdote = qhat.dot(&ehat);
    let edotp = ehat.dot(&phat);

    if edotp.abs() > DEFLECTION_ALIGNMENT_LIMIT {
        return;
    }

    let fac1 = 2.0 * GM_SUN / (VLIGHT * VLIGHT * emag * AU * rmass);
    let fac2 = 1.0 + qdote;

    *position += (ehat * pdotq - qhat * edotp) * (fac1 / fac2 * pmag);
}

#[cfg(test)]
mod relativity_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::constants::{RADSEC, SECONDS_PER_DAY};

    fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        a.cross(b).norm().atan2(a.dot(b))
    }

    #[test]
    fn test_aberration_zero_velocity() {
        let mut position = Vector3::new(1.0, 0.0, 0.0);
        add_aberration(&mut position, &Vector3::zeros(), 1.0 / VLIGHT_AU);
        assert_eq!(position, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_annual_aberration_amplitude() {
        // 29.78 km/s perpendicular to the line of sight: about 20.5″
        let mut position = Vector3::new(1.0, 0.0, 0.0);
        let velocity = Vector3::new(0.0, 29.78 * SECONDS_PER_DAY / AU, 0.0);
        add_aberration(&mut position, &velocity, 1.0 / VLIGHT_AU);

        let shift = angle_between(&position, &Vector3::new(1.0, 0.0, 0.0)) / RADSEC;
        assert_relative_eq!(shift, 20.49, epsilon = 0.05);
        // shifted towards the direction of motion
        assert!(position.y > 0.0);
        assert_relative_eq!(position.norm(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_aberration_along_motion() {
        let mut position = Vector3::new(2.0, 0.0, 0.0);
        let velocity = Vector3::new(0.01, 0.0, 0.0);
        add_aberration(&mut position, &velocity, 2.0 / VLIGHT_AU);
        assert_relative_eq!(position.y, 0.0);
        assert_relative_eq!(position.z, 0.0);
    }

    #[test]
    fn test_solar_deflection_at_limb() {
        // star grazing the Sun seen from 1 AU: 1.75″
        let observer = Vector3::new(-1.0, 0.0, 0.0);
        let sun = Vector3::zeros();
        let solar_radius_au = 696_000.0 / AU;
        let far = 1.0e9;
        let mut position = Vector3::new(far, solar_radius_au * (far + 1.0), 0.0);
        let before = position;

        add_deflection(&mut position, &observer, &sun, 1.0);

        let shift = angle_between(&position, &before) / RADSEC;
        assert_relative_eq!(shift, 1.75, epsilon = 0.02);
        // light bent away from the Sun
        assert!(position.y / position.x > before.y / before.x);
    }

    #[test]
    fn test_deflection_skipped_when_aligned() {
        let mut position = Vector3::new(10.0, 0.0, 0.0);
        let observer = Vector3::new(1.0, 0.0, 0.0);
        add_deflection(&mut position, &observer, &Vector3::zeros(), 1.0);
        assert_eq!(position, Vector3::new(10.0, 0.0, 0.0));
    }
}
