//! Light-time correction: where the target was when the observed light left it.
//!
//! Fixed-point iteration on the light time `τ`:
//!
//! ```text
//! τ₀ = 0
//! τₖ₊₁ = | r_target(t − τₖ) − r_observer(t) | / c
//! ```
//!
//! The loop is bounded by [`LightTimeOptions::max_iterations`] and stops as soon as
//! `|τₖ₊₁ − τₖ| < tolerance_days`. Each step shrinks the error by about `v/c`, so planets
//! converge in three or four iterations.
use log::debug;
use serde::Deserialize;

use crate::{
    constants::VLIGHT_AU,
    frames::{Barycentric, FramedVector, Topocentric},
    jpl_ephem::{Body, Ephemeris},
    skypos_errors::SkyPosError,
    time::Instant,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightTimeOptions {
    pub max_iterations: usize,
    pub tolerance_days: f64,
}

impl Default for LightTimeOptions {
    fn default() -> Self {
        LightTimeOptions {
            max_iterations: 10,
            tolerance_days: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightTimeSolution {
    /// Emission instant at which `line_of_sight` was evaluated.
    pub emission: Instant,
    /// Observer → target at emission, AU.
    pub line_of_sight: FramedVector<Topocentric>,
    pub light_time_days: f64,
    pub iterations: usize,
    /// Change of the light time at the last iteration, days.
    pub last_correction_days: f64,
}

/// Solve the light-time equation for `body` seen from `observer` at `instant`.
///
/// Fails with [`SkyPosError::DegenerateGeometry`] when the target coincides with the
/// observer and with [`SkyPosError::LightTimeDiverged`] when the tolerance is not met within
/// the iteration bound.
pub fn solve_light_time(
    ephemeris: &dyn Ephemeris,
    body: &Body,
    observer: &FramedVector<Barycentric>,
    instant: &Instant,
    options: &LightTimeOptions,
) -> Result<LightTimeSolution, SkyPosError> {
    let mut light_time = 0.0;
    let mut last_correction = f64::INFINITY;

    for iteration in 1..=options.max_iterations {
        let emission = instant.shifted_days(-light_time);
        let target = ephemeris.position(body, &emission)?;
        let line_of_sight = target.seen_from(observer);

        let distance = line_of_sight.norm();
        if !(distance > 0.0) {
            return Err(SkyPosError::DegenerateGeometry(format!(
                "{body} coincides with the observer at {emission}"
            )));
        }

        let updated = distance / VLIGHT_AU;
        last_correction = (updated - light_time).abs();
        light_time = updated;
        debug!(
            "light time of {body}: iteration {iteration}, τ = {light_time:.12} d, Δτ = {last_correction:.3e} d"
        );

        if last_correction < options.tolerance_days {
            return Ok(LightTimeSolution {
                emission,
                line_of_sight,
                light_time_days: light_time,
                iterations: iteration,
                last_correction_days: last_correction,
            });
        }
    }

    Err(SkyPosError::LightTimeDiverged {
        iterations: options.max_iterations,
        last_correction_days: last_correction,
    })
}

#[cfg(test)]
mod light_time_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{constants::T2000, jpl_ephem::BodyState};

    /// Target moving along +y at `speed` AU/day from (distance, 0, 0); observer at the origin.
    struct Linear {
        distance: f64,
        speed: f64,
    }

    impl Ephemeris for Linear {
        fn body(&self, key: &str) -> Result<Body, SkyPosError> {
            Ok(Body::new(key, 1))
        }

        fn state(&self, _body: &Body, instant: &Instant) -> Result<BodyState, SkyPosError> {
            let days = instant.mjd_tt() - T2000;
            Ok(BodyState {
                position: FramedVector::new(self.distance, self.speed * days, 0.0),
                velocity: FramedVector::new(0.0, self.speed, 0.0),
            })
        }
    }

    #[test]
    fn test_converges_on_moving_target() {
        let ephemeris = Linear {
            distance: 1.5,
            speed: 0.02,
        };
        let body = ephemeris.body("mover").unwrap();
        let instant = Instant::from_tt_mjd(T2000, 69.184);
        let solution = solve_light_time(
            &ephemeris,
            &body,
            &FramedVector::zeros(),
            &instant,
            &LightTimeOptions::default(),
        )
        .unwrap();

        assert!(solution.iterations <= 5);
        assert!(solution.last_correction_days < 1e-9);
        // τ = sqrt(d² + (vτ)²) / c
        let tau = solution.light_time_days;
        let expected = (1.5f64.powi(2) + (0.02 * tau).powi(2)).sqrt() / VLIGHT_AU;
        assert_relative_eq!(tau, expected, epsilon = 1e-12);
        assert_relative_eq!(solution.line_of_sight.y(), -0.02 * tau, epsilon = 1e-10);
    }

    #[test]
    fn test_iteration_bound() {
        let ephemeris = Linear {
            distance: 30.0,
            speed: 0.003,
        };
        let body = ephemeris.body("mover").unwrap();
        let options = LightTimeOptions {
            max_iterations: 1,
            tolerance_days: 1e-9,
        };
        let result = solve_light_time(
            &ephemeris,
            &body,
            &FramedVector::zeros(),
            &Instant::from_tt_mjd(T2000, 69.184),
            &options,
        );
        match result {
            Err(SkyPosError::LightTimeDiverged {
                iterations,
                last_correction_days,
            }) => {
                assert_eq!(iterations, 1);
                assert!(last_correction_days > 0.1);
            }
            other => panic!("expected a divergence error, got {other:?}"),
        }
    }

    #[test]
    fn test_target_at_observer() {
        let ephemeris = Linear {
            distance: 0.0,
            speed: 0.0,
        };
        let body = ephemeris.body("here").unwrap();
        let result = solve_light_time(
            &ephemeris,
            &body,
            &FramedVector::zeros(),
            &Instant::from_tt_mjd(T2000, 69.184),
            &LightTimeOptions::default(),
        );
        assert!(matches!(result, Err(SkyPosError::DegenerateGeometry(_))));
    }
}
