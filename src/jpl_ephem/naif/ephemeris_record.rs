//! Chebyshev records of type 2 and type 3 SPK segments.
//!
//! A record holds `mid` and `radius` (TDB seconds past J2000) followed by `n`
//! coefficients per component: `x y z` for type 2, `x y z vx vy vz` for type 3. Positions
//! come out in km and velocities in km/s.
//!
//! With `s = (et - mid) / radius`, the position is `Σ cₖ Tₖ(s)` and the velocity is
//! `Σ cₖ T'ₖ(s) / radius` unless the record carries its own velocity coefficients.
use std::fmt;

use hifitime::{Duration, Epoch};
use nalgebra::Vector3;

use crate::{
    constants::EphemerisSeconds, jpl_ephem::naif::spk_type::SpkDataType,
    skypos_errors::SkyPosError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisRecord {
    pub mid: EphemerisSeconds,
    pub radius: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Velocity coefficients (km/s), present in type 3 records only.
    pub velocity: Option<[Vec<f64>; 3]>,
}

/// Evaluate `Tₖ(s)` and `T'ₖ(s)` for `k < n`.
fn chebyshev_basis(s: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut values = vec![0.0; n];
    let mut derivatives = vec![0.0; n];
    if n == 0 {
        return (values, derivatives);
    }
    values[0] = 1.0;
    if n > 1 {
        values[1] = s;
        derivatives[1] = 1.0;
    }
    for k in 2..n {
        values[k] = 2.0 * s * values[k - 1] - values[k - 2];
        derivatives[k] = 2.0 * values[k - 1] + 2.0 * s * derivatives[k - 1] - derivatives[k - 2];
    }
    (values, derivatives)
}

fn dot(coefficients: &[f64], basis: &[f64]) -> f64 {
    coefficients.iter().zip(basis).map(|(c, b)| c * b).sum()
}

impl EphemerisRecord {
    /// Decode one record from its raw little-endian words.
    pub fn parse(
        input: &[u8],
        spk_type: SpkDataType,
        ncoeff: usize,
    ) -> Result<EphemerisRecord, SkyPosError> {
        let components = spk_type.component_count();
        let expected = (2 + components * ncoeff) * 8;
        if ncoeff == 0 || input.len() < expected {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "record truncated: {} bytes available, {expected} needed",
                input.len()
            )));
        }

        let words: Vec<f64> = input[..expected]
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                f64::from_le_bytes(word)
            })
            .collect();

        let (mid, radius) = (words[0], words[1]);
        if !(radius > 0.0) {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "record centred on {mid} has radius {radius}"
            )));
        }

        let mut series = words[2..].chunks_exact(ncoeff).map(<[f64]>::to_vec);
        let mut next = || series.next().unwrap_or_default();
        let (x, y, z) = (next(), next(), next());
        let velocity = match spk_type {
            SpkDataType::ChebyshevPositionOnly => None,
            SpkDataType::ChebyshevPositionVelocity => Some([next(), next(), next()]),
        };

        Ok(EphemerisRecord {
            mid,
            radius,
            x,
            y,
            z,
            velocity,
        })
    }

    /// Position (km) and velocity (km/s) at `et`. The normalized time is clamped to
    /// `[-1, 1]`, callers pick the record covering `et`.
    pub fn interpolate(&self, et: EphemerisSeconds) -> (Vector3<f64>, Vector3<f64>) {
        let s = ((et - self.mid) / self.radius).clamp(-1.0, 1.0);
        let (values, derivatives) = chebyshev_basis(s, self.x.len());

        let position = Vector3::new(
            dot(&self.x, &values),
            dot(&self.y, &values),
            dot(&self.z, &values),
        );

        let velocity = match &self.velocity {
            Some([vx, vy, vz]) => Vector3::new(dot(vx, &values), dot(vy, &values), dot(vz, &values)),
            None => {
                Vector3::new(
                    dot(&self.x, &derivatives),
                    dot(&self.y, &derivatives),
                    dot(&self.z, &derivatives),
                ) / self.radius
            }
        };

        (position, velocity)
    }
}

impl fmt::Display for EphemerisRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ephemeris record at {} ± {}, {} coefficients{}",
            Epoch::from_et_seconds(self.mid),
            Duration::from_seconds(self.radius),
            self.x.len(),
            if self.velocity.is_some() {
                " with velocity"
            } else {
                ""
            }
        )?;
        for (axis, coefficients) in [("x", &self.x), ("y", &self.y), ("z", &self.z)] {
            let shown = coefficients
                .iter()
                .take(4)
                .map(|c| format!("{c:+.6e}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "  {axis}: {shown}")?;
        }
        Ok(())
    }
}
