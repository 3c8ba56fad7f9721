//! # Star catalog
//!
//! Fixed stars loaded once from a CSV table with the columns
//!
//! ```text
//! id,name,ra_deg,dec_deg,pm_ra_mas_yr,pm_dec_mas_yr,parallax_mas,epoch_jyear
//! ```
//!
//! Positions are ICRS at the catalog epoch (Julian year, default J2000.0). `pm_ra_mas_yr` is
//! μα·cosδ. Proper motion and parallax columns may be left empty; a star without parallax
//! is treated as infinitely distant.
//!
//! [`StarCatalog::lookup`] matches an identifier or a common name, ignoring case.
use std::{collections::HashMap, fmt, io::Read};

use camino::Utf8Path;
use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer};

use crate::{
    constants::{Degree, DAYS_PER_JULIAN_YEAR, MJD, RADEG, RADMAS, T2000},
    frames::{Barycentric, FramedVector},
    skypos_errors::SkyPosError,
};

fn default_epoch() -> f64 {
    2000.0
}

// an empty cell means J2000.0 as well
fn epoch_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_epoch))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Star {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub ra_deg: Degree,
    pub dec_deg: Degree,
    #[serde(default)]
    pub pm_ra_mas_yr: Option<f64>,
    #[serde(default)]
    pub pm_dec_mas_yr: Option<f64>,
    #[serde(default)]
    pub parallax_mas: Option<f64>,
    #[serde(default = "default_epoch", deserialize_with = "epoch_or_default")]
    pub epoch_jyear: f64,
}

/// Barycentric place of a star at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StarPlace {
    /// Position in AU, for stars with a measured parallax.
    Finite(FramedVector<Barycentric>),
    /// Unit direction of a star treated as infinitely distant.
    Direction(FramedVector<Barycentric>),
}

impl Star {
    pub fn new(id: impl Into<String>, ra_deg: Degree, dec_deg: Degree) -> Self {
        Star {
            id: id.into(),
            name: None,
            ra_deg,
            dec_deg,
            pm_ra_mas_yr: None,
            pm_dec_mas_yr: None,
            parallax_mas: None,
            epoch_jyear: default_epoch(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_proper_motion(mut self, pm_ra_mas_yr: f64, pm_dec_mas_yr: f64) -> Self {
        self.pm_ra_mas_yr = Some(pm_ra_mas_yr);
        self.pm_dec_mas_yr = Some(pm_dec_mas_yr);
        self
    }

    pub fn with_parallax(mut self, parallax_mas: f64) -> Self {
        self.parallax_mas = Some(parallax_mas);
        self
    }

    pub fn with_epoch(mut self, epoch_jyear: f64) -> Self {
        self.epoch_jyear = epoch_jyear;
        self
    }

    fn validate(&self) -> Result<(), SkyPosError> {
        let invalid = |what: &str| {
            Err(SkyPosError::InvalidStarCatalog(format!(
                "star {}: {what}",
                self.id
            )))
        };
        if self.id.trim().is_empty() {
            return invalid("empty identifier");
        }
        if !(0.0..360.0).contains(&self.ra_deg) {
            return invalid("right ascension outside [0, 360)");
        }
        if !(-90.0..=90.0).contains(&self.dec_deg) {
            return invalid("declination outside [-90, 90]");
        }
        let optional = [self.pm_ra_mas_yr, self.pm_dec_mas_yr, self.parallax_mas];
        if optional.iter().flatten().any(|v| !v.is_finite()) || !self.epoch_jyear.is_finite() {
            return invalid("non finite astrometric value");
        }
        if self.parallax_mas.is_some_and(|p| p < 0.0) {
            return invalid("negative parallax");
        }
        Ok(())
    }

    /// Catalog epoch as a TT Modified Julian Date.
    pub fn epoch_mjd(&self) -> MJD {
        T2000 + (self.epoch_jyear - 2000.0) * DAYS_PER_JULIAN_YEAR
    }

    /// Distance in AU derived from the parallax, if any.
    pub fn distance_au(&self) -> Option<f64> {
        self.parallax_mas
            .filter(|p| *p > 0.0)
            .map(|p| 1.0 / (p * RADMAS).sin())
    }

    /// Barycentric place at `mjd_tt`, proper motion applied linearly from the catalog epoch.
    ///
    /// The catalog direction `u` moves along the tangent-plane unit vectors
    /// `p̂ = (−sinα, cosα, 0)` and `d̂ = (−sinδ·cosα, −sinδ·sinα, cosδ)`. With a parallax the
    /// motion is a linear space velocity in AU/day, otherwise an angular rate applied to the
    /// unit direction.
    pub fn place_at(&self, mjd_tt: MJD) -> StarPlace {
        let (sin_ra, cos_ra) = (self.ra_deg * RADEG).sin_cos();
        let (sin_dec, cos_dec) = (self.dec_deg * RADEG).sin_cos();

        let direction = Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec);
        let p_hat = Vector3::new(-sin_ra, cos_ra, 0.0);
        let d_hat = Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec);

        // radians per day
        let rate = |mas_per_year: Option<f64>| {
            mas_per_year.unwrap_or(0.0) * RADMAS / DAYS_PER_JULIAN_YEAR
        };
        let angular_velocity = p_hat * rate(self.pm_ra_mas_yr) + d_hat * rate(self.pm_dec_mas_yr);
        let elapsed = mjd_tt - self.epoch_mjd();

        match self.distance_au() {
            Some(distance) => StarPlace::Finite(FramedVector::from_vector(
                (direction + angular_velocity * elapsed) * distance,
            )),
            None => {
                let moved = direction + angular_velocity * elapsed;
                StarPlace::Direction(FramedVector::from_vector(moved.normalize()))
            }
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for Star {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (RA={:.6}°, Dec={:.6}°, epoch J{})",
            self.display_name(),
            self.ra_deg,
            self.dec_deg,
            self.epoch_jyear
        )
    }
}

/// Read-only star table indexed by lowercase identifier and name.
#[derive(Debug, Clone, Default)]
pub struct StarCatalog {
    stars: Vec<Star>,
    index: HashMap<String, usize>,
}

impl StarCatalog {
    pub fn from_stars(stars: Vec<Star>) -> Result<Self, SkyPosError> {
        let mut index = HashMap::with_capacity(stars.len() * 2);
        for (position, star) in stars.iter().enumerate() {
            star.validate()?;
            if index
                .insert(star.id.trim().to_lowercase(), position)
                .is_some()
            {
                return Err(SkyPosError::InvalidStarCatalog(format!(
                    "duplicate identifier {}",
                    star.id
                )));
            }
        }
        // names never shadow identifiers
        for (position, star) in stars.iter().enumerate() {
            if let Some(name) = &star.name {
                index.entry(name.trim().to_lowercase()).or_insert(position);
            }
        }
        Ok(StarCatalog { stars, index })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SkyPosError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);
        let stars = csv_reader
            .deserialize::<Star>()
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_stars(stars)
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, SkyPosError> {
        let catalog = Self::from_reader(std::fs::File::open(path)?)?;
        info!("Loaded star catalog {path}: {} stars", catalog.len());
        Ok(catalog)
    }

    /// Find a star by identifier or common name.
    pub fn lookup(&self, identifier: &str) -> Result<&Star, SkyPosError> {
        self.index
            .get(&identifier.trim().to_lowercase())
            .map(|&position| &self.stars[position])
            .ok_or_else(|| SkyPosError::StarNotFound(identifier.to_string()))
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Star> {
        self.stars.iter()
    }
}
