//! # SkyPos: stores, configuration and queries
//!
//! [`SkyPos`] owns everything a query needs and nothing that depends on the query:
//!
//! 1. the **time system** ([`TimeSystem`]) built from the leap-second/ΔT table,
//! 2. the **ephemeris store** (any [`Ephemeris`], an SPK kernel in production),
//! 3. the **star catalog** ([`StarCatalog`]),
//! 4. the **Earth orientation model** ([`EarthOrientationModel`], [`Iau1980`] by default),
//! 5. the [`ReductionOptions`].
//!
//! All of them are loaded eagerly by [`SkyPos::new`]: a missing or corrupt data file is an
//! error of the constructor, never of a query. The stores are read-only afterwards, so one
//! `SkyPos` can serve queries from several threads at once.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use camino::Utf8Path;
//! use skypos::skypos::{Query, SkyPos, SkyPosConfig};
//! use skypos::time::parse_civil;
//!
//! let config = SkyPosConfig::from_data_dir(Utf8Path::new("data"), Utf8Path::new("de440s.bsp"));
//! let skypos = SkyPos::new(&config).unwrap();
//!
//! let query = Query::body(23.6, 58.5, "mars").at(parse_civil("2024-06-20T08:06:00").unwrap());
//! let observation = skypos.observe(&query).unwrap();
//! println!("{}", observation.apparent.rounded(2, 6));
//! ```
//!
//! ## Errors
//!
//! Query errors are [`SkyPosError::UnknownBody`], [`SkyPosError::StarNotFound`],
//! [`SkyPosError::InvalidObserver`], [`SkyPosError::EphemerisRange`] and
//! [`SkyPosError::DegenerateGeometry`]. Timestamps outside the offset table are served with
//! the nearest offsets and flagged in [`Observation::time_approximation`].
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;
use log::{debug, info};
use serde::Deserialize;

use crate::{
    constants::{Degree, Meter},
    earth_orientation::{EarthOrientationModel, Iau1980},
    jpl_ephem::{Ephemeris, EphemerisSource},
    observers::Observer,
    reduction::{apparent_position, Observation, ObservingContext, ReductionOptions, ResolvedTarget},
    skypos_errors::SkyPosError,
    star_catalog::StarCatalog,
    time::{Instant, TimeSystem},
};

/// Bodies returned by [`SkyPos::planets`], in order from the Sun.
pub const PLANET_KEYS: [&str; 7] = [
    "mercury",
    "venus",
    "mars",
    "jupiter_barycenter",
    "saturn_barycenter",
    "uranus_barycenter",
    "neptune_barycenter",
];

/// Conventional file names inside a data directory.
pub const TIME_TABLE_FILE: &str = "leap_seconds_delta_t.csv";
pub const STAR_CATALOG_FILE: &str = "bright_stars.csv";

/// Where the data files are and how queries are reduced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkyPosConfig {
    /// `"naif:<path>"` or a bare path to an SPK kernel.
    pub ephemeris: EphemerisSource,
    pub star_catalog: Utf8PathBuf,
    pub time_table: Utf8PathBuf,
    #[serde(default)]
    pub reduction: ReductionOptions,
}

impl SkyPosConfig {
    /// Configuration for the conventional layout of a data directory.
    ///
    /// Arguments
    /// -----------------
    /// * `dir`: directory holding `leap_seconds_delta_t.csv` and `bright_stars.csv`.
    /// * `kernel`: SPK kernel, relative to `dir` unless absolute.
    pub fn from_data_dir(dir: &Utf8Path, kernel: &Utf8Path) -> Self {
        SkyPosConfig {
            ephemeris: EphemerisSource::Naif(dir.join(kernel)),
            star_catalog: dir.join(STAR_CATALOG_FILE),
            time_table: dir.join(TIME_TABLE_FILE),
            reduction: ReductionOptions::default(),
        }
    }
}

/// What to look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Ephemeris body key, e.g. `"mars"` or `"jupiter_barycenter"`.
    Body(String),
    /// Star catalog identifier or common name.
    Star(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Body(key) => write!(f, "body {key}"),
            Target::Star(id) => write!(f, "star {id}"),
        }
    }
}

/// One observation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub latitude: Degree,
    pub longitude: Degree,
    pub elevation: Meter,
    pub target: Target,
    /// Civil (UTC) time; `None` means now.
    pub time: Option<Epoch>,
}

impl Query {
    pub fn new(latitude: Degree, longitude: Degree, target: Target) -> Self {
        Query {
            latitude,
            longitude,
            elevation: 0.0,
            target,
            time: None,
        }
    }

    pub fn body(latitude: Degree, longitude: Degree, key: impl Into<String>) -> Self {
        Self::new(latitude, longitude, Target::Body(key.into()))
    }

    pub fn star(latitude: Degree, longitude: Degree, id: impl Into<String>) -> Self {
        Self::new(latitude, longitude, Target::Star(id.into()))
    }

    pub fn with_elevation(mut self, elevation: Meter) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn at(mut self, time: Epoch) -> Self {
        self.time = Some(time);
        self
    }
}

/// Loaded stores plus the reduction settings.
pub struct SkyPos {
    time_system: TimeSystem,
    ephemeris: Box<dyn Ephemeris>,
    catalog: StarCatalog,
    orientation: Box<dyn EarthOrientationModel>,
    options: ReductionOptions,
}

impl SkyPos {
    /// Load every store named by `config`.
    ///
    /// Return
    /// ----------
    /// * The ready [`SkyPos`], or the first loading error (I/O, CSV, corrupt kernel).
    pub fn new(config: &SkyPosConfig) -> Result<Self, SkyPosError> {
        let time_system = TimeSystem::from_path(&config.time_table)?;
        let ephemeris = config.ephemeris.load()?;
        let catalog = StarCatalog::from_path(&config.star_catalog)?;

        info!(
            "SkyPos ready: ephemeris {}, {} stars, light time ≤ {} iterations, deflection {}",
            config.ephemeris,
            catalog.len(),
            config.reduction.light_time.max_iterations,
            if config.reduction.gravitational_deflection {
                "on"
            } else {
                "off"
            }
        );

        Ok(Self::from_parts(
            time_system,
            ephemeris,
            catalog,
            Iau1980,
            config.reduction,
        ))
    }

    /// Assemble a [`SkyPos`] from stores built elsewhere (synthetic ephemerides in tests,
    /// another orientation model).
    pub fn from_parts(
        time_system: TimeSystem,
        ephemeris: impl Ephemeris + 'static,
        catalog: StarCatalog,
        orientation: impl EarthOrientationModel + 'static,
        options: ReductionOptions,
    ) -> Self {
        SkyPos {
            time_system,
            ephemeris: Box::new(ephemeris),
            catalog,
            orientation: Box::new(orientation),
            options,
        }
    }

    pub fn time_system(&self) -> &TimeSystem {
        &self.time_system
    }

    pub fn ephemeris(&self) -> &dyn Ephemeris {
        self.ephemeris.as_ref()
    }

    pub fn catalog(&self) -> &StarCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &ReductionOptions {
        &self.options
    }

    /// Reduce one query.
    ///
    /// The civil time is converted with the offset table; outside the table the nearest
    /// offsets are used and [`Observation::time_approximation`] is set.
    pub fn observe(&self, query: &Query) -> Result<Observation, SkyPosError> {
        let observer = Observer::new(query.latitude, query.longitude, query.elevation)?;
        let dynamical = match &query.time {
            Some(civil) => self.time_system.to_dynamical_time(civil),
            None => self.time_system.now()?,
        };

        let mut observation = self.observe_at(&observer, &query.target, &dynamical.instant)?;
        observation.time_approximation = dynamical.approximation;
        Ok(observation)
    }

    /// Reduce a target for an observer at a dynamical instant.
    ///
    /// The target is resolved first: an unknown key is reported as such whatever the
    /// instant.
    pub fn observe_at(
        &self,
        observer: &Observer,
        target: &Target,
        instant: &Instant,
    ) -> Result<Observation, SkyPosError> {
        let body;
        let resolved = match target {
            Target::Body(key) => {
                body = self.ephemeris.body(key)?;
                ResolvedTarget::Body(&body)
            }
            Target::Star(id) => ResolvedTarget::Star(self.catalog.lookup(id)?),
        };

        let context = ObservingContext::new(
            observer,
            self.ephemeris(),
            self.orientation.as_ref(),
            *instant,
        )?;
        let observation = apparent_position(self.ephemeris(), resolved, &context, &self.options)?;

        debug!("{target} from {observer} at {instant}: {}", observation.apparent);
        Ok(observation)
    }

    /// Apparent positions of the planets for one observer and instant.
    ///
    /// Each entry carries its own result, so a kernel lacking the outer planets still
    /// serves the inner ones.
    pub fn planets(
        &self,
        observer: &Observer,
        instant: &Instant,
    ) -> Vec<(&'static str, Result<Observation, SkyPosError>)> {
        PLANET_KEYS
            .iter()
            .map(|&key| {
                (
                    key,
                    self.observe_at(observer, &Target::Body(key.to_string()), instant),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod skypos_test {
    use super::*;

    #[test]
    fn test_config_from_data_dir() {
        let config = SkyPosConfig::from_data_dir(Utf8Path::new("data"), Utf8Path::new("de440s.bsp"));
        assert_eq!(
            config.ephemeris,
            EphemerisSource::Naif(Utf8PathBuf::from("data/de440s.bsp"))
        );
        assert_eq!(config.time_table, Utf8PathBuf::from("data/leap_seconds_delta_t.csv"));
        assert_eq!(config.star_catalog, Utf8PathBuf::from("data/bright_stars.csv"));
        assert!(config.reduction.gravitational_deflection);

        let absolute =
            SkyPosConfig::from_data_dir(Utf8Path::new("data"), Utf8Path::new("/srv/de440.bsp"));
        assert_eq!(absolute.ephemeris.path(), &Utf8PathBuf::from("/srv/de440.bsp"));
    }

    #[test]
    fn test_query_builders() {
        let query = Query::star(-30.0, 70.5, "Sirius").with_elevation(2200.0);
        assert_eq!(query.target, Target::Star("Sirius".into()));
        assert_eq!(query.elevation, 2200.0);
        assert_eq!(query.time, None);
        assert_eq!(Target::Body("mars".into()).to_string(), "body mars");
    }

    #[test]
    fn test_missing_time_table_fails_construction() {
        let config = SkyPosConfig::from_data_dir(
            Utf8Path::new("does/not/exist"),
            Utf8Path::new("kernel.bsp"),
        );
        assert!(matches!(
            SkyPos::new(&config),
            Err(SkyPosError::IoError(_))
        ));
    }
}
