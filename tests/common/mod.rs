#![allow(dead_code)]

use std::f64::consts::PI;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;
use skypos::{
    constants::{AU, RADEG, SECONDS_PER_DAY},
    earth_orientation::Iau1980,
    jpl_ephem::naif::spk_ephemeris::SpkEphemeris,
    reduction::ReductionOptions,
    skypos::SkyPos,
    star_catalog::StarCatalog,
    time::TimeSystem,
};

const DAF_RECORD: usize = 1024;
/// First data address after the file, summary and name records.
const DATA_START_ADDR: usize = 3 * DAF_RECORD / 8 + 1;

pub const OBLIQUITY_J2000_DEG: f64 = 23.439_291_1;
pub const EARTH_YEAR_DAYS: f64 = 365.256_363;
pub const MARS_ORBIT_AU: f64 = 1.523_679;
pub const MARS_YEAR_DAYS: f64 = 686.98;
pub const JUPITER_ORBIT_AU: f64 = 5.2026;
pub const JUPITER_YEAR_DAYS: f64 = 4332.59;
pub const MOON_ORBIT_KM: f64 = 384_400.0;
pub const MOON_MONTH_DAYS: f64 = 27.321_662;

/// Half-width of the synthetic kernel coverage around the solstice, days.
pub const COVERAGE_HALF_DAYS: f64 = 20.0;

pub fn data_path(name: &str) -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

pub fn time_system() -> TimeSystem {
    TimeSystem::from_path(&data_path("leap_seconds_delta_t.csv")).unwrap()
}

pub fn star_catalog() -> StarCatalog {
    StarCatalog::from_path(&data_path("bright_stars.csv")).unwrap()
}

/// June solstice 2024, 20:51 UTC.
pub fn solstice() -> Epoch {
    Epoch::from_gregorian_utc(2024, 6, 20, 20, 51, 0, 0)
}

/// One segment of a synthetic type 2 kernel, positions in km relative to `center`.
pub struct SyntheticSegment {
    pub target: i32,
    pub center: i32,
    pub start_et: f64,
    pub end_et: f64,
    pub interval_days: f64,
    pub coefficients: usize,
    pub position_km: Box<dyn Fn(f64) -> [f64; 3]>,
}

/// Chebyshev coefficients of `f` over `[mid - radius, mid + radius]`, sampled at the
/// Chebyshev nodes.
pub fn chebyshev_fit(
    f: &dyn Fn(f64) -> [f64; 3],
    mid: f64,
    radius: f64,
    n: usize,
) -> [Vec<f64>; 3] {
    let angles: Vec<f64> = (0..n)
        .map(|k| PI * (k as f64 + 0.5) / n as f64)
        .collect();
    let samples: Vec<[f64; 3]> = angles
        .iter()
        .map(|theta| f(mid + radius * theta.cos()))
        .collect();

    let mut coefficients = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];
    for j in 0..n {
        let scale = (if j == 0 { 1.0 } else { 2.0 }) / n as f64;
        for (theta, sample) in angles.iter().zip(&samples) {
            let t = (j as f64 * theta).cos();
            for axis in 0..3 {
                coefficients[axis][j] += scale * sample[axis] * t;
            }
        }
    }
    coefficients
}

/// Serialize segments as a little-endian DAF/SPK kernel.
pub fn write_spk(segments: &[SyntheticSegment]) -> Vec<u8> {
    assert!(segments.len() <= 25, "one summary record holds 25 summaries");

    let mut words: Vec<f64> = Vec::new();
    let mut addresses = Vec::with_capacity(segments.len());
    for segment in segments {
        let initial_addr = DATA_START_ADDR + words.len();
        let intlen = segment.interval_days * SECONDS_PER_DAY;
        let n_records = ((segment.end_et - segment.start_et) / intlen).ceil().max(1.0) as usize;
        let radius = intlen / 2.0;

        for i in 0..n_records {
            let mid = segment.start_et + i as f64 * intlen + radius;
            words.push(mid);
            words.push(radius);
            for axis in chebyshev_fit(&*segment.position_km, mid, radius, segment.coefficients) {
                words.extend(axis);
            }
        }
        let rsize = 2 + 3 * segment.coefficients;
        words.extend([segment.start_et, intlen, rsize as f64, n_records as f64]);
        addresses.push((initial_addr, DATA_START_ADDR + words.len() - 1));
    }

    let mut kernel = Vec::with_capacity(3 * DAF_RECORD + 8 * words.len());

    // file record
    kernel.extend_from_slice(b"DAF/SPK ");
    kernel.extend_from_slice(&2i32.to_le_bytes());
    kernel.extend_from_slice(&6i32.to_le_bytes());
    let mut name = [b' '; 60];
    name[..13].copy_from_slice(b"SYNTHETIC SPK");
    kernel.extend_from_slice(&name);
    kernel.extend_from_slice(&2i32.to_le_bytes());
    kernel.extend_from_slice(&2i32.to_le_bytes());
    kernel.extend_from_slice(&((DATA_START_ADDR + words.len()) as i32).to_le_bytes());
    kernel.extend_from_slice(b"LTL-IEEE");
    kernel.resize(DAF_RECORD, 0);

    // summary record
    kernel.extend_from_slice(&0f64.to_le_bytes());
    kernel.extend_from_slice(&0f64.to_le_bytes());
    kernel.extend_from_slice(&(segments.len() as f64).to_le_bytes());
    for (segment, (initial_addr, final_addr)) in segments.iter().zip(&addresses) {
        kernel.extend_from_slice(&segment.start_et.to_le_bytes());
        kernel.extend_from_slice(&segment.end_et.to_le_bytes());
        for word in [
            segment.target,
            segment.center,
            1,
            2,
            *initial_addr as i32,
            *final_addr as i32,
        ] {
            kernel.extend_from_slice(&word.to_le_bytes());
        }
    }
    kernel.resize(2 * DAF_RECORD, 0);

    // name record
    kernel.resize(3 * DAF_RECORD, b' ');

    for word in words {
        kernel.extend_from_slice(&word.to_le_bytes());
    }
    kernel.resize(kernel.len().div_ceil(DAF_RECORD) * DAF_RECORD, 0);
    kernel
}

/// Circular orbit in the J2000 ecliptic, rotated to equatorial axes (km).
fn circular_orbit(
    radius_au: f64,
    period_days: f64,
    longitude_at_solstice_deg: f64,
    solstice_et: f64,
) -> impl Fn(f64) -> [f64; 3] {
    move |et| {
        let days = (et - solstice_et) / SECONDS_PER_DAY;
        let longitude = longitude_at_solstice_deg * RADEG + 2.0 * PI * days / period_days;
        let (x, y) = (radius_au * AU * longitude.cos(), radius_au * AU * longitude.sin());
        let (s, c) = (OBLIQUITY_J2000_DEG * RADEG).sin_cos();
        [x, y * c, y * s]
    }
}

/// Sun at the barycenter, Earth on a circular orbit placing the Sun at ecliptic longitude
/// 90° at the 2024 June solstice, the Moon circling the Earth in the ecliptic, Mars and
/// Jupiter on circular orbits. Coverage: 20 days each side of the solstice.
pub fn synthetic_segments() -> Vec<SyntheticSegment> {
    let solstice_et = solstice().to_et_seconds();
    let start_et = solstice_et - COVERAGE_HALF_DAYS * SECONDS_PER_DAY;
    let end_et = solstice_et + COVERAGE_HALF_DAYS * SECONDS_PER_DAY;

    let fixed = |target: i32, center: i32| SyntheticSegment {
        target,
        center,
        start_et,
        end_et,
        interval_days: 20.0,
        coefficients: 3,
        position_km: Box::new(|_| [0.0; 3]),
    };
    let orbit = |target: i32, position_km: Box<dyn Fn(f64) -> [f64; 3]>| SyntheticSegment {
        target,
        center: 0,
        start_et,
        end_et,
        interval_days: 8.0,
        coefficients: 12,
        position_km,
    };

    vec![
        fixed(10, 0),
        orbit(
            3,
            Box::new(circular_orbit(1.0, EARTH_YEAR_DAYS, 270.0, solstice_et)),
        ),
        fixed(399, 3),
        SyntheticSegment {
            target: 301,
            center: 3,
            start_et,
            end_et,
            interval_days: 4.0,
            coefficients: 14,
            position_km: Box::new(circular_orbit(
                MOON_ORBIT_KM / AU,
                MOON_MONTH_DAYS,
                200.0,
                solstice_et,
            )),
        },
        orbit(
            4,
            Box::new(circular_orbit(MARS_ORBIT_AU, MARS_YEAR_DAYS, 120.0, solstice_et)),
        ),
        fixed(499, 4),
        orbit(
            5,
            Box::new(circular_orbit(
                JUPITER_ORBIT_AU,
                JUPITER_YEAR_DAYS,
                40.0,
                solstice_et,
            )),
        ),
    ]
}

pub fn synthetic_kernel() -> Vec<u8> {
    write_spk(&synthetic_segments())
}

pub fn synthetic_ephemeris() -> SpkEphemeris {
    SpkEphemeris::from_bytes(&synthetic_kernel()).unwrap()
}

/// Write the synthetic kernel into `dir` and return its path.
pub fn write_synthetic_kernel(dir: &std::path::Path) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.join("synthetic.bsp")).unwrap();
    std::fs::write(&path, synthetic_kernel()).unwrap();
    path
}

pub fn synthetic_skypos() -> SkyPos {
    SkyPos::from_parts(
        time_system(),
        synthetic_ephemeris(),
        star_catalog(),
        Iau1980,
        ReductionOptions::default(),
    )
}
