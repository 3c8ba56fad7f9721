use approx::assert_relative_eq;
use camino::Utf8PathBuf;
use skypos::{
    jpl_ephem::{naif::spk_ephemeris::SpkEphemeris, Ephemeris, EphemerisSource},
    reduction::ReductionOptions,
    skypos::{Query, SkyPos, SkyPosConfig},
    skypos_errors::SkyPosError,
    time::Instant,
};

mod common;
use common::{data_path, solstice, synthetic_kernel, time_system, write_synthetic_kernel};

#[test]
fn test_load_kernel_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_synthetic_kernel(dir.path());

    let source: EphemerisSource = format!("naif:{path}").parse().unwrap();
    let ephemeris = source.load().unwrap();

    assert_eq!(ephemeris.segments().len(), 7);
    let header = ephemeris.daf_header().unwrap();
    assert_eq!(header.idword, "DAF/SPK");
    assert_eq!(header.locfmt, "LTL-IEEE");
    assert_eq!(header.internal_filename, "SYNTHETIC SPK");

    let listing = ephemeris.to_string();
    assert!(listing.contains("Common coverage"));
    assert!(listing.contains("mars (499)"));
}

#[test]
fn test_chained_state_matches_orbit() {
    let ephemeris = SpkEphemeris::from_bytes(&synthetic_kernel()).unwrap();
    let instant = time_system().to_dynamical_time(&solstice()).instant;

    // earth → earth barycenter → barycenter, with a zero offset on the first link
    let earth = ephemeris.body("earth").unwrap();
    let barycenter = ephemeris.body("earth_barycenter").unwrap();
    assert_eq!(
        ephemeris.position(&earth, &instant).unwrap(),
        ephemeris.position(&barycenter, &instant).unwrap()
    );

    let state = ephemeris.state(&earth, &instant).unwrap();
    assert_relative_eq!(state.position.norm(), 1.0, epsilon = 1e-9);
    // circular orbit: speed 2π AU per sidereal year, perpendicular to the radius
    assert_relative_eq!(
        state.velocity.norm(),
        2.0 * std::f64::consts::PI / common::EARTH_YEAR_DAYS,
        epsilon = 1e-8
    );
    assert!(state.position.dot(&state.velocity).abs() < 1e-9);
    // the Sun is seen at ecliptic longitude 90°: Earth sits at −y
    assert!(state.position.y() < -0.9);

    let mars = ephemeris.body("Mars").unwrap();
    assert_eq!(mars.naif_id(), 499);
    assert_relative_eq!(
        ephemeris.position(&mars, &instant).unwrap().norm(),
        common::MARS_ORBIT_AU,
        epsilon = 1e-9
    );
}

#[test]
fn test_before_the_kernel_span() {
    let ephemeris = SpkEphemeris::from_bytes(&synthetic_kernel()).unwrap();
    let (start, end) = ephemeris.coverage().unwrap();
    let sun = ephemeris.body("sun").unwrap();

    let before = Instant::from_tt_mjd(start.to_mjd_tt_days() - 1.0, 69.2);
    match ephemeris.state(&sun, &before) {
        Err(SkyPosError::EphemerisRange {
            target: 10,
            center: 0,
            start: valid_start,
            end: valid_end,
            ..
        }) => {
            assert_eq!(valid_start, start);
            assert_eq!(valid_end, end);
        }
        other => panic!("expected an ephemeris range error, got {other:?}"),
    }
}

#[test]
fn test_big_endian_kernel_is_rejected() {
    let mut kernel = synthetic_kernel();
    kernel[88..96].copy_from_slice(b"BIG-IEEE");
    assert!(matches!(
        SpkEphemeris::from_bytes(&kernel),
        Err(SkyPosError::UnsupportedEphemerisFile(_))
    ));
}

#[test]
fn test_truncated_kernel_is_rejected() {
    let kernel = synthetic_kernel();
    let truncated = &kernel[..kernel.len() / 2];
    assert!(matches!(
        SpkEphemeris::from_bytes(truncated),
        Err(SkyPosError::CorruptedEphemerisFile(_))
    ));
}

#[test]
fn test_corrupt_record_count_is_rejected() {
    let mut kernel = synthetic_kernel();
    // final address of the first summary: summary record, 3 control words, 2 doubles, 5 ints
    let field = 1024 + 24 + 16 + 20;
    let final_addr = i32::from_le_bytes(kernel[field..field + 4].try_into().unwrap()) as usize;
    // the record count is the last word of the segment
    let n_records = (final_addr - 1) * 8;
    kernel[n_records..n_records + 8].copy_from_slice(&1.0e30f64.to_le_bytes());

    assert!(matches!(
        SpkEphemeris::from_bytes(&kernel),
        Err(SkyPosError::CorruptedEphemerisFile(_))
    ));
}

#[test]
fn test_summary_pointing_past_the_file_is_rejected() {
    let mut kernel = synthetic_kernel();
    // forward pointer of the only summary record
    kernel[1024..1032].copy_from_slice(&1.0e300f64.to_le_bytes());
    assert!(matches!(
        SpkEphemeris::from_bytes(&kernel),
        Err(SkyPosError::CorruptedEphemerisFile(_))
    ));
}

#[test]
fn test_skypos_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = write_synthetic_kernel(dir.path());
    let kernel_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    let config = SkyPosConfig {
        ephemeris: EphemerisSource::Naif(kernel),
        star_catalog: data_path("bright_stars.csv"),
        time_table: data_path("leap_seconds_delta_t.csv"),
        reduction: ReductionOptions::default(),
    };
    let skypos = SkyPos::new(&config).unwrap();
    assert_eq!(skypos.catalog().len(), 14);

    let observation = skypos
        .observe(&Query::star(52.0, 13.4, "Vega").at(solstice()))
        .unwrap();
    assert!(observation.apparent.distance_au.is_none());

    let missing = SkyPosConfig {
        ephemeris: EphemerisSource::Naif(kernel_dir.join("nothing.bsp")),
        ..config
    };
    assert!(matches!(SkyPos::new(&missing), Err(SkyPosError::IoError(_))));
}
