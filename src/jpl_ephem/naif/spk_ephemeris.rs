//! In-memory SPK kernel: every segment of a DAF/SPK file decoded at load time.
//!
//! Segments are indexed by `(target, center)`. A body state relative to the Solar System
//! barycenter is obtained by walking the `target → center` chain down to body 0 and summing
//! the segment states, e.g. Mars (499) → Mars barycenter (4) → SSB (0), or the Moon (301)
//! → Earth-Moon barycenter (3) → SSB.
use std::{collections::HashMap, fmt};

use camino::Utf8Path;
use hifitime::Epoch;
use log::{debug, info};
use nalgebra::Vector3;
use nom::number::complete::le_f64;

use crate::{
    constants::{EphemerisSeconds, AU, SECONDS_PER_DAY},
    frames::{Barycentric, FramedVector},
    jpl_ephem::{Body, BodyState, Ephemeris},
    skypos_errors::SkyPosError,
    time::Instant,
};

use super::{
    bodies::{body_name, naif_id},
    daf_header::{DAFHeader, DAF_RECORD_BYTES},
    directory::DirectoryData,
    ephemeris_record::EphemerisRecord,
    spk_type::SpkDataType,
    summary_record::Summary,
};

/// Longest `target → center` chain followed before the kernel is declared inconsistent.
const MAX_CHAIN_LENGTH: usize = 8;

/// A decoded Chebyshev segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    summary: Summary,
    directory: DirectoryData,
    records: Vec<EphemerisRecord>,
}

impl Segment {
    pub fn new(
        summary: Summary,
        directory: DirectoryData,
        records: Vec<EphemerisRecord>,
    ) -> Result<Self, SkyPosError> {
        if records.len() != directory.n_records || records.is_empty() {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "segment {} wrt {} announces {} records, {} decoded",
                summary.target,
                summary.center,
                directory.n_records,
                records.len()
            )));
        }
        Ok(Segment {
            summary,
            directory,
            records,
        })
    }

    /// Decode the segment described by `summary` from the whole kernel image.
    fn from_kernel(kernel: &[u8], summary: Summary) -> Result<Self, SkyPosError> {
        let spk_type = summary.validate()?;
        let directory = DirectoryData::parse(kernel, summary.final_addr as usize)?;
        let ncoeff = directory.coefficient_count(spk_type)?;

        // addresses are positive once the summary is validated
        let first_byte = (summary.initial_addr as usize - 1) * 8;
        let directory_byte = (summary.final_addr as usize - 4) * 8;
        let record_bytes = directory.rsize * 8;
        let last_byte = record_bytes
            .checked_mul(directory.n_records)
            .and_then(|size| size.checked_add(first_byte))
            .filter(|&last| last <= directory_byte)
            .ok_or_else(|| {
                SkyPosError::CorruptedEphemerisFile(format!(
                    "records of segment {} wrt {} overlap the directory",
                    summary.target, summary.center
                ))
            })?;
        let data = kernel.get(first_byte..last_byte).ok_or_else(|| {
            SkyPosError::CorruptedEphemerisFile(format!(
                "segment {} wrt {} extends past the end of the file",
                summary.target, summary.center
            ))
        })?;

        let records = data
            .chunks_exact(record_bytes)
            .map(|raw| EphemerisRecord::parse(raw, spk_type, ncoeff))
            .collect::<Result<Vec<_>, _>>()?;

        Segment::new(summary, directory, records)
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn directory(&self) -> &DirectoryData {
        &self.directory
    }

    pub fn spk_type(&self) -> Result<SpkDataType, SkyPosError> {
        self.summary.spk_type()
    }

    pub fn covers(&self, et: EphemerisSeconds) -> bool {
        self.summary.covers(et)
    }

    /// State of `target` relative to `center` in km and km/s.
    pub fn state_km(&self, et: EphemerisSeconds) -> (Vector3<f64>, Vector3<f64>) {
        let index = self.directory.record_index(et);
        self.records[index].interpolate(et)
    }
}

/// All segments of one SPK kernel, resident in memory and read-only after loading.
#[derive(Debug, Clone, Default)]
pub struct SpkEphemeris {
    daf_header: Option<DAFHeader>,
    segments: HashMap<(i32, i32), Vec<Segment>>,
    /// center of each target, from the first segment loaded for it
    centers: HashMap<i32, i32>,
}

impl SpkEphemeris {
    /// Build a store from already decoded segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let mut ephemeris = SpkEphemeris::default();
        for segment in segments {
            ephemeris.insert(segment);
        }
        ephemeris
    }

    fn insert(&mut self, segment: Segment) {
        let key = (segment.summary.target, segment.summary.center);
        self.centers.entry(key.0).or_insert(key.1);
        self.segments.entry(key).or_default().push(segment);
    }

    /// Read and decode a whole SPK kernel.
    pub fn read_spk_file(path: &Utf8Path) -> Result<Self, SkyPosError> {
        let kernel = std::fs::read(path)?;
        let ephemeris = Self::from_bytes(&kernel)?;
        info!(
            "Loaded SPK kernel {path}: {} segments for {} bodies",
            ephemeris.segments.values().map(Vec::len).sum::<usize>(),
            ephemeris.centers.len()
        );
        Ok(ephemeris)
    }

    /// Decode a kernel image (the full content of a `.bsp` file).
    pub fn from_bytes(kernel: &[u8]) -> Result<Self, SkyPosError> {
        let (_, daf_header) = DAFHeader::parse(kernel)?;
        daf_header.check_spk()?;

        let summary_bytes = daf_header.summary_words() * 8;
        let max_records = kernel.len() / DAF_RECORD_BYTES;

        let mut ephemeris = SpkEphemeris::default();
        let mut record_number = daf_header.fward as usize;
        let mut visited = 0;

        while record_number != 0 {
            visited += 1;
            if visited > max_records {
                return Err(SkyPosError::CorruptedEphemerisFile(
                    "summary records form a cycle".to_string(),
                ));
            }

            let start = (record_number - 1) * DAF_RECORD_BYTES;
            let record = kernel
                .get(start..start.saturating_add(DAF_RECORD_BYTES))
                .ok_or_else(|| {
                    SkyPosError::CorruptedEphemerisFile(format!(
                        "summary record {record_number} lies past the end of the file"
                    ))
                })?;

            // control words: next record, previous record, summary count
            let (input, next) = le_f64::<_, nom::error::Error<_>>(record)?;
            let (input, _) = le_f64::<_, nom::error::Error<_>>(input)?;
            let (mut input, nsum) = le_f64::<_, nom::error::Error<_>>(input)?;

            if !(0.0..=((DAF_RECORD_BYTES - 24) / summary_bytes) as f64).contains(&nsum) {
                return Err(SkyPosError::CorruptedEphemerisFile(format!(
                    "summary record {record_number} announces {nsum} summaries"
                )));
            }

            for _ in 0..nsum as usize {
                let (rest, summary) = Summary::parse(input)?;
                input = rest.get(summary_bytes - 40..).unwrap_or_default();
                debug!(
                    "Decoding segment {} wrt {} ({} .. {} ET)",
                    summary.target, summary.center, summary.start_epoch, summary.end_epoch
                );
                ephemeris.insert(Segment::from_kernel(kernel, summary)?);
            }

            record_number = match next {
                n if n <= 0.0 => 0,
                n if n <= max_records as f64 => n as usize,
                n => {
                    return Err(SkyPosError::CorruptedEphemerisFile(format!(
                        "summary record {record_number} points to record {n}, past the end of the file"
                    )))
                }
            };
        }

        if ephemeris.segments.is_empty() {
            return Err(SkyPosError::CorruptedEphemerisFile(
                "kernel contains no segment".to_string(),
            ));
        }

        ephemeris.daf_header = Some(daf_header);
        Ok(ephemeris)
    }

    pub fn daf_header(&self) -> Option<&DAFHeader> {
        self.daf_header.as_ref()
    }

    /// Every segment, ordered by target then center.
    pub fn segments(&self) -> Vec<&Segment> {
        let mut segments: Vec<&Segment> = self.segments.values().flatten().collect();
        segments.sort_by_key(|s| (s.summary.target, s.summary.center));
        segments
    }

    /// Whether a state relative to the barycenter can be built for `naif_id`.
    pub fn contains(&self, naif_id: i32) -> bool {
        self.chain(naif_id).is_ok()
    }

    /// Span of the segments for one `(target, center)` pair, assumed contiguous.
    fn pair_span(segments: &[Segment]) -> (EphemerisSeconds, EphemerisSeconds) {
        segments.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(start, end), s| (start.min(s.summary.start_epoch), end.max(s.summary.end_epoch)),
        )
    }

    /// The span over which every body of the kernel is available. Consecutive segments of
    /// one body are joined before the bodies are intersected; `None` when the bodies share
    /// no common instant.
    pub fn coverage(&self) -> Option<(Epoch, Epoch)> {
        let (start, end) = self
            .segments
            .values()
            .map(|segments| Self::pair_span(segments))
            .reduce(|(start, end), (s, e)| (start.max(s), end.min(e)))?;
        (start <= end).then(|| (Epoch::from_et_seconds(start), Epoch::from_et_seconds(end)))
    }

    /// `(target, center)` pairs leading from `naif_id` to the barycenter.
    fn chain(&self, naif_id: i32) -> Result<Vec<(i32, i32)>, SkyPosError> {
        let mut links = Vec::new();
        let mut current = naif_id;
        while current != 0 {
            let center = *self.centers.get(&current).ok_or_else(|| {
                SkyPosError::UnknownBody(format!(
                    "NAIF {naif_id} has no path to the barycenter in the loaded kernel (missing {current})"
                ))
            })?;
            links.push((current, center));
            if links.len() > MAX_CHAIN_LENGTH {
                return Err(SkyPosError::CorruptedEphemerisFile(format!(
                    "segment chain of NAIF {naif_id} does not reach the barycenter"
                )));
            }
            current = center;
        }
        Ok(links)
    }

    fn segment_state_km(
        &self,
        target: i32,
        center: i32,
        et: EphemerisSeconds,
    ) -> Result<(Vector3<f64>, Vector3<f64>), SkyPosError> {
        let segments = self
            .segments
            .get(&(target, center))
            .ok_or_else(|| SkyPosError::UnknownBody(target.to_string()))?;

        // later segments take precedence, as in the SPK search order
        match segments.iter().rev().find(|s| s.covers(et)) {
            Some(segment) => Ok(segment.state_km(et)),
            None => {
                let (start, end) = Self::pair_span(segments);
                Err(SkyPosError::EphemerisRange {
                    target,
                    center,
                    requested: Epoch::from_et_seconds(et),
                    start: Epoch::from_et_seconds(start),
                    end: Epoch::from_et_seconds(end),
                })
            }
        }
    }

    /// Barycentric state of `naif_id` in km and km/s.
    pub fn barycentric_state_km(
        &self,
        naif_id: i32,
        et: EphemerisSeconds,
    ) -> Result<(Vector3<f64>, Vector3<f64>), SkyPosError> {
        let mut position = Vector3::zeros();
        let mut velocity = Vector3::zeros();
        for (target, center) in self.chain(naif_id)? {
            let (p, v) = self.segment_state_km(target, center, et)?;
            position += p;
            velocity += v;
        }
        Ok((position, velocity))
    }
}

impl Ephemeris for SpkEphemeris {
    fn body(&self, key: &str) -> Result<Body, SkyPosError> {
        let id = naif_id(key).ok_or_else(|| SkyPosError::UnknownBody(key.to_string()))?;
        if !self.contains(id) {
            return Err(SkyPosError::UnknownBody(format!(
                "{key} (NAIF {id}) is not covered by the loaded ephemeris"
            )));
        }
        Ok(Body::new(body_name(id).unwrap_or(key.trim()), id))
    }

    fn state(&self, body: &Body, instant: &Instant) -> Result<BodyState, SkyPosError> {
        let (position, velocity) = self.barycentric_state_km(body.naif_id(), instant.et_seconds())?;
        Ok(BodyState {
            position: FramedVector::<Barycentric>::from_vector(position / AU),
            velocity: FramedVector::<Barycentric>::from_vector(velocity * SECONDS_PER_DAY / AU),
        })
    }
}

impl fmt::Display for SpkEphemeris {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(header) = &self.daf_header {
            write!(f, "{header}")?;
        }
        if let Some((start, end)) = self.coverage() {
            writeln!(f, "Common coverage: {start} .. {end}")?;
        }
        for segment in self.segments() {
            write!(f, "{}", segment.summary)?;
        }
        Ok(())
    }
}
