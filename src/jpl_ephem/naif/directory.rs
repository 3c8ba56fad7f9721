//! Directory footer of a Chebyshev (type 2 / 3) SPK segment.
//!
//! The last four double words of a segment are `init`, `intlen`, `rsize` and `n`: the
//! start epoch of the first record, the span covered by each record (seconds), the record
//! size in double words and the record count. DAF addresses count 8-byte words from 1,
//! so the footer of a segment ending at `final_addr` starts at byte `(final_addr - 4) * 8`.
use std::fmt;

use hifitime::{Duration, Epoch};
use nom::number::complete::le_f64;

use crate::{
    constants::EphemerisSeconds, jpl_ephem::naif::spk_type::SpkDataType,
    skypos_errors::SkyPosError,
};

#[derive(Debug, PartialEq, Clone)]
pub struct DirectoryData {
    pub init: EphemerisSeconds,
    pub intlen: f64,
    pub rsize: usize,
    pub n_records: usize,
}

impl DirectoryData {
    /// Read the footer of the segment ending at `final_addr` out of the whole kernel image.
    pub fn parse(kernel: &[u8], final_addr: usize) -> Result<Self, SkyPosError> {
        let start = final_addr
            .checked_sub(4)
            .and_then(|word| word.checked_mul(8))
            .ok_or_else(|| {
                SkyPosError::CorruptedEphemerisFile(format!(
                    "segment end address {final_addr} leaves no room for a directory"
                ))
            })?;
        let footer = start
            .checked_add(32)
            .and_then(|end| kernel.get(start..end))
            .ok_or_else(|| {
                SkyPosError::CorruptedEphemerisFile(format!(
                    "directory at byte {start} lies past the end of the file ({} bytes)",
                    kernel.len()
                ))
            })?;

        let (input, init) = le_f64::<_, nom::error::Error<_>>(footer)?;
        let (input, intlen) = le_f64::<_, nom::error::Error<_>>(input)?;
        let (input, rsize) = le_f64::<_, nom::error::Error<_>>(input)?;
        let (_, n_records) = le_f64::<_, nom::error::Error<_>>(input)?;

        if !(intlen > 0.0) || !(rsize >= 3.0) || !(n_records >= 1.0) {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "invalid segment directory: intlen = {intlen}, rsize = {rsize}, n = {n_records}"
            )));
        }
        // the records must fit in the file before any size is turned into an offset
        let kernel_words = (kernel.len() / 8) as f64;
        if rsize > kernel_words || n_records > kernel_words || rsize * n_records > kernel_words {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "segment directory announces {n_records} records of {rsize} words, \
                 the file holds {kernel_words} words"
            )));
        }

        Ok(DirectoryData {
            init,
            intlen,
            rsize: rsize as usize,
            n_records: n_records as usize,
        })
    }

    /// Number of coefficients per component implied by the record size.
    pub fn coefficient_count(&self, spk_type: SpkDataType) -> Result<usize, SkyPosError> {
        let components = spk_type.component_count();
        let payload = self.rsize - 2;
        if payload % components != 0 || payload == 0 {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "record size {} does not fit {} Chebyshev components",
                self.rsize, components
            )));
        }
        Ok(payload / components)
    }

    /// Index of the record covering `et`. Epochs on a boundary go to the later record,
    /// except the final instant of the segment.
    pub fn record_index(&self, et: EphemerisSeconds) -> usize {
        let raw = ((et - self.init) / self.intlen).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.n_records - 1)
        }
    }
}

impl fmt::Display for DirectoryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "+----------------+----------------------------+";
        writeln!(f, "{border}")?;
        writeln!(
            f,
            "| {:<14} | {:<26} |",
            "init",
            Epoch::from_et_seconds(self.init).to_string()
        )?;
        writeln!(
            f,
            "| {:<14} | {:<26} |",
            "intlen",
            Duration::from_seconds(self.intlen).to_string()
        )?;
        writeln!(f, "| {:<14} | {:<26} |", "rsize", self.rsize)?;
        writeln!(f, "| {:<14} | {:<26} |", "n_records", self.n_records)?;
        writeln!(f, "{border}")
    }
}
