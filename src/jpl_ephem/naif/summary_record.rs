use std::fmt;

use hifitime::Epoch;
use nom::{
    number::complete::{le_f64, le_i32},
    IResult,
};

use crate::{
    constants::EphemerisSeconds,
    jpl_ephem::naif::{bodies::body_name, spk_type::SpkDataType},
    skypos_errors::SkyPosError,
};

/// Reference frame code of ICRF/J2000 in SPK summaries.
pub const J2000_FRAME_ID: i32 = 1;

/// One segment descriptor from a DAF summary record (`ND = 2`, `NI = 6`).
#[derive(Debug, PartialEq, Clone)]
pub struct Summary {
    pub start_epoch: EphemerisSeconds,
    pub end_epoch: EphemerisSeconds,
    pub target: i32,
    pub center: i32,
    pub frame_id: i32,
    pub data_type: i32,
    pub initial_addr: i32,
    pub final_addr: i32,
}

impl Summary {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, start_epoch) = le_f64(input)?;
        let (input, end_epoch) = le_f64(input)?;
        let (input, target) = le_i32(input)?;
        let (input, center) = le_i32(input)?;
        let (input, frame_id) = le_i32(input)?;
        let (input, data_type) = le_i32(input)?;
        let (input, initial_addr) = le_i32(input)?;
        let (input, final_addr) = le_i32(input)?;
        Ok((
            input,
            Summary {
                start_epoch,
                end_epoch,
                target,
                center,
                frame_id,
                data_type,
                initial_addr,
                final_addr,
            },
        ))
    }

    pub fn spk_type(&self) -> Result<SpkDataType, SkyPosError> {
        SpkDataType::try_from(self.data_type)
    }

    pub fn covers(&self, et: EphemerisSeconds) -> bool {
        self.start_epoch <= et && et <= self.end_epoch
    }

    /// Check what the reader relies on: a supported data type, the J2000 frame and a sane
    /// address range.
    pub fn validate(&self) -> Result<SpkDataType, SkyPosError> {
        let spk_type = self.spk_type()?;
        if self.frame_id != J2000_FRAME_ID {
            return Err(SkyPosError::UnsupportedEphemerisFile(format!(
                "segment {} wrt {} uses frame {}, only J2000 ({J2000_FRAME_ID}) is supported",
                self.target, self.center, self.frame_id
            )));
        }
        if self.initial_addr < 1
            || i64::from(self.final_addr) < i64::from(self.initial_addr) + 4
            || !(self.start_epoch <= self.end_epoch)
        {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "segment {} wrt {} has addresses {}..{} and span {}..{}",
                self.target,
                self.center,
                self.initial_addr,
                self.final_addr,
                self.start_epoch,
                self.end_epoch
            )));
        }
        Ok(spk_type)
    }
}

fn body_label(id: i32) -> String {
    match body_name(id) {
        Some(name) => format!("{name} ({id})"),
        None => id.to_string(),
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_type = match self.spk_type() {
            Ok(spk_type) => spk_type.to_string(),
            Err(_) => format!("unsupported ({})", self.data_type),
        };

        let fields = [
            ("start_epoch", Epoch::from_et_seconds(self.start_epoch).to_string()),
            ("end_epoch", Epoch::from_et_seconds(self.end_epoch).to_string()),
            ("target", body_label(self.target)),
            ("center", body_label(self.center)),
            ("frame_id", self.frame_id.to_string()),
            ("data_type", data_type),
            (
                "addresses",
                format!("{} .. {}", self.initial_addr, self.final_addr),
            ),
        ];

        let label_width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(10);
        let value_width = fields.iter().map(|(_, v)| v.len()).max().unwrap_or(10);
        let border = format!(
            "+{:-<label$}+{:-<value$}+",
            "",
            "",
            label = label_width + 2,
            value = value_width + 2
        );

        writeln!(f, "{border}")?;
        for (label, value) in fields {
            writeln!(f, "| {label:<label_width$} | {value:<value_width$} |")?;
        }
        writeln!(f, "{border}")
    }
}
