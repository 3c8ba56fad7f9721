//! DAF file record (first 1024 bytes of an SPK kernel).
//!
//! Layout of the file record:
//!
//! | bytes   | field      | meaning                                           |
//! |---------|------------|---------------------------------------------------|
//! | 0..8    | `idword`   | `"DAF/SPK "`                                      |
//! | 8..16   | `nd`, `ni` | doubles / integers per segment summary (2 and 6)  |
//! | 16..76  | `ifname`   | internal file name                                |
//! | 76..88  | `fward`, `bward`, `free` | first / last summary record, free address |
//! | 88..96  | `locfmt`   | binary format, `"LTL-IEEE"` or `"BIG-IEEE"`       |
//! | 699..727| `ftpstr`   | FTP corruption sentinel                           |
//!
//! Only little-endian kernels are decoded; [`DAFHeader::check_spk`] rejects anything else
//! before a single coefficient is read.
use std::fmt;

use nom::{bytes::complete::take, number::complete::le_i32, IResult};

use crate::skypos_errors::SkyPosError;

/// Size of a DAF physical record in bytes.
pub const DAF_RECORD_BYTES: usize = 1024;

#[derive(Debug, PartialEq, Clone)]
pub struct DAFHeader {
    pub idword: String,
    pub internal_filename: String,
    pub nd: i32,
    pub ni: i32,
    pub fward: i32,
    pub bward: i32,
    pub free: i32,
    pub locfmt: String,
}

impl DAFHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, idword) = take(8usize)(input)?;
        let (input, nd) = le_i32(input)?;
        let (input, ni) = le_i32(input)?;
        let (input, ifname) = take(60usize)(input)?;
        let (input, fward) = le_i32(input)?;
        let (input, bward) = le_i32(input)?;
        let (input, free) = le_i32(input)?;
        let (input, locfmt) = take(8usize)(input)?;
        // reserved area and FTP validation string
        let (input, _) = take(631usize)(input)?;

        let text = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                .to_string()
        };

        Ok((
            input,
            DAFHeader {
                idword: text(idword),
                internal_filename: text(ifname),
                nd,
                ni,
                fward,
                bward,
                free,
                locfmt: text(locfmt),
            },
        ))
    }

    /// Check that the header describes a little-endian SPK kernel with the standard
    /// summary layout (`ND = 2`, `NI = 6`).
    pub fn check_spk(&self) -> Result<(), SkyPosError> {
        if self.idword != "DAF/SPK" && self.idword != "NAIF/DAF" {
            return Err(SkyPosError::UnsupportedEphemerisFile(format!(
                "not an SPK kernel (id word {:?})",
                self.idword
            )));
        }
        if !self.locfmt.is_empty() && self.locfmt != "LTL-IEEE" {
            return Err(SkyPosError::UnsupportedEphemerisFile(format!(
                "binary format {} is not supported, convert the kernel to LTL-IEEE",
                self.locfmt
            )));
        }
        if self.nd != 2 || self.ni != 6 {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "unexpected summary layout ND = {}, NI = {}",
                self.nd, self.ni
            )));
        }
        if self.fward < 2 {
            return Err(SkyPosError::CorruptedEphemerisFile(format!(
                "invalid first summary record {}",
                self.fward
            )));
        }
        Ok(())
    }

    /// Summary size in double precision words: `ND + ceil(NI / 2)`.
    pub fn summary_words(&self) -> usize {
        self.nd as usize + (self.ni as usize).div_ceil(2)
    }
}

impl fmt::Display for DAFHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("ID Word", self.idword.clone()),
            ("Internal Name", self.internal_filename.clone()),
            ("ND / NI", format!("{} / {}", self.nd, self.ni)),
            ("Summary records", format!("{} .. {}", self.fward, self.bward)),
            ("Free Addr", self.free.to_string()),
            ("Binary Format", self.locfmt.clone()),
        ];
        let border = format!("+{:-<18}+{:-<32}+", "", "");

        writeln!(f, "{border}")?;
        for (label, value) in rows {
            writeln!(f, "| {label:<16} | {value:<30} |")?;
        }
        writeln!(f, "{border}")
    }
}
