use std::{convert::TryFrom, fmt};

use crate::skypos_errors::SkyPosError;

/// SPK segment data types this reader can evaluate.
///
/// Planetary ephemerides (DE4xx) use type 2; type 3 additionally stores velocity
/// coefficients. Every other type is refused at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SpkDataType {
    ChebyshevPositionOnly = 2,
    ChebyshevPositionVelocity = 3,
}

impl SpkDataType {
    /// Number of Chebyshev coefficient sets stored per record (x, y, z [, vx, vy, vz]).
    pub fn component_count(self) -> usize {
        match self {
            SpkDataType::ChebyshevPositionOnly => 3,
            SpkDataType::ChebyshevPositionVelocity => 6,
        }
    }
}

impl From<SpkDataType> for i32 {
    fn from(data_type: SpkDataType) -> Self {
        data_type as i32
    }
}

impl TryFrom<i32> for SpkDataType {
    type Error = SkyPosError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(SpkDataType::ChebyshevPositionOnly),
            3 => Ok(SpkDataType::ChebyshevPositionVelocity),
            _ => Err(SkyPosError::InvalidSpkDataType(value)),
        }
    }
}

impl fmt::Display for SpkDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpkDataType::ChebyshevPositionOnly => write!(f, "Chebyshev position only (2)"),
            SpkDataType::ChebyshevPositionVelocity => {
                write!(f, "Chebyshev position and velocity (3)")
            }
        }
    }
}
