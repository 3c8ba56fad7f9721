//! Reader for NAIF SPK kernels (DAF containers of Chebyshev segments), such as the JPL
//! `de4xx.bsp` planetary ephemerides.
pub mod bodies;
pub mod daf_header;
pub mod directory;
pub mod ephemeris_record;
pub mod spk_ephemeris;
pub mod spk_type;
pub mod summary_record;
