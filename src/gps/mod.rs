// src/gps/mod.rs
//! NMEA parsing and fix accumulation

pub mod data;
pub mod fix;
pub mod nmea;

pub use data::FixRecord;
pub use fix::{ChecksumPolicy, FixAccumulator, ValidatorMode};
pub use nmea::{Sentence, SentenceKind};
