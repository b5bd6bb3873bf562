// src/lib.rs
//! GPS Locator Library
//!
//! Finds a GPS receiver attached to a serial port, waits for it to settle and
//! reads NMEA-0183 sentences until a validated position fix is available.

pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod gps;
pub mod observer;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use device::{DeviceConfig, DeviceDescriptor, PortHandle};
pub use error::{AcquisitionError, GpsError, Result};
pub use gps::{FixAccumulator, FixRecord, ValidatorMode};
pub use session::{Acquisition, AcquisitionResult, AcquisitionSession};
