// src/error.rs
//! Error types for the GPS locator

use crate::device::PortHandle;
use std::{fmt, time::Duration};

pub type Result<T> = std::result::Result<T, GpsError>;

/// General errors: configuration, storage and transport plumbing
#[derive(Debug)]
pub enum GpsError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Config(String),
    Connection(String),
    Other(String),
}

impl fmt::Display for GpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpsError::Io(e) => write!(f, "IO error: {}", e),
            GpsError::Serial(e) => write!(f, "Serial error: {}", e),
            GpsError::Json(e) => write!(f, "JSON error: {}", e),
            GpsError::Config(msg) => write!(f, "Configuration error: {}", msg),
            GpsError::Connection(msg) => write!(f, "Connection error: {}", msg),
            GpsError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GpsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpsError::Io(e) => Some(e),
            GpsError::Serial(e) => Some(e),
            GpsError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GpsError {
    fn from(error: std::io::Error) -> Self {
        GpsError::Io(error)
    }
}

impl From<tokio_serial::Error> for GpsError {
    fn from(error: tokio_serial::Error) -> Self {
        GpsError::Serial(error)
    }
}

impl From<serde_json::Error> for GpsError {
    fn from(error: serde_json::Error) -> Self {
        GpsError::Json(error)
    }
}

/// Terminal failure of a single acquisition attempt.
///
/// Every variant is an expected outcome rather than a fault; callers use
/// [`AcquisitionError::requires_rematch`] and [`AcquisitionError::is_retriable`]
/// to decide what to do next.
#[derive(Debug)]
pub enum AcquisitionError {
    /// No enumerated port matched the device descriptor
    NoDeviceMatched { device: String },
    /// The matched port could not be opened
    PortOpenFailed { port: PortHandle, source: GpsError },
    /// The port streamed data but no valid fix arrived before the deadline
    Timeout { port: PortHandle, waited: Duration },
    /// Reading from the open port failed, or the stream ended
    Io { port: PortHandle, source: std::io::Error },
    /// The caller cancelled the acquisition
    Cancelled,
}

impl AcquisitionError {
    /// Whether the next attempt has to enumerate and match ports again
    pub fn requires_rematch(&self) -> bool {
        matches!(
            self,
            AcquisitionError::NoDeviceMatched { .. }
                | AcquisitionError::PortOpenFailed { .. }
                | AcquisitionError::Io { .. }
        )
    }

    /// Whether trying again can reasonably succeed
    pub fn is_retriable(&self) -> bool {
        !matches!(self, AcquisitionError::Cancelled)
    }

    /// Short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            AcquisitionError::NoDeviceMatched { .. } => "no-device-matched",
            AcquisitionError::PortOpenFailed { .. } => "port-open-failed",
            AcquisitionError::Timeout { .. } => "timeout",
            AcquisitionError::Io { .. } => "io-error",
            AcquisitionError::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::NoDeviceMatched { device } => {
                write!(f, "No port matched device '{}'", device)
            }
            AcquisitionError::PortOpenFailed { port, source } => {
                write!(f, "Failed to open port {}: {}", port.name, source)
            }
            AcquisitionError::Timeout { port, waited } => write!(
                f,
                "No valid fix on {} within {} ms",
                port.name,
                waited.as_millis()
            ),
            AcquisitionError::Io { port, source } => {
                write!(f, "Error reading from port {}: {}", port.name, source)
            }
            AcquisitionError::Cancelled => write!(f, "Acquisition cancelled"),
        }
    }
}

impl std::error::Error for AcquisitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcquisitionError::PortOpenFailed { source, .. } => Some(source),
            AcquisitionError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
