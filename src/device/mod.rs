// src/device/mod.rs
//! Device descriptors, per-device configuration and port matching

pub mod enumerate;
pub mod matcher;

pub use enumerate::{EnumeratedDevice, PortEnumerator, SystemPorts};
pub use matcher::match_port;

use crate::error::{GpsError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// How a descriptor is matched against the enumerated ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Case-insensitive vendor and product id equality
    UsbId,
    /// Case-insensitive substring of the port description
    DescriptionTag(String),
}

/// Identity of a target GPS device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub vendor_id: String,
    pub product_id: String,
    pub strategy: MatchStrategy,
}

impl DeviceDescriptor {
    /// Descriptor matched by USB vendor/product id
    pub fn usb(name: &str, vendor_id: &str, product_id: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor_id: vendor_id.to_string(),
            product_id: product_id.to_string(),
            strategy: MatchStrategy::UsbId,
        }
    }

    /// Descriptor matched by a tag in the port description
    pub fn tagged(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor_id: String::new(),
            product_id: String::new(),
            strategy: MatchStrategy::DescriptionTag(tag.to_string()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GpsError::Config("device name cannot be empty".to_string()));
        }
        match &self.strategy {
            MatchStrategy::UsbId => {
                if self.vendor_id.trim().is_empty() || self.product_id.trim().is_empty() {
                    return Err(GpsError::Config(format!(
                        "device '{}' needs both a vendor id and a product id",
                        self.name
                    )));
                }
            }
            MatchStrategy::DescriptionTag(tag) => {
                if tag.trim().is_empty() {
                    return Err(GpsError::Config(format!(
                        "device '{}' has an empty description tag",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.strategy {
            MatchStrategy::UsbId => write!(
                f,
                "{} (VID: {}, PID: {})",
                self.name, self.vendor_id, self.product_id
            ),
            MatchStrategy::DescriptionTag(tag) => write!(f, "{} (tag: {})", self.name, tag),
        }
    }
}

/// Validated connection settings for one device.
///
/// Fields are checked once in [`DeviceConfig::new`] and cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    descriptor: DeviceDescriptor,
    baud_rate: u32,
    stabilization_time: Duration,
    fetch_timeout: Duration,
}

impl DeviceConfig {
    pub fn new(
        descriptor: DeviceDescriptor,
        baud_rate: u32,
        stabilization_time_ms: u64,
        fetch_timeout_ms: u64,
    ) -> Result<Self> {
        descriptor.validate()?;
        if baud_rate == 0 {
            return Err(GpsError::Config("baud rate must be greater than 0".to_string()));
        }
        if fetch_timeout_ms == 0 {
            return Err(GpsError::Config(
                "GPS data fetch timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            descriptor,
            baud_rate,
            stabilization_time: Duration::from_millis(stabilization_time_ms),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
        })
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn stabilization_time(&self) -> Duration {
        self.stabilization_time
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

/// A communication port found by enumeration, identified by its system name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortHandle {
    pub name: String,
    pub description: Option<String>,
}

impl PortHandle {
    pub fn new(name: &str, description: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
        }
    }
}

impl fmt::Display for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", self.name, description),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ublox() -> DeviceDescriptor {
        DeviceDescriptor::usb("u-blox GNSS Receiver", "1546", "01A7")
    }

    #[test]
    fn test_valid_config() {
        let config = DeviceConfig::new(ublox(), 9600, 15000, 30000).unwrap();
        assert_eq!(config.baud_rate(), 9600);
        assert_eq!(config.stabilization_time(), Duration::from_secs(15));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.descriptor().name, "u-blox GNSS Receiver");
    }

    #[test]
    fn test_zero_stabilization_is_allowed() {
        assert!(DeviceConfig::new(ublox(), 4800, 0, 1).is_ok());
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        assert!(matches!(DeviceConfig::new(ublox(), 0, 1000, 30000), Err(GpsError::Config(_))));
        assert!(matches!(DeviceConfig::new(ublox(), 9600, 1000, 0), Err(GpsError::Config(_))));
    }

    #[test]
    fn test_incomplete_descriptors_are_rejected() {
        let no_pid = DeviceDescriptor::usb("Prolific", "067B", "");
        assert!(DeviceConfig::new(no_pid, 4800, 0, 1000).is_err());

        let no_tag = DeviceDescriptor::tagged("Any GPS", "  ");
        assert!(DeviceConfig::new(no_tag, 9600, 0, 1000).is_err());

        let no_name = DeviceDescriptor::tagged("", "GPS");
        assert!(DeviceConfig::new(no_name, 9600, 0, 1000).is_err());
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(ublox().to_string(), "u-blox GNSS Receiver (VID: 1546, PID: 01A7)");
        assert_eq!(DeviceDescriptor::tagged("Any GPS", "GPS").to_string(), "Any GPS (tag: GPS)");
    }
}
