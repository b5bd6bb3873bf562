// src/config.rs
//! Configuration management: known devices and acquisition settings

use crate::{
    device::{DeviceConfig, DeviceDescriptor},
    error::{GpsError, Result},
    gps::{ChecksumPolicy, ValidatorMode},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One configured device, as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Match by port description instead of USB ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub baud_rate: u32,
    pub stabilization_time_ms: u64,
    pub fetch_timeout_ms: u64,
}

impl DeviceEntry {
    fn usb(name: &str, vid: &str, pid: &str, baud_rate: u32, stabilization_time_ms: u64, fetch_timeout_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            vendor_id: Some(vid.to_string()),
            product_id: Some(pid.to_string()),
            tag: None,
            baud_rate,
            stabilization_time_ms,
            fetch_timeout_ms,
        }
    }

    /// Descriptor for this entry; a tag takes precedence over USB ids
    pub fn descriptor(&self) -> DeviceDescriptor {
        match &self.tag {
            Some(tag) => DeviceDescriptor::tagged(&self.name, tag),
            None => DeviceDescriptor::usb(
                &self.name,
                self.vendor_id.as_deref().unwrap_or_default(),
                self.product_id.as_deref().unwrap_or_default(),
            ),
        }
    }

    /// Validate the entry into a [`DeviceConfig`]
    pub fn to_device_config(&self) -> Result<DeviceConfig> {
        DeviceConfig::new(
            self.descriptor(),
            self.baud_rate,
            self.stabilization_time_ms,
            self.fetch_timeout_ms,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub validator: ValidatorMode,
    #[serde(default)]
    pub verify_checksum: bool,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_attempts() -> u32 {
    1
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            devices: Self::known_devices(),
            validator: ValidatorMode::default(),
            verify_checksum: false,
            attempts: default_attempts(),
        }
    }
}

impl LocatorConfig {
    /// Receivers known to work out of the box
    pub fn known_devices() -> Vec<DeviceEntry> {
        vec![
            DeviceEntry::usb("Prolific USB-to-Serial", "067B", "23A3", 4800, 10_000, 60_000),
            DeviceEntry::usb("Prolific Legacy Device", "067B", "2303", 4800, 10_000, 60_000),
            DeviceEntry::usb("u-blox GNSS Receiver", "1546", "01A7", 9600, 15_000, 30_000),
            DeviceEntry {
                name: "Generic GPS".to_string(),
                vendor_id: None,
                product_id: None,
                tag: Some("GPS".to_string()),
                baud_rate: 9600,
                stabilization_time_ms: 1_000,
                fetch_timeout_ms: 30_000,
            },
        ]
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Other(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse config file {}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GpsError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|e| GpsError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(windows)]
        let base = std::env::var("APPDATA")
            .map(PathBuf::from)
            .map_err(|_| GpsError::Other("APPDATA environment variable not set".to_string()))?;

        #[cfg(not(windows))]
        let base = std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .map_err(|_| GpsError::Other("HOME environment variable not set".to_string()))?;

        Ok(base.join("gps-locate").join("config.json"))
    }

    /// Validated device configurations, in file order
    pub fn device_configs(&self) -> Result<Vec<DeviceConfig>> {
        self.devices.iter().map(DeviceEntry::to_device_config).collect()
    }

    /// Find a configured device by case-insensitive name
    pub fn find_device(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices.iter().find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn checksum_policy(&self) -> ChecksumPolicy {
        if self.verify_checksum {
            ChecksumPolicy::Verify
        } else {
            ChecksumPolicy::Ignore
        }
    }
}
