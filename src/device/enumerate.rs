// src/device/enumerate.rs
//! Port enumeration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tokio_serial::SerialPortType;

/// One port reported by the operating system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratedDevice {
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub port_name: String,
    pub port_description: Option<String>,
}

impl EnumeratedDevice {
    /// A non-USB port, known only by name and description
    pub fn plain(port_name: &str, port_description: Option<&str>) -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            port_name: port_name.to_string(),
            port_description: port_description.map(str::to_string),
        }
    }

    /// A USB-serial port with vendor and product ids
    pub fn usb(port_name: &str, vendor_id: &str, product_id: &str, port_description: Option<&str>) -> Self {
        Self {
            vendor_id: Some(vendor_id.to_string()),
            product_id: Some(product_id.to_string()),
            ..Self::plain(port_name, port_description)
        }
    }
}

/// Source of the currently available ports
pub trait PortEnumerator {
    fn enumerate(&self) -> Result<Vec<EnumeratedDevice>>;
}

/// Enumerates the serial ports of this machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn enumerate(&self) -> Result<Vec<EnumeratedDevice>> {
        let ports = tokio_serial::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|port| match port.port_type {
                SerialPortType::UsbPort(info) => {
                    let description = info.product.or(info.manufacturer);
                    EnumeratedDevice::usb(
                        &port.port_name,
                        &format!("{:04X}", info.vid),
                        &format!("{:04X}", info.pid),
                        description.as_deref(),
                    )
                }
                SerialPortType::BluetoothPort => {
                    EnumeratedDevice::plain(&port.port_name, Some("Bluetooth serial port"))
                }
                SerialPortType::PciPort => EnumeratedDevice::plain(&port.port_name, Some("PCI serial port")),
                SerialPortType::Unknown => EnumeratedDevice::plain(&port.port_name, None),
            })
            .collect())
    }
}

/// Fixed list of ports, for callers that enumerate by other means
impl PortEnumerator for Vec<EnumeratedDevice> {
    fn enumerate(&self) -> Result<Vec<EnumeratedDevice>> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_list_enumerates_itself() {
        let ports = vec![
            EnumeratedDevice::usb("COM3", "067B", "23A3", Some("Prolific USB-to-Serial")),
            EnumeratedDevice::plain("COM1", None),
        ];
        assert_eq!(ports.enumerate().unwrap(), ports);
    }

    #[test]
    fn test_usb_constructor() {
        let device = EnumeratedDevice::usb("/dev/ttyACM0", "1546", "01A7", Some("u-blox GNSS receiver"));
        assert_eq!(device.vendor_id.as_deref(), Some("1546"));
        assert_eq!(device.product_id.as_deref(), Some("01A7"));
        assert_eq!(device.port_description.as_deref(), Some("u-blox GNSS receiver"));
    }
}
