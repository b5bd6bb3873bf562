// src/device/matcher.rs
//! Matching device descriptors against enumerated ports

use super::{DeviceDescriptor, EnumeratedDevice, MatchStrategy, PortHandle};

fn ids_match(descriptor: &DeviceDescriptor, device: &EnumeratedDevice) -> bool {
    match (&device.vendor_id, &device.product_id) {
        (Some(vid), Some(pid)) => {
            vid.eq_ignore_ascii_case(&descriptor.vendor_id)
                && pid.eq_ignore_ascii_case(&descriptor.product_id)
        }
        _ => false,
    }
}

fn description_matches(tag: &str, device: &EnumeratedDevice) -> bool {
    device
        .port_description
        .as_deref()
        .map_or(false, |description| {
            description.to_lowercase().contains(&tag.to_lowercase())
        })
}

/// Find the first enumerated port matching `descriptor`.
///
/// `None` means the device is not attached right now; it is not an error.
pub fn match_port(descriptor: &DeviceDescriptor, devices: &[EnumeratedDevice]) -> Option<PortHandle> {
    devices
        .iter()
        .find(|device| match &descriptor.strategy {
            MatchStrategy::UsbId => ids_match(descriptor, device),
            MatchStrategy::DescriptionTag(tag) => description_matches(tag, device),
        })
        .map(|device| PortHandle {
            name: device.port_name.clone(),
            description: device.port_description.clone(),
        })
}
