// src/observer.rs
//! Session event reporting

use crate::{
    device::{DeviceDescriptor, PortHandle},
    gps::FixRecord,
    session::SessionState,
};
use log::{debug, info, trace};

/// Receives progress events from an acquisition session.
///
/// All methods default to doing nothing, so implementors only override the
/// events they care about.
pub trait SessionObserver: Send + Sync {
    fn on_state(&self, _state: SessionState) {}

    fn on_port_matched(&self, _device: &DeviceDescriptor, _port: &PortHandle) {}

    fn on_sentence(&self, _line: &str) {}

    fn on_fix(&self, _fix: &FixRecord) {}

    fn on_port_closed(&self, _port: &PortHandle) {}
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_state(&self, state: SessionState) {
        debug!(target: "session", "state -> {}", state);
    }

    fn on_port_matched(&self, device: &DeviceDescriptor, port: &PortHandle) {
        info!(target: "session", "Matched device {} on port {}", device, port);
    }

    fn on_sentence(&self, line: &str) {
        trace!(target: "nmea", "{}", line);
    }

    fn on_fix(&self, fix: &FixRecord) {
        info!(target: "session", "Fix acquired: {}", fix);
    }

    fn on_port_closed(&self, port: &PortHandle) {
        debug!(target: "session", "Closed port {}", port.name);
    }
}
