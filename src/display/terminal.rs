// src/display/terminal.rs
//! Terminal rendering of acquisition outcomes

use crate::{
    config::DeviceEntry,
    device::EnumeratedDevice,
    error::{AcquisitionError, GpsError, Result},
    gps::FixRecord,
    session::{Acquisition, SentenceStats},
};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::Write;

pub struct TerminalDisplay {
    color: bool,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            color: super::should_use_color(),
        }
    }

    /// Display without color escape sequences
    pub fn plain() -> Self {
        Self { color: false }
    }

    fn header(&self, out: &mut impl Write, color: Color, title: &str) -> Result<()> {
        let written = if self.color {
            queue!(
                out,
                SetForegroundColor(color),
                Print(format!("{}\n", title)),
                ResetColor
            )
        } else {
            queue!(out, Print(format!("{}\n", title)))
        };
        written.map_err(GpsError::Io)
    }

    fn row(&self, out: &mut impl Write, label: &str, value: &str) -> Result<()> {
        queue!(out, Print(format!("  {:<12} {}\n", label, value))).map_err(GpsError::Io)
    }

    /// Render a successful acquisition
    pub fn render_acquisition(&self, out: &mut impl Write, acquisition: &Acquisition) -> Result<()> {
        self.header(out, Color::Green, &"=".repeat(60))?;
        self.row(out, "Device:", &acquisition.device)?;
        self.row(out, "Port:", &acquisition.port.to_string())?;
        self.row(
            out,
            "Acquired:",
            &acquisition.acquired_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )?;
        queue!(out, Print("\n")).map_err(GpsError::Io)?;

        self.render_fix(out, &acquisition.fix)?;
        self.render_stats(out, &acquisition.stats)?;
        self.header(out, Color::Green, &"=".repeat(60))?;
        out.flush()?;
        Ok(())
    }

    fn render_fix(&self, out: &mut impl Write, fix: &FixRecord) -> Result<()> {
        self.header(out, Color::Yellow, "POSITION:")?;
        self.row(out, "Latitude:", &FixRecord::format_coordinate(fix.latitude))?;
        self.row(out, "Longitude:", &FixRecord::format_coordinate(fix.longitude))?;
        self.row(
            out,
            "Altitude:",
            &match (fix.altitude_meters(), fix.altitude.as_deref()) {
                (Some(meters), _) => format!("{:.1} m", meters),
                (None, Some(raw)) if !raw.is_empty() => format!("{} m", raw),
                _ => "Unknown".to_string(),
            },
        )?;

        let time = match fix.utc_time() {
            Some(time) => time.format("%H:%M:%S UTC").to_string(),
            None => fix.time_utc.clone().unwrap_or_else(|| "Unknown".to_string()),
        };
        self.row(out, "Time:", &time)?;

        if let Some(speed) = fix.speed_kmh() {
            self.row(out, "Speed:", &format!("{:.1} km/h", speed))?;
        }
        if let Some(course) = fix.course {
            self.row(out, "Course:", &format!("{:.1}°", course))?;
        }
        if let Some(satellites) = fix.satellites {
            self.row(out, "Satellites:", &satellites.to_string())?;
        }
        if let Some(fix_type) = &fix.fix_type {
            self.row(out, "Fix Type:", fix_type)?;
        }
        queue!(out, Print("\n")).map_err(GpsError::Io)?;
        Ok(())
    }

    fn render_stats(&self, out: &mut impl Write, stats: &SentenceStats) -> Result<()> {
        self.header(out, Color::Cyan, "SENTENCES:")?;
        self.row(out, "Received:", &stats.total_sentences.to_string())?;
        self.row(out, "Parsed:", &stats.parsed_sentences.to_string())?;
        self.row(out, "Valid:", &stats.valid_sentences.to_string())?;
        Ok(())
    }

    /// Render a failed acquisition
    pub fn render_failure(&self, out: &mut impl Write, error: &AcquisitionError, stats: &SentenceStats) -> Result<()> {
        self.header(out, Color::Red, &format!("FAILED ({}):", error.kind()))?;
        queue!(out, Print(format!("  {}\n\n", error))).map_err(GpsError::Io)?;
        if stats.total_sentences > 0 {
            self.render_stats(out, stats)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Render the enumerated serial ports
    pub fn render_ports(&self, out: &mut impl Write, ports: &[EnumeratedDevice]) -> Result<()> {
        if ports.is_empty() {
            queue!(out, Print("No serial ports found.\n")).map_err(GpsError::Io)?;
        } else {
            self.header(out, Color::Yellow, "Available serial ports:")?;
            for port in ports {
                let ids = match (&port.vendor_id, &port.product_id) {
                    (Some(vid), Some(pid)) => format!("VID: {} PID: {}", vid, pid),
                    _ => "-".to_string(),
                };
                queue!(
                    out,
                    Print(format!(
                        "  {:<16} {:<22} {}\n",
                        port.port_name,
                        ids,
                        port.port_description.as_deref().unwrap_or("")
                    ))
                )
                .map_err(GpsError::Io)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Render the configured devices
    pub fn render_devices(&self, out: &mut impl Write, devices: &[DeviceEntry]) -> Result<()> {
        self.header(out, Color::Yellow, "Configured devices:")?;
        for entry in devices {
            queue!(
                out,
                Print(format!(
                    "  {:<26} {:<32} {:>6} baud  settle {} ms  timeout {} ms\n",
                    entry.name,
                    entry.descriptor().to_string(),
                    entry.baud_rate,
                    entry.stabilization_time_ms,
                    entry.fetch_timeout_ms
                ))
            )
            .map_err(GpsError::Io)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
