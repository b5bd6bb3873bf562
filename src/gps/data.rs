// src/gps/data.rs
//! Fix record accumulated from NMEA sentences

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store `value` into `slot` unless the slot already holds something.
///
/// Returns `true` when the slot was written.
pub fn set_if_absent<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match (slot.is_none(), value) {
        (true, Some(value)) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

/// Position fix assembled over one acquisition attempt.
///
/// Every optional field is written at most once; later sentences never
/// overwrite an earlier value. `valid` is not merged, it is filled in when
/// a snapshot is taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub latitude: Option<f64>,       // decimal degrees, 6 dp
    pub longitude: Option<f64>,      // decimal degrees, 6 dp
    pub altitude: Option<String>,    // meters, as received
    pub time_utc: Option<String>,    // hhmmss[.ss], as received
    pub fix_type: Option<String>,
    pub speed_knots: Option<f64>,
    pub course: Option<f64>,         // degrees
    pub satellites: Option<u8>,
    pub valid: bool,
}

impl FixRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether latitude, longitude and a non-empty altitude are all present
    pub fn has_position(&self) -> bool {
        self.latitude.is_some()
            && self.longitude.is_some()
            && self.altitude.as_deref().map_or(false, |alt| !alt.is_empty())
    }

    /// Altitude in meters, if it parses as a number
    pub fn altitude_meters(&self) -> Option<f64> {
        self.altitude.as_deref().and_then(|alt| alt.parse().ok())
    }

    /// UTC time of the fix decoded from the NMEA `hhmmss[.sss]` field
    pub fn utc_time(&self) -> Option<NaiveTime> {
        let raw = self.time_utc.as_deref()?;
        NaiveTime::parse_from_str(raw, "%H%M%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H%M%S"))
            .ok()
    }

    /// Speed over ground converted to km/h
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_knots.map(|knots| knots * 1.852)
    }

    /// Format coordinate for display
    pub fn format_coordinate(coord: Option<f64>) -> String {
        match coord {
            Some(val) => format!("{:.6}", val),
            None => "No fix".to_string(),
        }
    }
}

fn write_field<T: fmt::Display>(f: &mut fmt::Formatter<'_>, value: &Option<T>) -> fmt::Result {
    match value {
        Some(value) => write!(f, "'{}'", value),
        None => write!(f, "null"),
    }
}

impl fmt::Display for FixRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixRecord {{latitude=")?;
        write_field(f, &self.latitude.map(|v| format!("{:.6}", v)))?;
        write!(f, ", longitude=")?;
        write_field(f, &self.longitude.map(|v| format!("{:.6}", v)))?;
        write!(f, ", altitude=")?;
        write_field(f, &self.altitude)?;
        write!(f, ", time=")?;
        write_field(f, &self.time_utc)?;
        write!(f, ", fixType=")?;
        write_field(f, &self.fix_type)?;
        write!(f, ", speed=")?;
        write_field(f, &self.speed_knots)?;
        write!(f, ", course=")?;
        write_field(f, &self.course)?;
        write!(f, ", valid={}}}", self.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_if_absent_keeps_first() {
        let mut slot = None;
        assert!(set_if_absent(&mut slot, Some("first")));
        assert!(!set_if_absent(&mut slot, Some("second")));
        assert!(!set_if_absent(&mut slot, None));
        assert_eq!(slot, Some("first"));
    }

    #[test]
    fn test_summary_reproduces_fields() {
        let record = FixRecord {
            latitude: Some(48.1173),
            longitude: Some(11.516667),
            altitude: Some("545.4".to_string()),
            time_utc: Some("123519".to_string()),
            fix_type: Some("3".to_string()),
            speed_knots: Some(22.4),
            course: Some(84.4),
            satellites: Some(8),
            valid: true,
        };

        let expected = "FixRecord {latitude='48.117300', longitude='11.516667', altitude='545.4', \
                        time='123519', fixType='3', speed='22.4', course='84.4', valid=true}";
        assert_eq!(record.to_string(), expected);
    }

    #[test]
    fn test_summary_of_empty_record() {
        assert_eq!(
            FixRecord::new().to_string(),
            "FixRecord {latitude=null, longitude=null, altitude=null, time=null, \
             fixType=null, speed=null, course=null, valid=false}"
        );
    }

    #[test]
    fn test_has_position_requires_altitude_text() {
        let mut record = FixRecord::new();
        record.latitude = Some(48.1173);
        record.longitude = Some(11.516667);
        assert!(!record.has_position());

        record.altitude = Some(String::new());
        assert!(!record.has_position());

        record.altitude = Some("545.4".to_string());
        assert!(record.has_position());
        assert_eq!(record.altitude_meters(), Some(545.4));
    }

    #[test]
    fn test_utc_time_decoding() {
        let mut record = FixRecord::new();
        record.time_utc = Some("123519.50".to_string());
        assert_eq!(
            record.utc_time(),
            NaiveTime::from_hms_milli_opt(12, 35, 19, 500)
        );

        record.time_utc = Some("1235".to_string());
        assert_eq!(record.utc_time(), None);
    }
}
