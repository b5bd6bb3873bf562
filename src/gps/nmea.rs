// src/gps/nmea.rs
//! NMEA sentence parsing

use super::data::{set_if_absent, FixRecord};
use serde::{Deserialize, Serialize};

/// Leading character of every NMEA-0183 sentence
pub const SENTENCE_MARKER: char = '$';

/// Sentence types the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentenceKind {
    Gga,
    Rmc,
    Gsa,
    Gll,
}

/// GGA: Global Positioning System Fix Data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GgaData {
    pub time_utc: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_status: Option<String>,
    pub satellites: Option<u8>,
    pub altitude: Option<String>,
}

/// RMC: Recommended Minimum Course
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmcData {
    pub time_utc: Option<String>,
    pub status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub course: Option<f64>,
}

/// GSA: DOP and active satellites (only the fix type is used)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GsaData {
    pub fix_type: Option<String>,
}

/// GLL: Geographic position, latitude/longitude
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GllData {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_utc: Option<String>,
    pub status: Option<String>,
}

/// A recognized sentence with its parsed payload
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(GgaData),
    Rmc(RmcData),
    Gsa(GsaData),
    Gll(GllData),
}

impl Sentence {
    pub fn kind(&self) -> SentenceKind {
        match self {
            Sentence::Gga(_) => SentenceKind::Gga,
            Sentence::Rmc(_) => SentenceKind::Rmc,
            Sentence::Gsa(_) => SentenceKind::Gsa,
            Sentence::Gll(_) => SentenceKind::Gll,
        }
    }
}

/// Most recent fix indicators, one per sentence family.
///
/// Unlike [`FixRecord`] fields these are replaced by every sentence that
/// carries them, since validity depends on the latest receiver status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixIndicators {
    pub fix_status: Option<String>, // GGA fix quality digit
    pub status: Option<String>,     // RMC/GLL 'A' or 'V'
    pub fix_type: Option<String>,   // GSA fix type digit
    pub truncated_gga: bool,        // latest GGA had too few fields
}

impl FixIndicators {
    /// Record a GGA too short to parse. Its fix status is dropped and no fix
    /// counts as valid until a complete GGA arrives.
    pub fn mark_truncated_gga(&mut self) {
        self.fix_status = None;
        self.truncated_gga = true;
    }
}

type ParseFn = fn(&[&str]) -> Sentence;

/// Sentence type, minimum number of comma-delimited fields, parser
const PARSERS: &[(&str, usize, SentenceKind, ParseFn)] = &[
    ("GGA", 10, SentenceKind::Gga, parse_gga),
    ("RMC", 9, SentenceKind::Rmc, parse_rmc),
    ("GSA", 3, SentenceKind::Gsa, parse_gsa),
    ("GLL", 7, SentenceKind::Gll, parse_gll),
];

/// Split `$TTSSS,...` into its sentence type, if the header is well formed
fn sentence_type(header: &str) -> Option<&str> {
    let header = header.strip_prefix(SENTENCE_MARKER)?;
    if header.len() != 5 || !header.is_ascii() {
        return None;
    }
    Some(&header[2..])
}

/// Remove a trailing `*hh` checksum and line terminators
fn strip_checksum(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.rfind('*') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Classify a line by its sentence type without parsing its fields
pub fn classify(line: &str) -> Option<SentenceKind> {
    let header = line.split(',').next()?;
    let kind = sentence_type(header)?;
    PARSERS
        .iter()
        .find(|(name, ..)| *name == kind)
        .map(|(_, _, kind, _)| *kind)
}

/// Parse a single NMEA sentence.
///
/// Returns `None` for lines that are not NMEA sentences, for sentence types
/// the parser does not handle, and for recognized sentences with too few
/// fields.
pub fn parse_sentence(line: &str) -> Option<Sentence> {
    let parts: Vec<&str> = strip_checksum(line.trim()).split(',').collect();
    let kind = sentence_type(parts[0])?;
    let (_, min_fields, _, parse) = PARSERS.iter().find(|(name, ..)| *name == kind)?;
    if parts.len() < *min_fields {
        return None;
    }
    Some(parse(&parts))
}

/// Verify the `*hh` checksum: XOR of every byte between `$` and `*`
pub fn checksum_matches(line: &str) -> bool {
    let line = line.trim();
    let Some(body) = line.strip_prefix(SENTENCE_MARKER) else {
        return false;
    };
    let Some((payload, checksum)) = body.rsplit_once('*') else {
        return false;
    };
    let Ok(expected) = u8::from_str_radix(checksum, 16) else {
        return false;
    };
    payload.bytes().fold(0u8, |acc, b| acc ^ b) == expected
}

/// Convert an NMEA `DDMM.MMMM` / `DDDMM.MMMM` coordinate to signed decimal degrees.
///
/// The degree prefix is two digits for N/S and three for E/W. The result is
/// rounded to six decimal places.
pub fn parse_coordinate(coordinate: &str, direction: &str) -> Option<f64> {
    if coordinate.is_empty() {
        return None;
    }
    let (degrees_len, negative) = match direction.to_ascii_uppercase().as_str() {
        "N" => (2, false),
        "S" => (2, true),
        "E" => (3, false),
        "W" => (3, true),
        _ => return None,
    };

    let degrees: u32 = coordinate.get(..degrees_len)?.parse().ok()?;
    let minutes: f64 = coordinate.get(degrees_len..)?.parse().ok()?;
    if !minutes.is_finite() {
        return None;
    }

    let mut decimal = degrees as f64 + minutes / 60.0;
    if negative {
        decimal = -decimal;
    }
    format!("{:.6}", decimal).parse().ok()
}

fn text(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

fn number<T: std::str::FromStr>(field: &str) -> Option<T> {
    field.parse().ok()
}

fn parse_gga(parts: &[&str]) -> Sentence {
    Sentence::Gga(GgaData {
        time_utc: text(parts[1]),
        latitude: parse_coordinate(parts[2], parts[3]),
        longitude: parse_coordinate(parts[4], parts[5]),
        fix_status: text(parts[6]),
        satellites: number(parts[7]),
        altitude: text(parts[9]),
    })
}

fn parse_rmc(parts: &[&str]) -> Sentence {
    Sentence::Rmc(RmcData {
        time_utc: text(parts[1]),
        status: text(parts[2]),
        latitude: parse_coordinate(parts[3], parts[4]),
        longitude: parse_coordinate(parts[5], parts[6]),
        speed_knots: number(parts[7]),
        course: number(parts[8]),
    })
}

fn parse_gsa(parts: &[&str]) -> Sentence {
    Sentence::Gsa(GsaData {
        fix_type: text(parts[2]),
    })
}

fn parse_gll(parts: &[&str]) -> Sentence {
    Sentence::Gll(GllData {
        latitude: parse_coordinate(parts[1], parts[2]),
        longitude: parse_coordinate(parts[3], parts[4]),
        time_utc: text(parts[5]),
        status: text(parts[6]),
    })
}

fn update_indicator(slot: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

/// Merge a parsed sentence into the record (first write wins) and refresh
/// the latest fix indicators
pub fn apply_sentence(record: &mut FixRecord, indicators: &mut FixIndicators, sentence: Sentence) {
    match sentence {
        Sentence::Gga(gga) => {
            set_if_absent(&mut record.time_utc, gga.time_utc);
            set_if_absent(&mut record.latitude, gga.latitude);
            set_if_absent(&mut record.longitude, gga.longitude);
            set_if_absent(&mut record.satellites, gga.satellites);
            set_if_absent(&mut record.altitude, gga.altitude);
            update_indicator(&mut indicators.fix_status, &gga.fix_status);
            indicators.truncated_gga = false;
        }
        Sentence::Rmc(rmc) => {
            set_if_absent(&mut record.time_utc, rmc.time_utc);
            set_if_absent(&mut record.latitude, rmc.latitude);
            set_if_absent(&mut record.longitude, rmc.longitude);
            set_if_absent(&mut record.speed_knots, rmc.speed_knots);
            set_if_absent(&mut record.course, rmc.course);
            update_indicator(&mut indicators.status, &rmc.status);
        }
        Sentence::Gsa(gsa) => {
            update_indicator(&mut indicators.fix_type, &gsa.fix_type);
            set_if_absent(&mut record.fix_type, gsa.fix_type);
        }
        Sentence::Gll(gll) => {
            set_if_absent(&mut record.latitude, gll.latitude);
            set_if_absent(&mut record.longitude, gll.longitude);
            set_if_absent(&mut record.time_utc, gll.time_utc);
            update_indicator(&mut indicators.status, &gll.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    #[test]
    fn test_coordinate_conversion() {
        assert_eq!(parse_coordinate("4807.038", "N"), Some(48.117300));
        assert_eq!(parse_coordinate("01131.000", "E"), Some(11.516667));
    }

    #[test]
    fn test_southern_and_western_hemispheres_negate() {
        assert_eq!(parse_coordinate("4807.038", "S"), Some(-48.117300));
        assert_eq!(parse_coordinate("01131.000", "W"), Some(-11.516667));
        assert_eq!(parse_coordinate("3352.128", "s"), parse_coordinate("3352.128", "N").map(|v| -v));
    }

    #[test]
    fn test_coordinate_failures_produce_nothing() {
        assert_eq!(parse_coordinate("", "N"), None);
        assert_eq!(parse_coordinate("4807.038", ""), None);
        assert_eq!(parse_coordinate("48O7.038", "N"), None);
        assert_eq!(parse_coordinate("4", "N"), None);
        assert_eq!(parse_coordinate("48", "N"), None);
        assert_eq!(parse_coordinate("4807.038", "X"), None);
    }

    #[test]
    fn test_gga_parsing() {
        let sentence = parse_sentence(GGA).unwrap();
        assert_eq!(
            sentence,
            Sentence::Gga(GgaData {
                time_utc: Some("123519".to_string()),
                latitude: Some(48.1173),
                longitude: Some(11.516667),
                fix_status: Some("1".to_string()),
                satellites: Some(8),
                altitude: Some("545.4".to_string()),
            })
        );
    }

    #[test]
    fn test_any_talker_is_accepted() {
        let gngga = GGA.replacen("$GP", "$GN", 1);
        assert_eq!(classify(&gngga), Some(SentenceKind::Gga));
        assert!(matches!(parse_sentence(&gngga), Some(Sentence::Gga(_))));
    }

    #[test]
    fn test_rmc_parsing() {
        match parse_sentence(RMC) {
            Some(Sentence::Rmc(rmc)) => {
                assert_eq!(rmc.status.as_deref(), Some("A"));
                assert_eq!(rmc.latitude, Some(48.1173));
                assert_eq!(rmc.speed_knots, Some(22.4));
                assert_eq!(rmc.course, Some(84.4));
            }
            other => panic!("expected RMC, got {:?}", other),
        }
    }

    #[test]
    fn test_gsa_and_gll_parsing() {
        let gsa = parse_sentence("$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39").unwrap();
        assert_eq!(gsa, Sentence::Gsa(GsaData { fix_type: Some("3".to_string()) }));

        let gll = parse_sentence("$GPGLL,4916.45,N,12311.12,W,225444,A,*1D").unwrap();
        assert_eq!(
            gll,
            Sentence::Gll(GllData {
                latitude: Some(49.274167),
                longitude: Some(-123.185333),
                time_utc: Some("225444".to_string()),
                status: Some("A".to_string()),
            })
        );
    }

    #[test]
    fn test_short_sentences_are_dropped() {
        assert_eq!(parse_sentence("$GPGGA,invalid,data,,,,"), None);
        assert_eq!(parse_sentence("$GPRMC,123519,A,4807.038,N"), None);
        assert_eq!(parse_sentence("$GPGSA,A"), None);
    }

    #[test]
    fn test_unknown_sentences_are_ignored() {
        assert_eq!(parse_sentence("$GPGSV,3,1,12,01,40,083,46*75"), None);
        assert_eq!(parse_sentence("$PQXFI,1,2,3"), None);
        assert_eq!(parse_sentence("garbage"), None);
        assert_eq!(parse_sentence(""), None);
        assert_eq!(classify("$GPGSV,3,1,12"), None);
    }

    #[test]
    fn test_checksum() {
        assert!(checksum_matches(GGA));
        assert!(checksum_matches(RMC));
        assert!(!checksum_matches(&GGA.replace("*47", "*48")));
        assert!(!checksum_matches("$GPGGA,123519,4807.038,N"));
        assert!(!checksum_matches("GPGGA,123519*47"));
    }

    #[test]
    fn test_apply_is_first_write_wins() {
        let mut record = FixRecord::new();
        let mut indicators = FixIndicators::default();

        apply_sentence(&mut record, &mut indicators, parse_sentence(GGA).unwrap());
        let later = "$GPGGA,130000,5000.000,N,00900.000,E,2,10,0.8,600.0,M,46.9,M,,*47";
        apply_sentence(&mut record, &mut indicators, parse_sentence(later).unwrap());

        assert_eq!(record.latitude, Some(48.1173));
        assert_eq!(record.longitude, Some(11.516667));
        assert_eq!(record.altitude.as_deref(), Some("545.4"));
        assert_eq!(record.time_utc.as_deref(), Some("123519"));
        // Indicators follow the latest sentence
        assert_eq!(indicators.fix_status.as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_fields_do_not_lock_values() {
        let mut record = FixRecord::new();
        let mut indicators = FixIndicators::default();

        let no_fix = "$GPGGA,123519,,,,,0,00,,,M,,M,,*6B";
        apply_sentence(&mut record, &mut indicators, parse_sentence(no_fix).unwrap());
        assert_eq!(record.latitude, None);
        assert_eq!(record.altitude, None);
        assert_eq!(indicators.fix_status.as_deref(), Some("0"));

        apply_sentence(&mut record, &mut indicators, parse_sentence(GGA).unwrap());
        assert_eq!(record.latitude, Some(48.1173));
        assert_eq!(record.altitude.as_deref(), Some("545.4"));
        assert_eq!(indicators.fix_status.as_deref(), Some("1"));
    }
}
