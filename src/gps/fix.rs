// src/gps/fix.rs
//! Fix accumulation and validity checking

use super::{
    data::FixRecord,
    nmea::{self, FixIndicators, SentenceKind, SENTENCE_MARKER},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule deciding when an accumulated fix is good enough to return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorMode {
    /// Latest GGA fix status is "1" and a position with altitude is known
    #[default]
    GgaOnly,
    /// Position, altitude and fix type are known, the latest fix type is not
    /// "0" and the latest RMC/GLL status (if any) is "A"
    MultiSentence,
}

impl ValidatorMode {
    pub fn is_satisfied(&self, record: &FixRecord, indicators: &FixIndicators) -> bool {
        if indicators.truncated_gga {
            return false;
        }
        match self {
            ValidatorMode::GgaOnly => {
                indicators.fix_status.as_deref() == Some("1") && record.has_position()
            }
            ValidatorMode::MultiSentence => {
                record.has_position()
                    && record.fix_type.is_some()
                    && indicators.fix_type.as_deref().map_or(false, |t| t != "0")
                    && indicators.status.as_deref().map_or(true, |s| s == "A")
            }
        }
    }
}

impl fmt::Display for ValidatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorMode::GgaOnly => write!(f, "gga-only"),
            ValidatorMode::MultiSentence => write!(f, "multi-sentence"),
        }
    }
}

/// Whether `*hh` checksums are checked before a sentence is parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumPolicy {
    #[default]
    Ignore,
    Verify,
}

/// Accumulates one fix from a stream of sentences
#[derive(Debug, Clone, Default)]
pub struct FixAccumulator {
    record: FixRecord,
    indicators: FixIndicators,
    mode: ValidatorMode,
    checksum: ChecksumPolicy,
}

impl FixAccumulator {
    pub fn new(mode: ValidatorMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_checksum(mut self, checksum: ChecksumPolicy) -> Self {
        self.checksum = checksum;
        self
    }

    /// Feed one line. Returns the kind of sentence whose data was applied,
    /// or `None` when the line contributed nothing.
    pub fn feed(&mut self, line: &str) -> Option<SentenceKind> {
        let line = line.trim();
        if !line.starts_with(SENTENCE_MARKER) {
            return None;
        }
        if self.checksum == ChecksumPolicy::Verify && !nmea::checksum_matches(line) {
            return None;
        }

        let Some(sentence) = nmea::parse_sentence(line) else {
            if nmea::classify(line) == Some(SentenceKind::Gga) {
                self.indicators.mark_truncated_gga();
            }
            return None;
        };
        let kind = sentence.kind();
        nmea::apply_sentence(&mut self.record, &mut self.indicators, sentence);
        Some(kind)
    }

    /// Re-evaluate the validity rule against the current state
    pub fn is_valid(&self) -> bool {
        self.mode.is_satisfied(&self.record, &self.indicators)
    }

    /// Copy of the record with `valid` filled in
    pub fn snapshot(&self) -> FixRecord {
        FixRecord {
            valid: self.is_valid(),
            ..self.record.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GSA: &str = "$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39";

    #[test]
    fn test_single_gga_is_valid() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        assert_eq!(fix.feed(GGA), Some(SentenceKind::Gga));
        assert!(fix.is_valid());

        let record = fix.snapshot();
        assert!(record.valid);
        assert_eq!(record.latitude, Some(48.1173));
        assert_eq!(record.longitude, Some(11.516667));
        assert_eq!(record.altitude.as_deref(), Some("545.4"));
    }

    #[test]
    fn test_gga_with_other_fix_status_is_not_valid() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        fix.feed("$GPGGA,123519,4807.038,N,01131.000,E,2,08,0.9,545.4,M,46.9,M,,*44");
        assert!(!fix.is_valid());
    }

    #[test]
    fn test_gga_without_altitude_is_not_valid() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        fix.feed("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,,M,46.9,M,,*47");
        assert!(!fix.is_valid());
        assert!(fix.snapshot().latitude.is_some());
    }

    #[test]
    fn test_short_gga_is_invalid_and_keeps_prior_fields() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        assert_eq!(fix.feed("$GPGGA,invalid,data,,,,"), None);
        assert!(!fix.is_valid());
        assert_eq!(fix.snapshot(), FixRecord::new());

        fix.feed(GGA);
        assert!(fix.is_valid());
        assert_eq!(fix.feed("$GPGGA,130000,5000.000,N,00900.000"), None);
        assert!(!fix.is_valid());

        let record = fix.snapshot();
        assert!(!record.valid);
        assert_eq!(record.latitude, Some(48.1173));
        assert_eq!(record.longitude, Some(11.516667));
        assert_eq!(record.altitude.as_deref(), Some("545.4"));

        // A complete GGA restores validity
        fix.feed(GGA);
        assert!(fix.is_valid());
    }

    #[test]
    fn test_short_gga_invalidates_multi_sentence_fix() {
        let mut fix = FixAccumulator::new(ValidatorMode::MultiSentence);
        fix.feed(GGA);
        fix.feed(GSA);
        assert!(fix.is_valid());

        fix.feed("$GPGGA,130000");
        assert!(!fix.is_valid());
        assert_eq!(fix.snapshot().fix_type.as_deref(), Some("3"));
    }

    #[test]
    fn test_first_latitude_is_retained() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        fix.feed("$GPGLL,4916.45,N,12311.12,W,225444,A,*1D");
        fix.feed(GGA);

        let record = fix.snapshot();
        assert_eq!(record.latitude, Some(49.274167));
        assert_eq!(record.longitude, Some(-123.185333));
        assert_eq!(record.time_utc.as_deref(), Some("225444"));
    }

    #[test]
    fn test_is_valid_is_idempotent() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        assert_eq!(fix.is_valid(), fix.is_valid());

        fix.feed(GGA);
        assert!(fix.is_valid());
        assert!(fix.is_valid());
        assert_eq!(fix.snapshot(), fix.snapshot());
    }

    #[test]
    fn test_latest_indicator_decides() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        fix.feed(GGA);
        assert!(fix.is_valid());

        fix.feed("$GPGGA,123520,,,,,0,00,,,M,,M,,*63");
        assert!(!fix.is_valid());
        // Position data is untouched by the no-fix sentence
        assert_eq!(fix.snapshot().latitude, Some(48.1173));
    }

    #[test]
    fn test_lines_without_marker_are_skipped() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        assert_eq!(fix.feed(&GGA[1..]), None);
        assert_eq!(fix.feed(""), None);
        assert!(!fix.is_valid());
    }

    #[test]
    fn test_multi_sentence_mode() {
        let mut fix = FixAccumulator::new(ValidatorMode::MultiSentence);
        fix.feed(RMC);
        assert!(!fix.is_valid(), "no altitude or fix type yet");

        fix.feed(GGA);
        assert!(!fix.is_valid(), "no fix type yet");

        fix.feed(GSA);
        assert!(fix.is_valid());

        let record = fix.snapshot();
        assert_eq!(record.fix_type.as_deref(), Some("3"));
        assert_eq!(record.speed_knots, Some(22.4));
        assert_eq!(record.course, Some(84.4));
    }

    #[test]
    fn test_multi_sentence_rejects_void_status_and_zero_fix_type() {
        let mut fix = FixAccumulator::new(ValidatorMode::MultiSentence);
        fix.feed(GGA);
        fix.feed(GSA);
        assert!(fix.is_valid());

        fix.feed("$GPRMC,123520,V,,,,,,,230394,,*33");
        assert!(!fix.is_valid());

        fix.feed(RMC);
        assert!(fix.is_valid());

        fix.feed("$GPGSA,A,0,,,,,,,,,,,,,,,*1E");
        assert!(!fix.is_valid());
    }

    #[test]
    fn test_checksum_verification() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly).with_checksum(ChecksumPolicy::Verify);
        assert_eq!(fix.feed(&GGA.replace("*47", "*00")), None);
        assert!(!fix.is_valid());

        assert_eq!(fix.feed(GGA), Some(SentenceKind::Gga));
        assert!(fix.is_valid());
    }

    #[test]
    fn test_checksum_ignored_by_default() {
        let mut fix = FixAccumulator::new(ValidatorMode::GgaOnly);
        fix.feed(&GGA.replace("*47", "*00"));
        assert!(fix.is_valid());
    }
}
