use bitvec::prelude::*;
use time::Time;

use super::constants::*;
use super::edge::has_trigger_flag;
use super::error::DaqLineError;

/// Raw rising and falling edge bytes of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeBytes {
    pub rising: u8,
    pub falling: u8,
}

/// GPS time of day as sent by the card (`HHMMSS.mmm`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsTimeOfDay {
    raw: String,
    time: Time,
}

impl GpsTimeOfDay {
    pub fn parse(raw: &str) -> Result<Self, DaqLineError> {
        let bad = || DaqLineError::BadGpsTime(raw.to_string());
        let (hms, millis) = raw.split_once('.').ok_or_else(bad)?;
        if hms.len() != 6 || !hms.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let hour: u8 = hms[0..2].parse().map_err(|_| bad())?;
        let minute: u8 = hms[2..4].parse().map_err(|_| bad())?;
        let second: u8 = hms[4..6].parse().map_err(|_| bad())?;
        let milli: u16 = millis.parse().map_err(|_| bad())?;
        let time = Time::from_hms_milli(hour, minute, second, milli).map_err(|_| bad())?;
        Ok(Self {
            raw: raw.to_string(),
            time,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Seconds since the start of the (GPS) day
    pub fn seconds_of_day(&self) -> f64 {
        let (h, m, s, milli) = self.time.as_hms_milli();
        h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + milli as f64 / 1000.0
    }
}

/// Decoded DAQ status byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaqStatus(pub u8);

impl DaqStatus {
    fn bit(&self, n: usize) -> bool {
        self.0.view_bits::<Lsb0>()[n]
    }

    pub fn one_pps_pending(&self) -> bool {
        self.bit(STATUS_PPS_PENDING_BIT)
    }

    pub fn trigger_pending(&self) -> bool {
        self.bit(STATUS_TRIGGER_PENDING_BIT)
    }

    pub fn gps_possibly_corrupt(&self) -> bool {
        self.bit(STATUS_GPS_CORRUPT_BIT)
    }

    pub fn one_pps_rate_out_of_range(&self) -> bool {
        self.bit(STATUS_PPS_RATE_BIT)
    }
}

/// One pulse data line of the DAQ card, split into typed fields.
///
/// Layout (whitespace separated):
///
/// ```text
/// 0         1    2    3    4    5    6    7    8    9         10         11     12 13 14 15
/// trg_count re0  fe0  re1  fe1  re2  fe2  re3  fe3  one_pps   HHMMSS.mmm DDMMYY A  08 0  +0056
/// ```
///
/// Fields 11 through 14 are optional extras; a line with 10 or more fields
/// but without the GPS time (10) or correction (15) can not be timed and is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct DaqLine {
    pub trigger_count: u32,
    pub edges: [EdgeBytes; NUMBER_OF_CHANNELS],
    pub one_pps: u32,
    pub gps_time: GpsTimeOfDay,
    /// Sub-second correction of the GPS time, in ms
    pub correction: i32,
    pub gps_date: Option<String>,
    pub gps_valid: Option<bool>,
    pub satellites: Option<u8>,
    pub status: Option<DaqStatus>,
}

impl DaqLine {
    /// Parse a raw line.
    ///
    /// Returns `Ok(None)` for lines which are too short to be pulse data. These
    /// are not errors, the card mixes other messages into the stream.
    pub fn parse(line: &str) -> Result<Option<Self>, DaqLineError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_DATA_FIELDS {
            return Ok(None);
        }

        let trigger_count = parse_hex_u32(&fields, 0)?;
        let one_pps = parse_hex_u32(&fields, 9)?;
        let mut edges = [EdgeBytes::default(); NUMBER_OF_CHANNELS];
        for (ch, edge) in edges.iter_mut().enumerate() {
            edge.rising = parse_hex_u8(&fields, 1 + 2 * ch)?;
            edge.falling = parse_hex_u8(&fields, 2 + 2 * ch)?;
        }

        let gps_time = GpsTimeOfDay::parse(field(&fields, GPS_TIME_FIELD)?)?;
        let correction_str = field(&fields, CORRECTION_FIELD)?;
        let correction = correction_str
            .parse::<i32>()
            .map_err(|_| DaqLineError::BadCorrection(correction_str.to_string()))?;

        Ok(Some(Self {
            trigger_count,
            edges,
            one_pps,
            gps_time,
            correction,
            gps_date: fields.get(GPS_DATE_FIELD).map(|s| s.to_string()),
            gps_valid: fields.get(GPS_VALID_FIELD).and_then(|s| match *s {
                "A" => Some(true),
                "V" => Some(false),
                _ => None,
            }),
            satellites: fields.get(SATELLITES_FIELD).and_then(|s| s.parse().ok()),
            status: fields
                .get(STATUS_FIELD)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map(DaqStatus),
        }))
    }

    /// Bit 7 of channel 0's rising edge byte opens a new trigger window
    pub fn is_trigger(&self) -> bool {
        has_trigger_flag(self.edges[0].rising)
    }

    /// GPS time of the last 1-PPS pulse in seconds of day, including the correction
    pub fn gps_seconds(&self) -> f64 {
        self.gps_time.seconds_of_day() + self.correction as f64 / 1000.0
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str, DaqLineError> {
    fields
        .get(index)
        .copied()
        .ok_or(DaqLineError::MissingField(index))
}

fn parse_hex_u32(fields: &[&str], index: usize) -> Result<u32, DaqLineError> {
    let token = field(fields, index)?;
    u32::from_str_radix(token, 16).map_err(|source| DaqLineError::BadHex {
        field: index,
        token: token.to_string(),
        source,
    })
}

fn parse_hex_u8(fields: &[&str], index: usize) -> Result<u8, DaqLineError> {
    let token = field(fields, index)?;
    u8::from_str_radix(token, 16).map_err(|source| DaqLineError::BadHex {
        field: index,
        token: token.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "80EE0049 A4 00 24 3A 00 00 00 00 80EC8A1C 213647.216 231013 A 08 0 +0056";

    #[test]
    fn test_parse_full_line() {
        let line = DaqLine::parse(LINE).unwrap().unwrap();
        assert_eq!(line.trigger_count, 0x80EE0049);
        assert_eq!(line.one_pps, 0x80EC8A1C);
        assert_eq!(line.edges[0], EdgeBytes { rising: 0xA4, falling: 0x00 });
        assert_eq!(line.edges[1], EdgeBytes { rising: 0x24, falling: 0x3A });
        assert!(line.is_trigger());
        assert_eq!(line.gps_time.as_str(), "213647.216");
        assert_eq!(line.correction, 56);
        assert_eq!(line.gps_date.as_deref(), Some("231013"));
        assert_eq!(line.gps_valid, Some(true));
        assert_eq!(line.satellites, Some(8));
        assert_eq!(line.status, Some(DaqStatus(0)));
        let expected = 21.0 * 3600.0 + 36.0 * 60.0 + 47.0 + 0.216 + 0.056;
        assert!((line.gps_seconds() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_short_lines_are_no_event() {
        assert_eq!(DaqLine::parse(""), Ok(None));
        assert_eq!(DaqLine::parse("DS S0=00000000 S1=00000000"), Ok(None));
        assert_eq!(DaqLine::parse("80EE0049 A4 00 24 3A 00 00 00 00"), Ok(None));
    }

    #[test]
    fn test_malformed_lines() {
        let bad_hex = LINE.replacen("A4", "G4", 1);
        assert!(matches!(
            DaqLine::parse(&bad_hex),
            Err(DaqLineError::BadHex { field: 1, .. })
        ));

        let no_correction = "80EE0049 A4 00 24 3A 00 00 00 00 80EC8A1C 213647.216 231013";
        assert_eq!(
            DaqLine::parse(no_correction),
            Err(DaqLineError::MissingField(CORRECTION_FIELD))
        );

        let bad_time = LINE.replace("213647.216", "256147.216");
        assert!(matches!(
            DaqLine::parse(&bad_time),
            Err(DaqLineError::BadGpsTime(_))
        ));
    }

    #[test]
    fn test_status_flags() {
        let status = DaqStatus(0b1010);
        assert!(!status.one_pps_pending());
        assert!(status.trigger_pending());
        assert!(!status.gps_possibly_corrupt());
        assert!(status.one_pps_rate_out_of_range());
    }

    #[test]
    fn test_lowercase_hex() {
        let line = DaqLine::parse(&LINE.to_lowercase()).unwrap().unwrap();
        assert_eq!(line.trigger_count, 0x80EE0049);
        assert_eq!(line.gps_valid, None);
    }
}
