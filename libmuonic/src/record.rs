use super::constants::NUMBER_OF_CHANNELS;
use super::error::RecordError;

const SCALER_TOKEN_LEN: usize = 11; // "S0=" + 8 hex digits
const NUMBER_OF_SCALERS: usize = 6;

/// Scaler readout of the card.
///
/// Format: `DS S0=00000000 S1=00000000 S2=00000000 S3=00000000 S4=00000000 S5=18531FFD`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRecord {
    pub channels: [u32; NUMBER_OF_CHANNELS],
    pub trigger: u32,
    pub time: u32,
}

impl CountRecord {
    pub fn parse(msg: &str) -> Result<Self, RecordError> {
        let mut scalers: [Option<u32>; NUMBER_OF_SCALERS] = [None; NUMBER_OF_SCALERS];
        for item in msg.split_whitespace().skip(1) {
            if item.len() != SCALER_TOKEN_LEN {
                continue;
            }
            let Some((name, value)) = item.split_once('=') else {
                continue;
            };
            let index = match name.strip_prefix('S').and_then(|n| n.parse::<usize>().ok()) {
                Some(i) if i < NUMBER_OF_SCALERS => i,
                _ => continue,
            };
            let value = u32::from_str_radix(value, 16)
                .map_err(|_| RecordError::BadScaler(item.to_string()))?;
            scalers[index] = Some(value);
        }

        let get = |i: usize| scalers[i].ok_or_else(|| RecordError::MissingScaler(msg.to_string(), i));
        Ok(Self {
            channels: [get(0)?, get(1)?, get(2)?, get(3)?],
            trigger: get(4)?,
            time: get(5)?,
        })
    }
}

/// Temperature readout, `TH TH=22.2`, in °C
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRecord {
    pub temperature: f64,
}

impl TemperatureRecord {
    pub fn parse(msg: &str) -> Result<Self, RecordError> {
        msg.split_once('=')
            .and_then(|(_, value)| value.trim().parse().ok())
            .map(|temperature| Self { temperature })
            .ok_or_else(|| RecordError::BadTemperature(msg.to_string()))
    }
}

/// Barometer readout, either raw counts (`BA 1495`) or calibrated
/// (`mBar now reads  = 1015.0  (use cmd 'SA' when done)`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressureRecord {
    Raw(u32),
    MilliBar(f64),
}

impl PressureRecord {
    pub fn parse(msg: &str) -> Result<Self, RecordError> {
        let bad = || RecordError::BadPressure(msg.to_string());
        let fields: Vec<&str> = msg.split_whitespace().collect();
        match fields.first() {
            Some(&"BA") => fields
                .get(1)
                .and_then(|v| v.parse().ok())
                .map(Self::Raw)
                .ok_or_else(bad),
            Some(&"mBar") => fields
                .get(4)
                .and_then(|v| v.parse().ok())
                .map(Self::MilliBar)
                .ok_or_else(bad),
            _ => Err(bad()),
        }
    }
}

/// Any message coming out of the DAQ card
#[derive(Debug, Clone, PartialEq)]
pub enum DaqRecord<'a> {
    Counts(CountRecord),
    Temperature(TemperatureRecord),
    Pressure(PressureRecord),
    /// Echo of a counter enable/disable command
    Control,
    /// Everything else goes to the pulse extraction
    Data(&'a str),
}

impl<'a> DaqRecord<'a> {
    /// Route a message by its first token.
    ///
    /// Matching the whole token keeps data lines whose hex trigger counter
    /// happens to start with `BA` out of the pressure path.
    pub fn classify(msg: &'a str) -> Result<Self, RecordError> {
        let first = msg.split_whitespace().next().unwrap_or("");
        match first {
            "DS" => Ok(Self::Counts(CountRecord::parse(msg)?)),
            "TH" => Ok(Self::Temperature(TemperatureRecord::parse(msg)?)),
            "BA" | "mBar" => Ok(Self::Pressure(PressureRecord::parse(msg)?)),
            "CD" | "CE" => Ok(Self::Control),
            _ => Ok(Self::Data(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_record() {
        let rec = CountRecord::parse(
            "DS S0=00000010 S1=0000000A S2=00000000 S3=FFFFFFFF S4=00000002 S5=18531FFD",
        )
        .unwrap();
        assert_eq!(rec.channels, [16, 10, 0, 0xFFFF_FFFF]);
        assert_eq!(rec.trigger, 2);
        assert_eq!(rec.time, 0x18531FFD);

        assert!(matches!(
            CountRecord::parse("DS S0=00000010 S1=0000000A"),
            Err(RecordError::MissingScaler(_, 2))
        ));
        assert!(matches!(
            CountRecord::parse("DS S0=0000001X S1=0000000A"),
            Err(RecordError::BadScaler(_))
        ));
    }

    #[test]
    fn test_sensor_records() {
        assert_eq!(
            TemperatureRecord::parse("TH TH=22.2").unwrap().temperature,
            22.2
        );
        assert!(TemperatureRecord::parse("TH").is_err());
        assert_eq!(PressureRecord::parse("BA 1495").unwrap(), PressureRecord::Raw(1495));
        assert_eq!(
            PressureRecord::parse("mBar now reads  = 1015.0  (use cmd 'SA' when done)").unwrap(),
            PressureRecord::MilliBar(1015.0)
        );
        assert!(PressureRecord::parse("BA").is_err());
    }

    #[test]
    fn test_classify() {
        let data = "BA0E0049 A4 00 24 3A 00 00 00 00 80EC8A1C 213647.216 231013 A 08 0 +0056";
        assert_eq!(DaqRecord::classify(data).unwrap(), DaqRecord::Data(data));
        assert_eq!(DaqRecord::classify("CE").unwrap(), DaqRecord::Control);
        assert!(matches!(
            DaqRecord::classify("TH TH=21.5").unwrap(),
            DaqRecord::Temperature(_)
        ));
        assert!(matches!(
            DaqRecord::classify("BA 1420").unwrap(),
            DaqRecord::Pressure(PressureRecord::Raw(1420))
        ));
        assert!(DaqRecord::classify("DS garbage").is_err());
    }
}
