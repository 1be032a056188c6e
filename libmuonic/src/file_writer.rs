use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

use super::constants::MISSING_SENSOR_VALUE;
use super::decay_trigger::DecayEvent;
use super::error::WriterError;
use super::pulse::PulseSet;
use super::rate_sampler::RateSample;
use super::velocity_trigger::FlightTimeEvent;

const RATE_HEADER: &str = " date | time | R0 | R1 | R2 | R3 | R_trigger | chan0 | chan1 | chan2 | chan3 | trigger | Delta_time | Pressure [mBar] | Temperature [C] ";

fn date_time(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ))
}

fn open_append(path: &Path) -> Result<BufWriter<File>, WriterError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Writes pulse sets to a pulse file, one tuple per line
#[derive(Debug)]
pub struct PulseWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl PulseWriter {
    pub fn new(path: &Path) -> Result<Self, WriterError> {
        log::debug!("Starting to write pulses to {}", path.to_string_lossy());
        Ok(Self {
            path: path.to_path_buf(),
            writer: open_append(path)?,
            written: 0,
        })
    }

    pub fn write_pulses(&mut self, pulses: &PulseSet) -> Result<(), WriterError> {
        writeln!(self.writer, "{pulses}")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn close(mut self) -> Result<(), WriterError> {
        self.writer.flush()?;
        log::info!(
            "Wrote {} pulse sets to {}",
            self.written,
            self.path.to_string_lossy()
        );
        Ok(())
    }
}

/// Writes rate samples as a whitespace separated table
#[derive(Debug)]
pub struct RateWriter {
    writer: BufWriter<File>,
}

impl RateWriter {
    pub fn new(path: &Path) -> Result<Self, WriterError> {
        log::info!("Starting to write rates to {}", path.to_string_lossy());
        let mut writer = open_append(path)?;
        writeln!(writer, "{RATE_HEADER}")?;
        Ok(Self { writer })
    }

    pub fn write_sample(&mut self, sample: &RateSample) -> Result<(), WriterError> {
        let stamp = date_time(sample.at)?;
        write!(self.writer, "{stamp}")?;
        for value in sample
            .channel_rates
            .iter()
            .chain(std::iter::once(&sample.trigger_rate))
        {
            write!(self.writer, " {value:.6}")?;
        }
        for count in sample
            .channel_counts
            .iter()
            .chain(std::iter::once(&sample.trigger_count))
        {
            write!(self.writer, " {:.6}", *count as f64)?;
        }
        writeln!(
            self.writer,
            " {:.6} {:.6} {:.6} ",
            sample.delta_time,
            sample.pressure_mbar.unwrap_or(MISSING_SENSOR_VALUE),
            sample.temperature.unwrap_or(MISSING_SENSOR_VALUE)
        )?;
        Ok(())
    }

    pub fn close(mut self) -> Result<(), WriterError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes accepted decays and flight times
#[derive(Debug)]
pub struct EventWriter {
    writer: BufWriter<File>,
}

impl EventWriter {
    pub fn new(path: &Path) -> Result<Self, WriterError> {
        Ok(Self {
            writer: open_append(path)?,
        })
    }

    fn write_event(&mut self, kind: &str, at: OffsetDateTime, value: f64) -> Result<(), WriterError> {
        let stamp = date_time(at)?;
        writeln!(self.writer, "{kind} {stamp} {value:?}")?;
        Ok(())
    }

    pub fn write_decay(&mut self, event: &DecayEvent) -> Result<(), WriterError> {
        self.write_event("Decay", event.detected_at, event.decay_time)
    }

    pub fn write_flight_time(&mut self, event: &FlightTimeEvent) -> Result<(), WriterError> {
        self.write_event("FlightTime", event.detected_at, event.flight_time)
    }

    pub fn close(mut self) -> Result<(), WriterError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::Pulse;
    use time::macros::datetime;

    #[test]
    fn test_pulse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_P.txt");
        let mut writer = PulseWriter::new(&path).unwrap();
        let set = PulseSet {
            trigger_time: 43200.5,
            channels: [vec![Pulse::new(5.0, 30.0)], vec![], vec![], vec![]],
            wall_clock: datetime!(2023-10-13 12:00:00 UTC),
        };
        writer.write_pulses(&set).unwrap();
        writer.write_pulses(&set).unwrap();
        assert_eq!(writer.written(), 2);
        writer.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "(43200.5, [(5.0, 30.0)], [], [], [], '2023-10-13 12:00:00.000000+00:00')"
        );
    }

    #[test]
    fn test_rate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_R.txt");
        let mut writer = RateWriter::new(&path).unwrap();
        let sample = RateSample {
            at: datetime!(2023-10-13 12:00:05.25 UTC),
            delta_time: 5.0,
            channel_rates: [1.0, 2.0, 3.0, 4.0],
            trigger_rate: 0.5,
            channel_counts: [5, 10, 15, 20],
            trigger_count: 3,
            temperature: Some(21.5),
            pressure_raw: Some(1495),
            pressure_mbar: None,
        };
        writer.write_sample(&sample).unwrap();
        writer.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], RATE_HEADER);
        assert_eq!(
            lines[1],
            "2023-10-13 12:00:05.250 1.000000 2.000000 3.000000 4.000000 0.500000 5.000000 10.000000 15.000000 20.000000 3.000000 5.000000 -999.000000 21.500000 "
        );
    }

    #[test]
    fn test_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_E.txt");
        let mut writer = EventWriter::new(&path).unwrap();
        let at = datetime!(2023-10-13 12:00:00 UTC);
        writer
            .write_decay(&DecayEvent {
                decay_time: 2000.0,
                detected_at: at,
            })
            .unwrap();
        writer
            .write_flight_time(&FlightTimeEvent {
                flight_time: 25.0,
                detected_at: at,
            })
            .unwrap();
        writer.close().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Decay 2023-10-13 12:00:00.000 2000.0\nFlightTime 2023-10-13 12:00:00.000 25.0\n"
        );
    }
}
