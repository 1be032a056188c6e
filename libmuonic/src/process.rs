use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, Sender};
use time::{Duration, OffsetDateTime};

use super::config::Config;
use super::decay_trigger::DecayTrigger;
use super::error::{ConfigError, ProcessorError};
use super::file_writer::{EventWriter, PulseWriter, RateWriter};
use super::pulse::PulseSet;
use super::pulse_extractor::PulseExtractor;
use super::rate_sampler::RateSampler;
use super::record::{CountRecord, DaqRecord, PressureRecord};
use super::velocity_trigger::VelocityTrigger;
use super::worker_status::{Stage, WorkerStatus};

const PROGRESS_STEP: f32 = 0.01;

/// A raw DAQ message and the wall clock time it was received at
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    pub received_at: OffsetDateTime,
    pub message: String,
}

impl TimedLine {
    /// Split an optional `<unix seconds>\t` prefix off a recorded line.
    /// Lines without a prefix are stamped with `fallback`.
    pub fn parse(raw: &str, fallback: OffsetDateTime) -> Self {
        let raw = raw.trim_end_matches(&['\r', '\n'][..]);
        if let Some((stamp, message)) = raw.split_once('\t') {
            if let Some(received_at) = unix_time(stamp) {
                return Self {
                    received_at,
                    message: message.to_string(),
                };
            }
        }
        Self {
            received_at: fallback,
            message: raw.to_string(),
        }
    }
}

fn unix_time(stamp: &str) -> Option<OffsetDateTime> {
    let seconds: f64 = stamp.trim().parse().ok()?;
    let since_epoch = Duration::checked_seconds_f64(seconds)?;
    OffsetDateTime::UNIX_EPOCH.checked_add(since_epoch)
}

/// Status records routed to the rate consumer
#[derive(Debug, Clone, Copy, PartialEq)]
enum SensorMessage {
    Counts(CountRecord, OffsetDateTime),
    Temperature(f64),
    Pressure(PressureRecord),
}

/// Totals of one processed measurement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub lines_read: u64,
    /// Malformed data lines
    pub lines_dropped: u64,
    /// Malformed status records
    pub records_dropped: u64,
    pub pulse_sets: u64,
    pub decays: u64,
    pub flight_times: u64,
    pub rate_samples: u64,
    /// Last counter frequency estimate in Hz
    pub frequency: f64,
    /// Span between the first and the last message
    pub duration: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!(
            "Read {} lines ({} data lines and {} records dropped) spanning {:.1} s",
            self.lines_read,
            self.lines_dropped,
            self.records_dropped,
            self.duration.as_seconds_f64()
        );
        log::info!(
            "Extracted {} pulse sets, {} decays, {} flight times and {} rate samples",
            self.pulse_sets,
            self.decays,
            self.flight_times,
            self.rate_samples
        );
        log::info!("Final counter frequency: {:.1} Hz", self.frequency);
    }
}

#[derive(Debug, Default)]
struct PulseTally {
    pulse_sets: u64,
    decays: u64,
    flight_times: u64,
    lines_dropped: u64,
    frequency: f64,
}

/// Feeds data lines through the extractor, the triggers and the writers
struct PulseConsumer {
    extractor: PulseExtractor,
    decay: Option<DecayTrigger>,
    velocity: Option<VelocityTrigger>,
    pulse_writer: Option<PulseWriter>,
    event_writer: Option<EventWriter>,
    decays: u64,
    flight_times: u64,
}

impl PulseConsumer {
    fn new(config: &Config) -> Result<Self, ProcessorError> {
        Ok(Self {
            extractor: PulseExtractor::new(config.extraction.clone()),
            decay: config.decay_trigger.clone().map(DecayTrigger::new),
            velocity: config.velocity_trigger.clone().map(VelocityTrigger::new),
            pulse_writer: config.pulse_path.as_deref().map(PulseWriter::new).transpose()?,
            event_writer: config.event_path.as_deref().map(EventWriter::new).transpose()?,
            decays: 0,
            flight_times: 0,
        })
    }

    fn accept(&mut self, pulses: PulseSet) -> Result<(), ProcessorError> {
        if let Some(writer) = self.pulse_writer.as_mut() {
            writer.write_pulses(&pulses)?;
        }
        if let Some(event) = self.decay.as_ref().and_then(|d| d.trigger(&pulses)) {
            log::info!("Muon decay with decay time {:.3} ns", event.decay_time);
            self.decays += 1;
            if let Some(writer) = self.event_writer.as_mut() {
                writer.write_decay(&event)?;
            }
        }
        if let Some(event) = self.velocity.as_ref().and_then(|v| v.trigger(&pulses)) {
            log::info!("Flight time {:.3} ns", event.flight_time);
            self.flight_times += 1;
            if let Some(writer) = self.event_writer.as_mut() {
                writer.write_flight_time(&event)?;
            }
        }
        Ok(())
    }

    fn run(
        mut self,
        rx: Receiver<TimedLine>,
        flush_final_window: bool,
    ) -> Result<PulseTally, ProcessorError> {
        let mut last_seen = None;
        for line in rx {
            last_seen = Some(line.received_at);
            if let Some(pulses) = self
                .extractor
                .process_line_at(&line.message, line.received_at)
            {
                self.accept(pulses)?;
            }
        }

        if flush_final_window {
            let wall_clock = last_seen.unwrap_or_else(OffsetDateTime::now_utc);
            if let Some(pulses) = self.extractor.flush(wall_clock) {
                self.accept(pulses)?;
            }
        } else if self.extractor.is_accumulating() {
            log::info!("Discarding the last open trigger window");
        }

        if let Some(writer) = self.pulse_writer.take() {
            writer.close()?;
        }
        if let Some(writer) = self.event_writer.take() {
            writer.close()?;
        }
        Ok(PulseTally {
            pulse_sets: self.extractor.pulse_sets_emitted(),
            decays: self.decays,
            flight_times: self.flight_times,
            lines_dropped: self.extractor.lines_dropped(),
            frequency: self.extractor.frequency(),
        })
    }
}

fn consume_sensors(
    config: &Config,
    interval: Duration,
    rx: Receiver<SensorMessage>,
) -> Result<u64, ProcessorError> {
    let mut sampler = RateSampler::new(interval);
    let mut writer = config.rate_path.as_deref().map(RateWriter::new).transpose()?;
    let mut samples = 0;
    for message in rx {
        match message {
            SensorMessage::Counts(counts, at) => {
                if let Some(sample) = sampler.observe_counts(counts, at) {
                    samples += 1;
                    if let Some(writer) = writer.as_mut() {
                        writer.write_sample(&sample)?;
                    }
                }
            }
            SensorMessage::Temperature(temperature) => sampler.observe_temperature(temperature),
            SensorMessage::Pressure(pressure) => sampler.observe_pressure(pressure),
        }
    }
    if let Some(writer) = writer {
        writer.close()?;
    }
    Ok(samples)
}

/// Read the input stream and route every message to its consumer.
///
/// The senders are consumed, so returning closes both channels.
fn read_input<R: BufRead>(
    reader: &mut R,
    total_size: u64,
    pulses: Sender<TimedLine>,
    sensors: Sender<SensorMessage>,
    tx: &Sender<WorkerStatus>,
    summary: &mut RunSummary,
) -> Result<(), ProcessorError> {
    let flush_val = (total_size as f64 * PROGRESS_STEP as f64) as u64;
    let mut count: u64 = 0;
    let mut progress: f32 = 0.0;
    let mut first_seen: Option<OffsetDateTime> = None;
    let mut last_seen: Option<OffsetDateTime> = None;
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        let n_bytes = reader.read_until(b'\n', &mut buffer)?;
        if n_bytes == 0 {
            break;
        }
        count += n_bytes as u64;
        if count > flush_val {
            count = 0;
            progress += PROGRESS_STEP;
            tx.send(WorkerStatus::new(
                progress.min(1.0),
                summary.lines_read,
                Stage::Reading,
            ))?;
        }

        let raw = String::from_utf8_lossy(&buffer);
        if raw.trim().is_empty() {
            continue;
        }
        let line = TimedLine::parse(&raw, OffsetDateTime::now_utc());
        summary.lines_read += 1;
        first_seen.get_or_insert(line.received_at);
        last_seen = Some(line.received_at);

        let route = match DaqRecord::classify(&line.message) {
            Ok(DaqRecord::Data(_)) => None,
            Ok(DaqRecord::Counts(counts)) => {
                Some(SensorMessage::Counts(counts, line.received_at))
            }
            Ok(DaqRecord::Temperature(record)) => {
                Some(SensorMessage::Temperature(record.temperature))
            }
            Ok(DaqRecord::Pressure(record)) => Some(SensorMessage::Pressure(record)),
            Ok(DaqRecord::Control) => {
                log::debug!("Counter control echo {:?}", line.message);
                continue;
            }
            Err(e) => {
                log::warn!("Dropping status record: {e}");
                summary.records_dropped += 1;
                continue;
            }
        };
        match route {
            Some(message) => sensors
                .send(message)
                .map_err(|_| ProcessorError::ConsumerHungUp("sensor"))?,
            None => pulses
                .send(line)
                .map_err(|_| ProcessorError::ConsumerHungUp("pulse"))?,
        }
    }

    if let (Some(first), Some(last)) = (first_seen, last_seen) {
        summary.duration = last - first;
    }
    Ok(())
}

/// The main loop of muonic.
///
/// Reads the recorded DAQ stream of the config, extracts pulses and rates on
/// two consumer threads and writes whichever outputs are configured.
pub fn process_run(
    config: &Config,
    tx: &Sender<WorkerStatus>,
) -> Result<RunSummary, ProcessorError> {
    let input_path = config.input_path.as_path();
    if !input_path.exists() {
        return Err(ProcessorError::BadInputPath(input_path.to_path_buf()));
    }
    let total_size = std::fs::metadata(input_path)?.len();
    log::info!(
        "Processing {} with total size: {}",
        input_path.to_string_lossy(),
        human_bytes::human_bytes(total_size as f64)
    );
    let interval = Duration::checked_seconds_f64(config.rate_interval_secs).ok_or(
        ConfigError::InvalidValue {
            name: "rate_interval_secs",
            reason: String::from("out of range"),
        },
    )?;
    let mut reader = BufReader::new(File::open(input_path)?);

    let (pulse_tx, pulse_rx) = mpsc::channel::<TimedLine>();
    let (sensor_tx, sensor_rx) = mpsc::channel::<SensorMessage>();
    let mut summary = RunSummary::default();
    tx.send(WorkerStatus::new(0.0, 0, Stage::Reading))?;

    let (read_result, pulse_result, sensor_result) = std::thread::scope(|s| {
        let pulse_handle = s.spawn(move || -> Result<PulseTally, ProcessorError> {
            PulseConsumer::new(config)?.run(pulse_rx, config.flush_final_window)
        });
        let sensor_handle = s.spawn(move || consume_sensors(config, interval, sensor_rx));
        let read_result =
            read_input(&mut reader, total_size, pulse_tx, sensor_tx, tx, &mut summary);
        let read_result = read_result.and_then(|()| {
            tx.send(WorkerStatus::new(1.0, summary.lines_read, Stage::Flushing))?;
            Ok(())
        });
        (read_result, pulse_handle.join(), sensor_handle.join())
    });

    // A consumer failure is the root cause of a hung up channel
    let tally = pulse_result.map_err(|_| ProcessorError::ConsumerPanicked("pulse"))??;
    let rate_samples = sensor_result.map_err(|_| ProcessorError::ConsumerPanicked("sensor"))??;
    read_result?;

    summary.lines_dropped = tally.lines_dropped;
    summary.pulse_sets = tally.pulse_sets;
    summary.decays = tally.decays;
    summary.flight_times = tally.flight_times;
    summary.frequency = tally.frequency;
    summary.rate_samples = rate_samples;
    tx.send(WorkerStatus::new(1.0, summary.lines_read, Stage::Done))?;
    Ok(summary)
}

/// The function to be called by a separate thread (typically the UI).
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<RunSummary, ProcessorError> {
    log::info!("Starting measurement from {}", config.input_path.to_string_lossy());
    let summary = process_run(&config, &tx)?;
    summary.log();
    log::info!("Finished measurement.");
    Ok(summary)
}
