use time::{Duration, OffsetDateTime};

use super::constants::NUMBER_OF_CHANNELS;
use super::record::{CountRecord, PressureRecord};
use super::rollover::counter_diff;

/// Rates over one sampling interval, together with the latest sensor readings
#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    pub at: OffsetDateTime,
    /// Seconds between the two scaler readouts
    pub delta_time: f64,
    pub channel_rates: [f64; NUMBER_OF_CHANNELS],
    pub trigger_rate: f64,
    pub channel_counts: [u32; NUMBER_OF_CHANNELS],
    pub trigger_count: u32,
    pub temperature: Option<f64>,
    pub pressure_raw: Option<u32>,
    pub pressure_mbar: Option<f64>,
}

/// Turns scaler readouts into channel and trigger rates.
///
/// A sample is produced once at least `interval` has passed since the
/// previous one. Scalers wrap at 32 bits; deltas are rollover corrected.
#[derive(Debug, Clone)]
pub struct RateSampler {
    interval: Duration,
    previous: Option<(CountRecord, OffsetDateTime)>,
    temperature: Option<f64>,
    pressure_raw: Option<u32>,
    pressure_mbar: Option<f64>,
}

impl RateSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            previous: None,
            temperature: None,
            pressure_raw: None,
            pressure_mbar: None,
        }
    }

    pub fn observe_counts(&mut self, counts: CountRecord, at: OffsetDateTime) -> Option<RateSample> {
        let Some((previous, since)) = self.previous else {
            self.previous = Some((counts, at));
            return None;
        };
        let elapsed = at - since;
        if elapsed < self.interval || elapsed <= Duration::ZERO {
            return None;
        }
        let delta_time = elapsed.as_seconds_f64();

        let rate = |prev: u32, cur: u32| counter_diff(prev, cur) as f64 / delta_time;
        let mut channel_rates = [0.0; NUMBER_OF_CHANNELS];
        for (ch, r) in channel_rates.iter_mut().enumerate() {
            *r = rate(previous.channels[ch], counts.channels[ch]);
        }
        let sample = RateSample {
            at,
            delta_time,
            channel_rates,
            trigger_rate: rate(previous.trigger, counts.trigger),
            channel_counts: counts.channels,
            trigger_count: counts.trigger,
            temperature: self.temperature,
            pressure_raw: self.pressure_raw,
            pressure_mbar: self.pressure_mbar,
        };
        self.previous = Some((counts, at));
        log::info!(
            "Rates [Hz] ch0: {:.3} ch1: {:.3} ch2: {:.3} ch3: {:.3} trigger: {:.3}",
            sample.channel_rates[0],
            sample.channel_rates[1],
            sample.channel_rates[2],
            sample.channel_rates[3],
            sample.trigger_rate
        );
        Some(sample)
    }

    pub fn observe_temperature(&mut self, temperature: f64) {
        self.temperature = Some(temperature);
    }

    pub fn observe_pressure(&mut self, pressure: PressureRecord) {
        match pressure {
            PressureRecord::Raw(counts) => self.pressure_raw = Some(counts),
            PressureRecord::MilliBar(mbar) => self.pressure_mbar = Some(mbar),
        }
    }

    /// Forget the previous readout, e.g. after the scalers were reset
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
