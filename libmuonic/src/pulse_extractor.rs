use time::OffsetDateTime;

use super::config::ExtractionConfig;
use super::constants::{COUNTER_ROLLOVER, NS_PER_SECOND, NUMBER_OF_CHANNELS};
use super::daq_line::{DaqLine, EdgeBytes};
use super::edge::EdgeSample;
use super::frequency::FrequencyEstimator;
use super::pulse::{Pulse, PulseSet};
use super::rollover::{counter_diff, RolloverCounter};

/// Rising and falling edge times (ns) of one channel, collected over a trigger window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelAccumulator {
    rising: Vec<f64>,
    falling: Vec<f64>,
}

impl ChannelAccumulator {
    fn record(&mut self, edges: EdgeBytes, counter_diff_ns: f64, tick_size: f64) {
        if let Some(t) = EdgeSample::decode(edges.rising, tick_size).time_in_window(counter_diff_ns) {
            self.rising.push(t);
        }
        if let Some(t) = EdgeSample::decode(edges.falling, tick_size).time_in_window(counter_diff_ns) {
            self.falling.push(t);
        }
    }

    /// Pair every rising edge with the falling edge of the same index.
    ///
    /// Missing falling edges, or ones earlier than their rising edge, are
    /// replaced by a virtual falling edge at the end of the trigger window.
    fn into_pulses(self, max_trigger_window: f64) -> Vec<Pulse> {
        let mut pulses: Vec<Pulse> = self
            .rising
            .iter()
            .enumerate()
            .map(|(idx, &re)| match self.falling.get(idx) {
                Some(&fe) if fe >= re => Pulse::new(re, fe),
                _ => Pulse::with_virtual_falling(re, max_trigger_window),
            })
            .collect();
        pulses.sort_by(|a, b| {
            a.rising
                .total_cmp(&b.rising)
                .then(a.falling.total_cmp(&b.falling))
        });
        pulses
    }
}

/// A trigger window which is still collecting edges
#[derive(Debug, Clone)]
struct TriggerWindow {
    start_count: u64,
    trigger_time: f64,
    accumulators: [ChannelAccumulator; NUMBER_OF_CHANNELS],
}

impl TriggerWindow {
    fn open(start_count: u64, trigger_time: f64) -> Self {
        Self {
            start_count,
            trigger_time,
            accumulators: Default::default(),
        }
    }

    fn record(&mut self, line: &DaqLine, counter_diff_ns: f64, tick_size: f64) {
        for (acc, edges) in self.accumulators.iter_mut().zip(line.edges) {
            acc.record(edges, counter_diff_ns, tick_size);
        }
    }

    fn finalize(self, max_trigger_window: f64, wall_clock: OffsetDateTime) -> PulseSet {
        PulseSet {
            trigger_time: self.trigger_time,
            channels: self
                .accumulators
                .map(|acc| acc.into_pulses(max_trigger_window)),
            wall_clock,
        }
    }
}

#[derive(Debug, Clone)]
enum ExtractorState {
    AwaitingFirstTrigger,
    Accumulating(TriggerWindow),
}

/// PulseExtractor takes DAQ data lines and composes them into PulseSets.
///
/// A trigger window starts with a line carrying the trigger flag and collects
/// the edges of all following lines until the next flagged line. Only then is
/// the window known to be complete, so every PulseSet is emitted one window
/// late. The last open window is only emitted by an explicit [`flush`](Self::flush).
///
/// Lines must be fed in arrival order; rollover detection and window
/// boundaries depend on it.
#[derive(Debug, Clone)]
pub struct PulseExtractor {
    config: ExtractionConfig,
    trigger_counter: RolloverCounter,
    one_pps_counter: RolloverCounter,
    frequency: FrequencyEstimator,
    last_one_pps_raw: Option<u32>,
    last_gps_time: Option<String>,
    gps_unreliable: bool,
    state: ExtractorState,
    lines_dropped: u64,
    pulse_sets_emitted: u64,
}

impl PulseExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        let frequency = FrequencyEstimator::new(&config);
        Self {
            config,
            trigger_counter: RolloverCounter::new(),
            one_pps_counter: RolloverCounter::new(),
            frequency,
            last_one_pps_raw: None,
            last_gps_time: None,
            gps_unreliable: false,
            state: ExtractorState::AwaitingFirstTrigger,
            lines_dropped: 0,
            pulse_sets_emitted: 0,
        }
    }

    /// Process a raw line, stamping any emitted PulseSet with the current time
    pub fn process_line(&mut self, raw: &str) -> Option<PulseSet> {
        self.process_line_at(raw, OffsetDateTime::now_utc())
    }

    /// Process a raw line received at `wall_clock`.
    ///
    /// Lines which are too short or malformed are dropped without touching
    /// the extractor state. Returns the PulseSet of the previous trigger
    /// window if this line opened a new one.
    pub fn process_line_at(&mut self, raw: &str, wall_clock: OffsetDateTime) -> Option<PulseSet> {
        match DaqLine::parse(raw) {
            Ok(Some(line)) => self.process(&line, wall_clock),
            Ok(None) => {
                log::trace!("Skipping short line {raw:?}");
                None
            }
            Err(e) => {
                log::debug!("Dropping DAQ line {raw:?}: {e}");
                self.lines_dropped += 1;
                None
            }
        }
    }

    /// Process an already parsed line
    pub fn process(&mut self, line: &DaqLine, wall_clock: OffsetDateTime) -> Option<PulseSet> {
        let trigger_count = self.trigger_counter.update(line.trigger_count);
        let one_pps = self.one_pps_counter.update(line.one_pps);
        let previous_one_pps = self.last_one_pps_raw.replace(line.one_pps);
        let pps_changed = self.frequency.observe(one_pps);
        self.check_gps_status(line);

        // The 1-PPS counter can switch before the GPS second does. If the GPS
        // time did not move yet, the previous 1-PPS value is the reference.
        let gps_unchanged = self.last_gps_time.as_deref() == Some(line.gps_time.as_str());
        let reference = match previous_one_pps {
            Some(previous) if pps_changed && gps_unchanged => previous,
            _ => line.one_pps,
        };
        let line_time = self.line_time(line, reference);
        self.last_gps_time = Some(line.gps_time.as_str().to_string());

        let tick_size = self.config.tick_size_ns;
        if line.is_trigger() {
            let mut window = TriggerWindow::open(trigger_count, line_time);
            window.record(line, 0.0, tick_size);
            let previous = std::mem::replace(&mut self.state, ExtractorState::Accumulating(window));
            match previous {
                ExtractorState::Accumulating(finished) => Some(self.emit(finished, wall_clock)),
                ExtractorState::AwaitingFirstTrigger => {
                    log::debug!("First trigger seen at {line_time:.9} s");
                    None
                }
            }
        } else {
            let frequency = self.frequency.frequency();
            match &mut self.state {
                ExtractorState::AwaitingFirstTrigger => {
                    log::trace!("Ignoring edges before the first trigger");
                }
                ExtractorState::Accumulating(window) => {
                    let mut window_ticks = trigger_count.saturating_sub(window.start_count);
                    // More than one rollover inside a single window should be
                    // impossible; kept as a clamp until this is understood.
                    if window_ticks > COUNTER_ROLLOVER {
                        log::warn!(
                            "Counter difference {window_ticks} inside a trigger window exceeds one rollover; clamping"
                        );
                        window_ticks -= COUNTER_ROLLOVER;
                    }
                    let counter_diff_ns = window_ticks as f64 * NS_PER_SECOND / frequency;
                    window.record(line, counter_diff_ns, tick_size);
                }
            }
            None
        }
    }

    /// Emit the open trigger window, if any. Invoked when a measurement stops.
    ///
    /// Counter and frequency state is kept, the next flagged line opens a new window.
    pub fn flush(&mut self, wall_clock: OffsetDateTime) -> Option<PulseSet> {
        match std::mem::replace(&mut self.state, ExtractorState::AwaitingFirstTrigger) {
            ExtractorState::Accumulating(window) => Some(self.emit(window, wall_clock)),
            ExtractorState::AwaitingFirstTrigger => None,
        }
    }

    /// Discard the open window and all timing state
    pub fn reset(&mut self) {
        if matches!(self.state, ExtractorState::Accumulating(_)) {
            log::debug!("Discarding open trigger window on reset");
        }
        *self = Self::new(self.config.clone());
    }

    /// Absolute line time in seconds of the GPS day.
    ///
    /// The 1-PPS field is the trigger counter latched at the last GPS second,
    /// so the trigger counter is never behind it; ticks are taken from the raw
    /// values of this line alone.
    fn line_time(&self, line: &DaqLine, one_pps_raw: u32) -> f64 {
        let ticks = counter_diff(one_pps_raw, line.trigger_count) as f64;
        line.gps_seconds() + ticks / self.frequency.frequency()
    }

    /// Warn once whenever the card starts flagging its GPS data
    fn check_gps_status(&mut self, line: &DaqLine) {
        let flagged = line
            .status
            .is_some_and(|s| s.gps_possibly_corrupt() || s.one_pps_rate_out_of_range());
        let unreliable = flagged || line.gps_valid == Some(false);
        if unreliable && !self.gps_unreliable {
            log::warn!(
                "GPS data unreliable at {}: status {:?}, valid {:?}, satellites {:?}",
                line.gps_time.as_str(),
                line.status,
                line.gps_valid,
                line.satellites
            );
        } else if !unreliable && self.gps_unreliable {
            log::info!("GPS data reliable again at {}", line.gps_time.as_str());
        }
        self.gps_unreliable = unreliable;
    }

    fn emit(&mut self, window: TriggerWindow, wall_clock: OffsetDateTime) -> PulseSet {
        let pulses = window.finalize(self.config.max_trigger_window_ns, wall_clock);
        self.pulse_sets_emitted += 1;
        log::trace!("Emitting pulse set {pulses}");
        pulses
    }

    pub fn frequency(&self) -> f64 {
        self.frequency.frequency()
    }

    /// Whether the last line carried a GPS warning flag or an invalid fix
    pub fn gps_unreliable(&self) -> bool {
        self.gps_unreliable
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, ExtractorState::Accumulating(_))
    }

    pub fn lines_dropped(&self) -> u64 {
        self.lines_dropped
    }

    pub fn pulse_sets_emitted(&self) -> u64 {
        self.pulse_sets_emitted
    }
}
