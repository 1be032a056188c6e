use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::constants::{DECAY_TRIGGER_WINDOW_NS, DECAY_WINDOW_MARGIN_NS, DEFAULT_MAX_PULSE_WIDTH_NS};
use super::pulse::{Pulse, PulseSet};

/// Channel combination and acceptance windows of the muon decay trigger.
///
/// Channels are tuple indices of the pulse set, 1 through 4 (1 is `ch0`).
/// All times in ns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayTriggerConfig {
    pub single_channel: usize,
    pub double_channel: usize,
    pub veto_channel: usize,
    pub min_decay_time: f64,
    pub single_pulse_width: [f64; 2],
    pub double_pulse_width: [f64; 2],
    pub trigger_window: f64,
    /// Artifacts pile up at the end of the trigger window
    pub window_margin: f64,
}

impl Default for DecayTriggerConfig {
    fn default() -> Self {
        Self {
            single_channel: 2,
            double_channel: 3,
            veto_channel: 4,
            min_decay_time: 0.0,
            single_pulse_width: [0.0, DEFAULT_MAX_PULSE_WIDTH_NS],
            double_pulse_width: [0.0, DEFAULT_MAX_PULSE_WIDTH_NS],
            trigger_window: DECAY_TRIGGER_WINDOW_NS,
            window_margin: DECAY_WINDOW_MARGIN_NS,
        }
    }
}

/// A muon which stopped in the detector and decayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayEvent {
    /// ns between the muon pulse and the decay electron pulse
    pub decay_time: f64,
    pub detected_at: OffsetDateTime,
}

fn width_within(pulse: &Pulse, bounds: [f64; 2]) -> bool {
    let width = pulse.width();
    bounds[0] < width && width < bounds[1]
}

/// Decay time of a pulse set, or None if it does not look like a decay.
///
/// We demand a second pulse in the channel where the muon got stuck and
/// nothing in the veto channel. If single and double channel are the same,
/// its first pulse is the muon and its last pulse the electron.
pub fn decay_time(pulses: &PulseSet, config: &DecayTriggerConfig) -> Option<f64> {
    let single = pulses.pulses_at(config.single_channel)?;
    let double = pulses.pulses_at(config.double_channel)?;
    let veto = pulses.pulses_at(config.veto_channel)?;

    if single.len() + double.len() < 2 || !veto.is_empty() {
        log::debug!(
            "Rejecting decay with single pulses {}, double pulses {} and veto pulses {}",
            single.len(),
            double.len(),
            veto.len()
        );
        return None;
    }

    let enough_pulses = if config.single_channel == config.double_channel {
        double.len() >= 2
    } else {
        single.len() == 1 && double.len() >= 2
    };
    if !enough_pulses {
        log::debug!("Rejecting decay, wrong pulse multiplicity");
        return None;
    }

    let (first, last) = (double.first()?, double.last()?);
    if !width_within(&single[0], config.single_pulse_width)
        || !width_within(last, config.double_pulse_width)
    {
        log::debug!("Rejecting decay, pulse widths out of bounds");
        return None;
    }

    // falling edges might be virtual, use the rising edges
    let decay_time = last.rising - first.rising;
    if config.min_decay_time < decay_time && decay_time < config.trigger_window - config.window_margin {
        log::debug!("Decay with decay time {decay_time} ns found");
        Some(decay_time)
    } else {
        log::debug!("Rejecting decay with decay time {decay_time} ns");
        None
    }
}

/// Decay trigger applied to every pulse set of a run
#[derive(Debug, Clone)]
pub struct DecayTrigger {
    config: DecayTriggerConfig,
}

impl DecayTrigger {
    pub fn new(config: DecayTriggerConfig) -> Self {
        log::info!(
            "Initializing decay trigger, trigger window {} ns",
            config.trigger_window
        );
        Self { config }
    }

    pub fn trigger(&self, pulses: &PulseSet) -> Option<DecayEvent> {
        decay_time(pulses, &self.config).map(|decay_time| DecayEvent {
            decay_time,
            detected_at: pulses.wall_clock,
        })
    }
}
