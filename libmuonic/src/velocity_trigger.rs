use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::pulse::PulseSet;

/// Paddle pair of the time-of-flight measurement, as pulse set tuple indices (1 is `ch0`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityTriggerConfig {
    pub upper_channel: usize,
    pub lower_channel: usize,
}

impl Default for VelocityTriggerConfig {
    fn default() -> Self {
        Self {
            upper_channel: 1,
            lower_channel: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightTimeEvent {
    /// ns from the upper to the lower paddle
    pub flight_time: f64,
    pub detected_at: OffsetDateTime,
}

/// Time of flight from the upper to the lower channel.
///
/// Both first pulses need a real falling edge. The difference itself always
/// uses the rising edges. There is no cut on the pulse widths.
pub fn flight_time(pulses: &PulseSet, config: &VelocityTriggerConfig) -> Option<f64> {
    let upper = pulses.pulses_at(config.upper_channel)?.first()?;
    let lower = pulses.pulses_at(config.lower_channel)?.first()?;
    if upper.virtual_falling || lower.virtual_falling {
        log::debug!("Rejecting flight time, pulse without falling edge");
        return None;
    }
    Some(lower.rising - upper.rising)
}

#[derive(Debug, Clone)]
pub struct VelocityTrigger {
    config: VelocityTriggerConfig,
}

impl VelocityTrigger {
    pub fn new(config: VelocityTriggerConfig) -> Self {
        log::info!(
            "Velocity trigger initialized, upper channel {} lower channel {}",
            config.upper_channel,
            config.lower_channel
        );
        Self { config }
    }

    pub fn trigger(&self, pulses: &PulseSet) -> Option<FlightTimeEvent> {
        flight_time(pulses, &self.config).map(|flight_time| FlightTimeEvent {
            flight_time,
            detected_at: pulses.wall_clock,
        })
    }
}
