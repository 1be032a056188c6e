use std::fmt;
use time::macros::format_description;
use time::OffsetDateTime;

use super::constants::NUMBER_OF_CHANNELS;

/// Detector channel of the DAQ card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Ch0,
    Ch1,
    Ch2,
    Ch3,
}

impl Channel {
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Map a tuple index of a pulse set (1 through 4) to its channel.
    ///
    /// The persisted pulse set is `(trigger_time, ch0, ch1, ch2, ch3, wall_clock)`,
    /// so trigger configurations address `ch0` as 1. Index 0 is the trigger time.
    pub fn from_tuple_index(index: usize) -> Option<Self> {
        match index {
            1 => Some(Self::Ch0),
            2 => Some(Self::Ch1),
            3 => Some(Self::Ch2),
            4 => Some(Self::Ch3),
            _ => None,
        }
    }
}

/// One pulse of a channel, edge times in ns relative to the trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub rising: f64,
    pub falling: f64,
    /// True when `falling` is the synthesized end of the trigger window
    pub virtual_falling: bool,
}

impl Pulse {
    pub fn new(rising: f64, falling: f64) -> Self {
        Self {
            rising,
            falling,
            virtual_falling: false,
        }
    }

    pub fn with_virtual_falling(rising: f64, max_trigger_window: f64) -> Self {
        Self {
            rising,
            falling: max_trigger_window,
            virtual_falling: true,
        }
    }

    pub fn width(&self) -> f64 {
        self.falling - self.rising
    }
}

/// All pulses belonging to one trigger window. Immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseSet {
    /// Absolute trigger time, seconds since start of the GPS day
    pub trigger_time: f64,
    pub channels: [Vec<Pulse>; NUMBER_OF_CHANNELS],
    pub wall_clock: OffsetDateTime,
}

impl PulseSet {
    pub fn pulses(&self, channel: Channel) -> &[Pulse] {
        &self.channels[channel.index()]
    }

    /// Pulses by tuple index (1 = ch0 ... 4 = ch3), see [`Channel::from_tuple_index`]
    pub fn pulses_at(&self, tuple_index: usize) -> Option<&[Pulse]> {
        Channel::from_tuple_index(tuple_index).map(|ch| self.pulses(ch))
    }

    pub fn total_pulses(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }
}

fn write_pulses(f: &mut fmt::Formatter<'_>, pulses: &[Pulse]) -> fmt::Result {
    write!(f, "[")?;
    for (i, p) in pulses.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "({:?}, {:?})", p.rising, p.falling)?;
    }
    write!(f, "]")
}

/// Pulse file representation:
/// `(trigger_time, [(re, fe), ...], [...], [...], [...], 'wall clock')`
impl fmt::Display for PulseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6][offset_hour sign:mandatory]:[offset_minute]"
        );
        let wall_clock = self.wall_clock.format(format).map_err(|_| fmt::Error)?;
        write!(f, "({:?}, ", self.trigger_time)?;
        for pulses in &self.channels {
            write_pulses(f, pulses)?;
            write!(f, ", ")?;
        }
        write!(f, "'{wall_clock}')")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_tuple_index() {
        assert_eq!(Channel::from_tuple_index(0), None);
        assert_eq!(Channel::from_tuple_index(1), Some(Channel::Ch0));
        assert_eq!(Channel::from_tuple_index(4), Some(Channel::Ch3));
        assert_eq!(Channel::from_tuple_index(5), None);
    }

    #[test]
    fn test_display() {
        let set = PulseSet {
            trigger_time: 77807.272,
            channels: [
                vec![Pulse::with_virtual_falling(5.0, 9960.0)],
                vec![Pulse::new(1005.0, 1032.5), Pulse::new(2000.0, 2010.0)],
                vec![],
                vec![],
            ],
            wall_clock: datetime!(2023-10-13 21:36:47.5 UTC),
        };
        assert_eq!(
            set.to_string(),
            "(77807.272, [(5.0, 9960.0)], [(1005.0, 1032.5), (2000.0, 2010.0)], [], [], '2023-10-13 21:36:47.500000+00:00')"
        );
        assert_eq!(set.total_pulses(), 3);
        assert_eq!(set.pulses_at(2).map(|p| p.len()), Some(2));
    }
}
