use super::constants::COUNTER_ROLLOVER;

/// Difference between two raw readings of a wrapping 32-bit counter.
///
/// If the current reading is below the previous one, exactly one wrap is
/// assumed and `COUNTER_ROLLOVER` is added before taking the difference.
pub fn counter_diff(previous: u32, current: u32) -> u64 {
    if current < previous {
        current as u64 + COUNTER_ROLLOVER - previous as u64
    } else {
        (current - previous) as u64
    }
}

/// Keeps a monotonic logical value for a wrapping 32-bit hardware counter.
///
/// Used for the trigger counter and for the 1-PPS counter of the DAQ card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolloverCounter {
    last_raw: Option<u32>,
    accumulator: u64,
    rollovers: u64,
}

impl RolloverCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a raw counter reading and return its logical value
    pub fn update(&mut self, raw: u32) -> u64 {
        if let Some(last) = self.last_raw {
            if raw < last {
                self.accumulator += COUNTER_ROLLOVER;
                self.rollovers += 1;
                log::debug!("Counter rollover detected ({last:#010x} -> {raw:#010x})");
            }
        }
        self.last_raw = Some(raw);
        self.accumulator + raw as u64
    }

    /// Logical value of the last reading, None before the first one
    pub fn value(&self) -> Option<u64> {
        self.last_raw.map(|raw| self.accumulator + raw as u64)
    }

    pub fn last_raw(&self) -> Option<u32> {
        self.last_raw
    }

    pub fn rollovers(&self) -> u64 {
        self.rollovers
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_diff() {
        assert_eq!(counter_diff(10, 25), 15);
        assert_eq!(counter_diff(7, 7), 0);
        let pairs = [
            (1u32, 0u32),
            (0xFFFF_FFFF, 0),
            (0xFFFF_FF00, 0x10),
            (0x8000_0000, 0x7FFF_FFFF),
        ];
        for (prev, cur) in pairs {
            assert_eq!(
                counter_diff(prev, cur),
                (cur as u64 + 0xFFFF_FFFF) - prev as u64
            );
        }
    }

    #[test]
    fn test_logical_value_is_monotonic() {
        let mut counter = RolloverCounter::new();
        assert_eq!(counter.value(), None);

        let readings = [0xFFFF_FF00u32, 0xFFFF_FFF0, 0x10, 0x20, 0xFFFF_FFFF, 0x0, 0x5];
        let mut last = 0;
        for raw in readings {
            let value = counter.update(raw);
            assert!(value >= last);
            last = value;
        }
        assert_eq!(counter.rollovers(), 2);
        assert_eq!(counter.value(), Some(2 * 0xFFFF_FFFF + 5));
        assert_eq!(counter.last_raw(), Some(5));
    }

    #[test]
    fn test_reset() {
        let mut counter = RolloverCounter::new();
        counter.update(100);
        counter.update(5);
        counter.reset();
        assert_eq!(counter, RolloverCounter::new());
        assert_eq!(counter.update(5), 5);
    }
}
