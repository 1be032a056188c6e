use bitvec::prelude::*;

use super::constants::{EDGE_TICK_BITS, EDGE_VALID_BIT, TRIGGER_FLAG_BIT};

/// One decoded edge of a channel.
///
/// `tick_offset` is the sub-tick part of the edge time in ns, relative to the
/// counter value of the line the edge byte came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSample {
    pub valid: bool,
    pub tick_offset: f64,
}

impl EdgeSample {
    /// Decode an 8-bit edge byte.
    ///
    /// Bit 5 is the validity flag, bits 0-4 count TMC ticks of `tick_size` ns.
    pub fn decode(byte: u8, tick_size: f64) -> Self {
        let bits = byte.view_bits::<Lsb0>();
        let ticks: u8 = bits[..EDGE_TICK_BITS].load_le();
        Self {
            valid: bits[EDGE_VALID_BIT],
            tick_offset: ticks as f64 * tick_size,
        }
    }

    /// Time of the edge within its trigger window, if the edge is present.
    pub fn time_in_window(&self, counter_diff_ns: f64) -> Option<f64> {
        if self.valid {
            Some(counter_diff_ns + self.tick_offset)
        } else {
            None
        }
    }
}

/// Check the trigger flag, bit 7 of the channel 0 rising edge byte
pub fn has_trigger_flag(ch0_rising: u8) -> bool {
    ch0_rising.view_bits::<Lsb0>()[TRIGGER_FLAG_BIT]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TMC_TICK_NS;

    #[test]
    fn test_decode_every_byte() {
        for b in 0..=u8::MAX {
            let edge = EdgeSample::decode(b, TMC_TICK_NS);
            assert_eq!(edge.valid, b & 0x20 != 0);
            assert_eq!(edge.tick_offset, (b & 0x1F) as f64 * 1.25);
        }
    }

    #[test]
    fn test_time_in_window() {
        let edge = EdgeSample::decode(0x24, TMC_TICK_NS);
        assert_eq!(edge.time_in_window(1000.0), Some(1005.0));

        // sub-tick bits without the validity flag are no edge at all
        let absent = EdgeSample::decode(0x04, TMC_TICK_NS);
        assert_eq!(absent.time_in_window(1000.0), None);
    }

    #[test]
    fn test_trigger_flag() {
        assert!(has_trigger_flag(0xA4));
        assert!(has_trigger_flag(0x80));
        assert!(!has_trigger_flag(0x24));
        assert!(!has_trigger_flag(0x7F));
    }
}
