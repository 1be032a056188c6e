// Edge bytes: 8 bits per channel and edge. The lower five bits hold the TMC
// sub-tick count, bit 5 flags the edge as valid and bit 7 of the channel 0
// rising edge byte is the trigger flag.
pub const EDGE_TICK_BITS: usize = 5;
pub const EDGE_VALID_BIT: usize = 5;
pub const TRIGGER_FLAG_BIT: usize = 7;

// DAQ status byte (field 14 of a data line)
pub const STATUS_PPS_PENDING_BIT: usize = 0;
pub const STATUS_TRIGGER_PENDING_BIT: usize = 1;
pub const STATUS_GPS_CORRUPT_BIT: usize = 2;
pub const STATUS_PPS_RATE_BIT: usize = 3;

/// Tick size of the TMC in ns. Documentation says 0.75, measurement says 1.25.
pub const TMC_TICK_NS: f64 = 1.25;
/// Sentinel falling edge time (ns) for pulses without a usable falling edge
pub const MAX_TRIGGER_WINDOW_NS: f64 = 9960.0;
/// Nominal DAQ clock frequency
pub const DEFAULT_FREQUENCY_HZ: f64 = 25.0e6;
pub const FREQUENCY_BAND: [f64; 2] = [0.5, 1.5];
/// Number of 1-PPS transitions between two frequency estimates
pub const PPS_PER_ESTIMATE: u32 = 5;

/// Value added to a wrapped 32-bit hardware counter.
pub const COUNTER_ROLLOVER: u64 = 0xFFFF_FFFF;

pub const NUMBER_OF_CHANNELS: usize = 4;
/// Minimum whitespace separated fields in a pulse data line
pub const MIN_DATA_FIELDS: usize = 10;
pub const GPS_TIME_FIELD: usize = 10;
pub const GPS_DATE_FIELD: usize = 11;
pub const GPS_VALID_FIELD: usize = 12;
pub const SATELLITES_FIELD: usize = 13;
pub const STATUS_FIELD: usize = 14;
pub const CORRECTION_FIELD: usize = 15;

pub const NS_PER_SECOND: f64 = 1.0e9;

// Decay trigger defaults, in ns
pub const DECAY_TRIGGER_WINDOW_NS: f64 = 10000.0;
pub const DECAY_WINDOW_MARGIN_NS: f64 = 1000.0;
pub const DEFAULT_MAX_PULSE_WIDTH_NS: f64 = 12000.0;

/// Placeholder written to the rate file for a sensor that never reported
pub const MISSING_SENSOR_VALUE: f64 = -999.0;
pub const DEFAULT_RATE_INTERVAL_SECS: f64 = 5.0;
