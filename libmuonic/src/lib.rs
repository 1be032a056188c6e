//! # muonic
//!
//! muonic is the data analysis engine for the QuarkNet cosmic ray muon detector, written
//! in Rust. It takes the raw text stream produced by the QuarkNet DAQ card (scintillator
//! edge data, counter readouts and sensor replies) and turns it into pulse sets, muon
//! decay and time-of-flight events, and rate samples.
//!
//! ## Installation
//!
//! Currently the only method of install is from source, which is laid out below.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./muonic_cli` from the top
//! level muonic repository. The binary will be installed to your cargo install location
//! (typically something like `~/.cargo/bin/`). It can be uninstalled by running
//! `cargo uninstall muonic_cli`.
//!
//! ## Configuration
//!
//! A template configuration can be generated with `muonic_cli -p config.yml new`. The
//! YAML format of a configuration file is as follows:
//!
//! ```yml
//! input_path: None
//! pulse_path: null
//! rate_path: null
//! event_path: null
//! extraction:
//!   tick_size_ns: 1.25
//!   max_trigger_window_ns: 9960.0
//!   default_frequency_hz: 25000000.0
//!   frequency_band:
//!   - 0.5
//!   - 1.5
//!   pps_per_estimate: 5
//! decay_trigger:
//!   single_channel: 2
//!   double_channel: 3
//!   veto_channel: 4
//!   min_decay_time: 0.0
//!   single_pulse_width:
//!   - 0.0
//!   - 12000.0
//!   double_pulse_width:
//!   - 0.0
//!   - 12000.0
//!   trigger_window: 10000.0
//!   window_margin: 1000.0
//! velocity_trigger:
//!   upper_channel: 1
//!   lower_channel: 2
//! rate_interval_secs: 5.0
//! flush_final_window: true
//! ```
//!
//! - `input_path`: A recorded DAQ stream, one message per line. A line may be prefixed by
//! the Unix time it was received at and a tab; otherwise it is stamped when it is read.
//! - `pulse_path`, `rate_path`, `event_path` (Optional): Output files for pulse sets, rate
//! samples and decay/flight time events. Outputs set to `null` are not written.
//! - `extraction`: Timing constants of the DAQ card. The defaults match the 6000 series
//! cards and should rarely need changing.
//! - `decay_trigger`, `velocity_trigger` (Optional): Channel selection of the two event
//! triggers. Channels are counted from 1 (`ch0`) to 4 (`ch3`). Set to `null` to disable.
//! - `rate_interval_secs`: Minimum time between two rate samples.
//! - `flush_final_window`: Emit the last trigger window when the input ends.
//!
//! ## Output
//!
//! ### Pulse File
//!
//! One pulse set per line, all pulse times in ns relative to the trigger:
//!
//! ```text
//! (trigger_time, [(re, fe), ...], [ch1], [ch2], [ch3], 'YYYY-MM-DD hh:mm:ss.ffffff+00:00')
//! ```
//!
//! The trigger time is given in seconds of the GPS day. A falling edge which was never
//! seen is replaced by the end of the trigger window (9960 ns).
//!
//! ### Rate File
//!
//! A header line followed by one row per sample:
//!
//! ```text
//!  date | time | R0 | R1 | R2 | R3 | R_trigger | chan0 | chan1 | chan2 | chan3 | trigger | Delta_time | Pressure [mBar] | Temperature [C]
//! ```
//!
//! Sensor values which were never read are written as `-999.0`.
//!
//! ### Event File
//!
//! One `Decay` or `FlightTime` line per accepted event with its wall clock time and the
//! measured time in ns.
pub mod config;
pub mod constants;
pub mod daq_line;
pub mod decay_trigger;
pub mod edge;
pub mod error;
pub mod file_writer;
pub mod frequency;
pub mod process;
pub mod pulse;
pub mod pulse_extractor;
pub mod rate_sampler;
pub mod record;
pub mod rollover;
pub mod velocity_trigger;
pub mod worker_status;
