use super::config::ExtractionConfig;

/// Running estimate of the DAQ clock frequency, disciplined by the GPS 1-PPS signal.
///
/// The 1-PPS field of a data line latches the internal counter at the last
/// 1-PPS pulse. Counting the internal ticks elapsed over several 1-PPS
/// transitions gives the real clock frequency, which drifts away from the
/// nominal value with temperature and card.
#[derive(Debug, Clone)]
pub struct FrequencyEstimator {
    nominal: f64,
    band: [f64; 2],
    pps_per_estimate: u32,
    calculated_frequency: f64,
    passed_one_pps: u32,
    last_one_pps: Option<u64>,
    last_one_pps_poll: Option<u64>,
}

impl FrequencyEstimator {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            nominal: config.default_frequency_hz,
            band: config.frequency_band,
            pps_per_estimate: config.pps_per_estimate.max(1),
            calculated_frequency: config.default_frequency_hz,
            passed_one_pps: 0,
            last_one_pps: None,
            last_one_pps_poll: None,
        }
    }

    /// Current clock frequency in Hz. Never zero.
    pub fn frequency(&self) -> f64 {
        self.calculated_frequency
    }

    /// Feed the rollover-corrected 1-PPS counter value of a line.
    ///
    /// Returns true if the value changed, i.e. a 1-PPS transition was seen.
    /// Every `pps_per_estimate` transitions a new frequency is computed.
    pub fn observe(&mut self, one_pps: u64) -> bool {
        let previous = self.last_one_pps.replace(one_pps);
        let Some(previous) = previous else {
            self.last_one_pps_poll = Some(one_pps);
            return false;
        };
        if previous == one_pps {
            return false;
        }

        self.passed_one_pps += 1;
        if self.passed_one_pps % self.pps_per_estimate == 0 {
            let poll = self.last_one_pps_poll.unwrap_or(previous);
            let estimate = one_pps.saturating_sub(poll) as f64 / self.passed_one_pps as f64;
            self.passed_one_pps = 0;
            self.last_one_pps_poll = Some(one_pps);
            self.apply_estimate(estimate);
        }
        true
    }

    /// Accept an estimate inside the sanity band, otherwise fall back to the nominal frequency
    fn apply_estimate(&mut self, estimate: f64) {
        let low = self.band[0] * self.nominal;
        let high = self.band[1] * self.nominal;
        if estimate.is_finite() && estimate > 0.0 && (low..=high).contains(&estimate) {
            log::debug!("New DAQ frequency estimate: {estimate} Hz");
            self.calculated_frequency = estimate;
        } else {
            log::warn!(
                "Discarding DAQ frequency estimate {estimate} Hz outside [{low}, {high}] Hz; using {} Hz",
                self.nominal
            );
            self.calculated_frequency = self.nominal;
        }
    }

    pub fn reset(&mut self) {
        self.calculated_frequency = self.nominal;
        self.passed_one_pps = 0;
        self.last_one_pps = None;
        self.last_one_pps_poll = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> FrequencyEstimator {
        FrequencyEstimator::new(&ExtractionConfig::default())
    }

    #[test]
    fn test_estimate_after_five_transitions() {
        let mut freq = estimator();
        let start: u64 = 3_000;
        assert!(!freq.observe(start));
        for i in 1..=5u64 {
            assert!(freq.observe(start + i * 24_000_000 + (i / 5) * 5_000_000));
            // repeated values are not transitions
            assert!(!freq.observe(start + i * 24_000_000 + (i / 5) * 5_000_000));
        }
        // raw delta 125,000,000 over 5 transitions
        assert_eq!(freq.frequency(), 25_000_000.0);
    }

    #[test]
    fn test_estimate_tracks_drift() {
        let mut freq = estimator();
        freq.observe(0);
        for i in 1..=5u64 {
            freq.observe(i * 26_000_000);
        }
        assert_eq!(freq.frequency(), 26_000_000.0);
    }

    #[test]
    fn test_out_of_band_estimate_is_discarded() {
        let mut freq = estimator();
        freq.observe(0);
        for i in 1..=5u64 {
            freq.observe(i * 100);
        }
        assert_eq!(freq.frequency(), 25_000_000.0);

        freq.reset();
        freq.observe(0);
        for i in 1..=5u64 {
            freq.observe(i * 50_000_000);
        }
        assert_eq!(freq.frequency(), 25_000_000.0);
    }

    #[test]
    fn test_only_every_fifth_transition_estimates() {
        let mut freq = estimator();
        freq.observe(0);
        for i in 1..=4u64 {
            freq.observe(i * 30_000_000);
        }
        assert_eq!(freq.frequency(), 25_000_000.0);
        freq.observe(150_000_000);
        assert_eq!(freq.frequency(), 30_000_000.0);
    }
}
