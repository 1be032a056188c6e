use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::*;
use super::decay_trigger::DecayTriggerConfig;
use super::error::ConfigError;
use super::velocity_trigger::VelocityTriggerConfig;

/// Constants of the pulse extraction, matching the QuarkNet DAQ card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub tick_size_ns: f64,
    pub max_trigger_window_ns: f64,
    pub default_frequency_hz: f64,
    pub frequency_band: [f64; 2],
    pub pps_per_estimate: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tick_size_ns: TMC_TICK_NS,
            max_trigger_window_ns: MAX_TRIGGER_WINDOW_NS,
            default_frequency_hz: DEFAULT_FREQUENCY_HZ,
            frequency_band: FREQUENCY_BAND,
            pps_per_estimate: PPS_PER_ESTIMATE,
        }
    }
}

/// Structure representing the application configuration. Contains pathing and analysis information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_path: PathBuf,
    pub pulse_path: Option<PathBuf>,
    pub rate_path: Option<PathBuf>,
    pub event_path: Option<PathBuf>,
    pub extraction: ExtractionConfig,
    pub decay_trigger: Option<DecayTriggerConfig>,
    pub velocity_trigger: Option<VelocityTriggerConfig>,
    pub rate_interval_secs: f64,
    pub flush_final_window: bool,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("None"),
            pulse_path: None,
            rate_path: None,
            event_path: None,
            extraction: ExtractionConfig::default(),
            decay_trigger: Some(DecayTriggerConfig::default()),
            velocity_trigger: Some(VelocityTriggerConfig::default()),
            rate_interval_secs: DEFAULT_RATE_INTERVAL_SECS,
            flush_final_window: true,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;
        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Reject values which would break the extraction arithmetic
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ex = &self.extraction;
        if !(ex.default_frequency_hz > 0.0) {
            return Err(invalid("default_frequency_hz", "must be positive"));
        }
        if !(ex.tick_size_ns > 0.0) {
            return Err(invalid("tick_size_ns", "must be positive"));
        }
        if !(ex.max_trigger_window_ns > 0.0) {
            return Err(invalid("max_trigger_window_ns", "must be positive"));
        }
        if !(ex.frequency_band[0] > 0.0 && ex.frequency_band[0] < ex.frequency_band[1]) {
            return Err(invalid(
                "frequency_band",
                "must be an increasing pair of positive factors",
            ));
        }
        if ex.pps_per_estimate == 0 {
            return Err(invalid("pps_per_estimate", "must be at least 1"));
        }
        if !(self.rate_interval_secs > 0.0) {
            return Err(invalid("rate_interval_secs", "must be positive"));
        }
        if let Some(decay) = &self.decay_trigger {
            for (name, ch) in [
                ("decay_trigger.single_channel", decay.single_channel),
                ("decay_trigger.double_channel", decay.double_channel),
                ("decay_trigger.veto_channel", decay.veto_channel),
            ] {
                check_channel(name, ch)?;
            }
        }
        if let Some(velocity) = &self.velocity_trigger {
            check_channel("velocity_trigger.upper_channel", velocity.upper_channel)?;
            check_channel("velocity_trigger.lower_channel", velocity.lower_channel)?;
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.to_string(),
    }
}

/// Trigger channels are tuple indices of a pulse set, so 1 through 4
fn check_channel(name: &'static str, channel: usize) -> Result<(), ConfigError> {
    if (1..=NUMBER_OF_CHANNELS).contains(&channel) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name,
            reason: format!("channel {channel} is not in 1..={NUMBER_OF_CHANNELS}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "input_path: /data/run.txt\nrate_interval_secs: 10.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.input_path, PathBuf::from("/data/run.txt"));
        assert_eq!(config.rate_interval_secs, 10.0);
        assert_eq!(config.extraction, ExtractionConfig::default());
        assert!(config.flush_final_window);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let mut config = Config::default();
        config.pulse_path = Some(dir.path().join("pulses.txt"));
        config.write_config_file(&path).unwrap();
        let loaded = Config::read_config_file(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::read_config_file(Path::new("/does/not/exist.yml"));
        assert!(matches!(result, Err(ConfigError::BadFilePath(_))));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.extraction.default_frequency_hz = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.velocity_trigger = Some(VelocityTriggerConfig {
            upper_channel: 0,
            lower_channel: 2,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "velocity_trigger.upper_channel", .. })
        ));
    }
}
