use serde::{Deserialize, Serialize};

use crate::detection::types::Thresholds;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds.is_valid() {
            return Err(ConfigError::InvalidThresholds { thresholds: self.thresholds });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thresholds: Thresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_thresholds_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_saved_thresholds() {
        let config: Config =
            serde_json::from_str(r#"{"thresholds":{"inhale":-3.5,"exhale":6.0}}"#).unwrap();
        assert_eq!(config.thresholds, Thresholds::new(-3.5, 6.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let config = Config { thresholds: Thresholds::new(4.0, -4.0) };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThresholds { .. })));
    }
}
