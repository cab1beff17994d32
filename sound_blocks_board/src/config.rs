// Client-side board configuration.
//
// Tunables for admission checks and preview rendering, loadable from JSON.
// Every field has a default, so a partial JSON object (or `{}`) is valid and
// only overrides what it names. Admission thresholds are per client; nothing
// here is negotiated with the relay, which accepts whatever clients send.

use serde::{Deserialize, Serialize};
use sound_blocks_protocol::types::{Color, Waveform};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid board config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("min_block_length must be positive, got {0}")]
    NonPositiveMinLength(f64),

    #[error("block_alpha must be within 0..=1, got {0}")]
    AlphaOutOfRange(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// A new block's width and height must both be strictly greater than
    /// this before it can be deployed.
    pub min_block_length: f64,
    /// Preview color for a hold rectangle that may be committed.
    pub valid_color: Color,
    /// Preview color for a hold rectangle or dragged block that may not be
    /// committed or released. Also the sentinel the drag logic compares
    /// against, so it must differ from any deployed block's color.
    pub invalid_color: Color,
    /// Waveform given to freshly deployed blocks.
    pub default_waveform: Waveform,
    /// Fill opacity for blocks and the hold preview.
    pub block_alpha: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            min_block_length: 25.0,
            valid_color: Color::rgb(145, 242, 138),
            invalid_color: Color::rgb(242, 138, 145),
            default_waveform: Waveform::Sine,
            block_alpha: 0.7,
        }
    }
}

impl BoardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_block_length.is_nan() || self.min_block_length <= 0.0 {
            return Err(ConfigError::NonPositiveMinLength(self.min_block_length));
        }
        if !(0.0..=1.0).contains(&self.block_alpha) {
            return Err(ConfigError::AlphaOutOfRange(self.block_alpha));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(BoardConfig::from_json("{}").unwrap(), BoardConfig::default());
    }

    #[test]
    fn partial_override() {
        let config =
            BoardConfig::from_json(r#"{"min_block_length": 10, "default_waveform": "square"}"#)
                .unwrap();
        assert_eq!(config.min_block_length, 10.0);
        assert_eq!(config.default_waveform, Waveform::Square);
        assert_eq!(config.invalid_color, Color::rgb(242, 138, 145));
    }

    #[test]
    fn rejects_zero_min_length() {
        let err = BoardConfig::from_json(r#"{"min_block_length": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveMinLength(_)));
    }

    #[test]
    fn rejects_bad_alpha() {
        let err = BoardConfig::from_json(r#"{"block_alpha": 1.5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::AlphaOutOfRange(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            BoardConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
