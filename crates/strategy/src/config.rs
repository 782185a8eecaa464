use serde::{Deserialize, Serialize};
use tradeforge_core::error::ConfigError;

/// Strategy parameters. Weights are used exactly as given; callers own any
/// normalization invariant, the engine never rescales them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_trend_weight")]
    pub trend_weight: f64,
    #[serde(default = "default_mean_rev_weight")]
    pub mean_rev_weight: f64,
    #[serde(default = "default_carry_weight")]
    pub carry_weight: f64,
    /// Entry/exit conviction threshold on the composite signal.
    #[serde(default = "default_signal_threshold")]
    pub signal_threshold: f64,
    /// Fractional adverse move that closes a position (e.g. 0.02 = 2%).
    #[serde(default = "default_stop_loss")]
    pub stop_loss: f64,
    /// Fractional favorable move that closes a position.
    #[serde(default = "default_take_profit")]
    pub take_profit: f64,
    /// Fraction of capital deployed per entry, before the hard 0.95 cap.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
}

const fn default_trend_weight() -> f64 {
    0.4
}

const fn default_mean_rev_weight() -> f64 {
    0.3
}

const fn default_carry_weight() -> f64 {
    0.3
}

const fn default_signal_threshold() -> f64 {
    0.2
}

const fn default_stop_loss() -> f64 {
    0.02
}

const fn default_take_profit() -> f64 {
    0.04
}

const fn default_max_position_size() -> f64 {
    0.2
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            trend_weight: default_trend_weight(),
            mean_rev_weight: default_mean_rev_weight(),
            carry_weight: default_carry_weight(),
            signal_threshold: default_signal_threshold(),
            stop_loss: default_stop_loss(),
            take_profit: default_take_profit(),
            max_position_size: default_max_position_size(),
        }
    }
}

impl StrategyConfig {
    /// Rejects malformed parameters before any simulation or live decision
    /// uses them.
    ///
    /// # Errors
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("trend_weight", self.trend_weight),
            ("mean_rev_weight", self.mean_rev_weight),
            ("carry_weight", self.carry_weight),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteWeight { name, value });
            }
        }
        if !self.stop_loss.is_finite() || self.stop_loss < 0.0 {
            return Err(ConfigError::NegativeStopLoss(self.stop_loss));
        }
        if !self.take_profit.is_finite() || self.take_profit < 0.0 {
            return Err(ConfigError::NegativeTakeProfit(self.take_profit));
        }
        if !self.signal_threshold.is_finite() || self.signal_threshold < 0.0 {
            return Err(ConfigError::NegativeThreshold(self.signal_threshold));
        }
        if !self.max_position_size.is_finite() || self.max_position_size <= 0.0 {
            return Err(ConfigError::InvalidPositionSize(self.max_position_size));
        }
        Ok(())
    }
}
