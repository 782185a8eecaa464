//! Error types for the simulation input and configuration boundary.
//!
//! Gate refusals and circuit-breaker trips are deliberately NOT errors: they
//! are first-class values (`GateDecision`, `FailureTransition`) that callers
//! must inspect explicitly.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors in the candle data handed to a simulation. These abort the whole
/// backtest run; no partial trades are returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    /// No candles in the requested range.
    #[error("no candles in the requested range")]
    NoCandles,

    /// Fewer candles than the indicator warm-up window requires.
    #[error(
        "insufficient history: need {required} candles, have {available} (available {start} to {end})"
    )]
    InsufficientHistory {
        /// Warm-up window length.
        required: usize,
        /// Candles actually available.
        available: usize,
        /// First available timestamp.
        start: DateTime<Utc>,
        /// Last available timestamp.
        end: DateTime<Utc>,
    },

    /// Candle timestamps not strictly ascending.
    #[error("candles out of order: {next} follows {prev}")]
    OutOfOrder {
        prev: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    /// Two candles share a timestamp.
    #[error("duplicate candle timestamp {timestamp}")]
    DuplicateTimestamp { timestamp: DateTime<Utc> },
}

/// Malformed strategy configuration, rejected before simulation starts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("stop_loss must be non-negative, got {0}")]
    NegativeStopLoss(f64),

    #[error("take_profit must be non-negative, got {0}")]
    NegativeTakeProfit(f64),

    #[error("signal_threshold must be non-negative, got {0}")]
    NegativeThreshold(f64),

    #[error("max_position_size must be positive, got {0}")]
    InvalidPositionSize(f64),

    #[error("{name} must be finite, got {value}")]
    NonFiniteWeight { name: &'static str, value: f64 },
}
