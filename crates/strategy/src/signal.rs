//! Composite directional signal: a weighted sum of trend, mean-reversion,
//! and momentum components over a candle history. Pure and deterministic,
//! which is what makes backtests reproducible.

use crate::config::StrategyConfig;
use crate::indicators::{rsi, sma};
use rust_decimal::prelude::ToPrimitive;
use tradeforge_core::Candle;

pub const SHORT_MA_PERIOD: usize = 20;
pub const LONG_MA_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;

/// Bars required before the longest indicator is valid. The signal is 0
/// until this much history exists.
pub const WARMUP_PERIOD: usize = LONG_MA_PERIOD;

/// Computes the composite signal for the bar at `index`, using only candles
/// at or before it.
///
/// Returns 0.0 while fewer than [`WARMUP_PERIOD`] bars exist.
#[must_use]
pub fn composite_signal(candles: &[Candle], index: usize, config: &StrategyConfig) -> f64 {
    if index >= candles.len() {
        return 0.0;
    }
    let closes: Vec<f64> = candles[..=index]
        .iter()
        .map(|c| c.close.to_f64().unwrap_or(0.0))
        .collect();
    composite_signal_from_closes(&closes, index, config)
}

/// Same as [`composite_signal`] over pre-extracted close prices. The
/// simulator extracts closes once and calls this per bar.
#[must_use]
pub fn composite_signal_from_closes(
    closes: &[f64],
    index: usize,
    config: &StrategyConfig,
) -> f64 {
    if index >= closes.len() || index + 1 < WARMUP_PERIOD {
        return 0.0;
    }

    let (Some(short_ma), Some(long_ma)) = (
        sma(closes, SHORT_MA_PERIOD, index),
        sma(closes, LONG_MA_PERIOD, index),
    ) else {
        return 0.0;
    };
    let close = closes[index];

    let trend = if long_ma == 0.0 {
        0.0
    } else {
        (short_ma - long_ma) / long_ma
    };

    let mean_rev = if close == 0.0 {
        0.0
    } else {
        (short_ma - close) / close
    };

    let momentum = rsi(closes, RSI_PERIOD, index)
        .map_or(0.0, |value| (value - 50.0) / 50.0);

    config.trend_weight * trend
        + config.mean_rev_weight * mean_rev
        + config.carry_weight * momentum
}
