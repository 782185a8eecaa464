//! Bar-by-bar position simulator. A pure function of (candles, config,
//! capital): no clock, no randomness, so identical inputs reproduce identical
//! trades and equity curves bit for bit.

use crate::types::{EquityCurvePoint, SimulatedPosition, Trade};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tradeforge_core::{Candle, ConfigError, DataError, TradeSide};
use tradeforge_strategy::{composite_signal_from_closes, StrategyConfig, WARMUP_PERIOD};

/// Hard ceiling on the fraction of capital a single entry may deploy,
/// applied regardless of `max_position_size`.
const CAPITAL_HARD_CAP: Decimal = dec!(0.95);

/// Simulation-aborting errors. No partial trades are ever returned.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityCurvePoint>,
    pub final_capital: Decimal,
}

/// Runs the full simulation over a candle series.
///
/// The equity curve holds one point per simulated bar, starting at the first
/// bar where the indicators are valid. Any position still open at the end of
/// the series is force-closed at the final close.
///
/// # Errors
/// `BacktestError::Config` for a malformed strategy config;
/// `BacktestError::Data` for an empty, unordered, or too-short series.
pub fn simulate(
    candles: &[Candle],
    config: &StrategyConfig,
    initial_capital: Decimal,
) -> Result<SimulationResult, BacktestError> {
    config.validate()?;
    if candles.is_empty() {
        return Err(DataError::NoCandles.into());
    }
    Candle::validate_series(candles)?;
    if candles.len() < WARMUP_PERIOD {
        return Err(DataError::InsufficientHistory {
            required: WARMUP_PERIOD,
            available: candles.len(),
            start: candles[0].timestamp,
            end: candles[candles.len() - 1].timestamp,
        }
        .into());
    }

    let max_position = Decimal::try_from(config.max_position_size)
        .map_err(|_| ConfigError::InvalidPositionSize(config.max_position_size))?;

    let closes: Vec<f64> = candles
        .iter()
        .map(|c| c.close.to_f64().unwrap_or(0.0))
        .collect();

    let mut capital = initial_capital;
    let mut peak = initial_capital;
    let mut position: Option<SimulatedPosition> = None;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityCurvePoint> = Vec::new();

    for (i, candle) in candles.iter().enumerate().skip(WARMUP_PERIOD - 1) {
        let close = candle.close;
        let signal = composite_signal_from_closes(&closes, i, config);

        // Mark to market before any exit/entry on this bar.
        let unrealized = position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.unrealized_pnl(close));
        let equity = capital + unrealized;
        if equity > peak {
            peak = equity;
        }
        let drawdown_pct = if peak > Decimal::ZERO {
            ((peak - equity) / peak * dec!(100)).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };
        equity_curve.push(EquityCurvePoint {
            timestamp: candle.timestamp,
            equity,
            drawdown_pct,
        });

        if let Some(open) = &position {
            let change = open.favorable_change(close);
            let stop_hit = change <= -config.stop_loss;
            let target_hit = change >= config.take_profit;
            let signal_reversal = match open.side {
                TradeSide::Long => signal < -config.signal_threshold,
                TradeSide::Short => signal > config.signal_threshold,
            };
            if stop_hit || target_hit || signal_reversal {
                let trade = open.close_at(candle.timestamp, close);
                capital += trade.pnl;
                trades.push(trade);
                position = None;
            }
        }

        // No entries on the final bar: a closed trade's exit timestamp must
        // come strictly after its entry.
        if position.is_none() && i + 1 < candles.len() {
            let side = if signal > config.signal_threshold {
                Some(TradeSide::Long)
            } else if signal < -config.signal_threshold {
                Some(TradeSide::Short)
            } else {
                None
            };
            if let Some(side) = side {
                if close > Decimal::ZERO && capital > Decimal::ZERO {
                    let notional = (capital * max_position).min(capital * CAPITAL_HARD_CAP);
                    let size = notional / close;
                    if size > Decimal::ZERO {
                        position = Some(SimulatedPosition {
                            side,
                            entry_price: close,
                            entry_timestamp: candle.timestamp,
                            size,
                            signal_at_entry: signal,
                        });
                    }
                }
            }
        }
    }

    // No open positions survive a completed simulation.
    if let Some(open) = position.take() {
        let last = &candles[candles.len() - 1];
        let trade = open.close_at(last.timestamp, last.close);
        capital += trade.pnl;
        trades.push(trade);
    }

    Ok(SimulationResult {
        trades,
        equity_curve,
        final_capital: capital,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn hourly_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let price = Decimal::try_from(close).unwrap();
                Candle {
                    timestamp: Utc.timestamp_opt(i as i64 * 3600, 0).unwrap(),
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: Decimal::ONE,
                }
            })
            .collect()
    }

    fn trend_only_config(threshold: f64, stop_loss: f64, take_profit: f64) -> StrategyConfig {
        StrategyConfig {
            trend_weight: 1.0,
            mean_rev_weight: 0.0,
            carry_weight: 0.0,
            signal_threshold: threshold,
            stop_loss,
            take_profit,
            max_position_size: 0.2,
        }
    }

    #[test]
    fn empty_series_is_rejected() {
        let result = simulate(&[], &StrategyConfig::default(), dec!(10000));
        assert!(matches!(
            result,
            Err(BacktestError::Data(DataError::NoCandles))
        ));
    }

    #[test]
    fn short_series_reports_available_range() {
        let candles = hourly_candles(&[100.0; 10]);
        let result = simulate(&candles, &StrategyConfig::default(), dec!(10000));
        match result {
            Err(BacktestError::Data(DataError::InsufficientHistory {
                required,
                available,
                start,
                end,
            })) => {
                assert_eq!(required, WARMUP_PERIOD);
                assert_eq!(available, 10);
                assert_eq!(start, candles[0].timestamp);
                assert_eq!(end, candles[9].timestamp);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected_before_simulation() {
        let candles = hourly_candles(&[100.0; 60]);
        let config = StrategyConfig {
            stop_loss: -1.0,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            simulate(&candles, &config, dec!(10000)),
            Err(BacktestError::Config(_))
        ));
    }

    #[test]
    fn flat_series_with_zero_weights_produces_no_trades() {
        let candles = hourly_candles(&[100.0; 60]);
        let config = StrategyConfig {
            trend_weight: 0.0,
            mean_rev_weight: 0.0,
            carry_weight: 0.0,
            signal_threshold: 0.2,
            ..StrategyConfig::default()
        };

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.final_capital, dec!(10000));
        // One point per simulated bar from the first valid indicator bar.
        assert_eq!(result.equity_curve.len(), 60 - (WARMUP_PERIOD - 1));
        for point in &result.equity_curve {
            assert_eq!(point.equity, dec!(10000));
            assert!((point.drawdown_pct - 0.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn rising_series_enters_long_and_takes_profit() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + f64::from(i)).collect();
        let candles = hourly_candles(&closes);
        let config = trend_only_config(0.05, 0.5, 0.02);

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        assert!(!result.trades.is_empty());
        for trade in &result.trades {
            assert_eq!(trade.side, TradeSide::Long);
            assert!(trade.exit_timestamp > trade.entry_timestamp);
            assert!(trade.pnl > Decimal::ZERO);
        }
        assert!(result.final_capital > dec!(10000));
    }

    #[test]
    fn falling_series_enters_short() {
        let closes: Vec<f64> = (0..80).map(|i| 500.0 - f64::from(i) * 2.0).collect();
        let candles = hourly_candles(&closes);
        let config = trend_only_config(0.05, 0.5, 0.02);

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        assert!(!result.trades.is_empty());
        for trade in &result.trades {
            assert_eq!(trade.side, TradeSide::Short);
            assert!(trade.pnl > Decimal::ZERO);
        }
    }

    #[test]
    fn final_capital_equals_initial_plus_trade_pnl_exactly() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (f64::from(i) * 0.35).sin() * 10.0 + f64::from(i) * 0.5)
            .collect();
        let candles = hourly_candles(&closes);
        let config = trend_only_config(0.02, 0.03, 0.04);

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        let pnl_sum: Decimal = result.trades.iter().map(|t| t.pnl).sum();
        assert_eq!(result.final_capital, dec!(10000) + pnl_sum);
    }

    #[test]
    fn simulation_is_deterministic() {
        let closes: Vec<f64> = (0..100)
            .map(|i| 100.0 + (f64::from(i) * 0.7).sin() * 8.0)
            .collect();
        let candles = hourly_candles(&closes);
        let config = trend_only_config(0.01, 0.02, 0.03);

        let first = simulate(&candles, &config, dec!(10000)).unwrap();
        let second = simulate(&candles, &config, dec!(10000)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn open_position_is_force_closed_at_series_end() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + f64::from(i)).collect();
        let candles = hourly_candles(&closes);
        // Exits unreachable except by the forced close.
        let config = trend_only_config(0.05, 10.0, 10.0);

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_timestamp, candles[candles.len() - 1].timestamp);
        assert!(trade.exit_timestamp > trade.entry_timestamp);
    }

    #[test]
    fn position_size_respects_hard_cap() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + f64::from(i)).collect();
        let candles = hourly_candles(&closes);
        // max_position_size above the cap must not defeat it.
        let config = StrategyConfig {
            max_position_size: 5.0,
            ..trend_only_config(0.05, 10.0, 10.0)
        };

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        let expected_size = dec!(10000) * dec!(0.95) / trade.entry_price;
        assert_eq!(trade.size, expected_size);
    }

    #[test]
    fn equity_peak_is_non_decreasing_and_drawdown_bounded() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (f64::from(i) * 0.5).sin() * 15.0)
            .collect();
        let candles = hourly_candles(&closes);
        let config = trend_only_config(0.01, 0.05, 0.05);

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        let mut peak = Decimal::ZERO;
        for point in &result.equity_curve {
            if point.equity > peak {
                peak = point.equity;
            }
            assert!(point.drawdown_pct >= 0.0);
            assert!(point.drawdown_pct <= 100.0);
            let expected = ((peak - point.equity) / peak * dec!(100))
                .to_f64()
                .unwrap();
            assert!((point.drawdown_pct - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn stop_loss_closes_losing_long() {
        // Rise to trigger a long entry, then collapse to trip the stop.
        let mut closes: Vec<f64> = (0..55).map(|i| 100.0 + f64::from(i) * 2.0).collect();
        closes.extend((0..15).map(|i| 208.0 - f64::from(i) * 20.0));
        let candles = hourly_candles(&closes);
        let config = trend_only_config(0.05, 0.02, 5.0);

        let result = simulate(&candles, &config, dec!(10000)).unwrap();

        assert!(result
            .trades
            .iter()
            .any(|t| t.side == TradeSide::Long && t.pnl < Decimal::ZERO));
        let pnl_sum: Decimal = result.trades.iter().map(|t| t.pnl).sum();
        assert_eq!(result.final_capital, dec!(10000) + pnl_sum);
    }
}
