//! Aggregate return/risk statistics over a finished simulation. Every ratio
//! guards its denominator and reports 0 instead of NaN or infinity.

use crate::simulator::SimulationResult;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Annualization constant for per-trade return ratios.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return_pct: f64,
    pub win_rate_pct: f64,
    pub profit_factor: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub num_trades: usize,
}

impl PerformanceMetrics {
    #[must_use]
    pub fn from_simulation(initial_capital: Decimal, result: &SimulationResult) -> Self {
        let total_return_pct = if initial_capital > Decimal::ZERO {
            ((result.final_capital - initial_capital) / initial_capital * dec!(100))
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let trades = &result.trades;
        let num_trades = trades.len();
        let win_count = trades.iter().filter(|t| t.pnl > Decimal::ZERO).count();

        #[allow(clippy::cast_precision_loss)]
        let win_rate_pct = if num_trades > 0 {
            win_count as f64 / num_trades as f64 * 100.0
        } else {
            0.0
        };

        let gross_win: Decimal = trades
            .iter()
            .filter(|t| t.pnl > Decimal::ZERO)
            .map(|t| t.pnl)
            .sum();
        let gross_loss: Decimal = trades
            .iter()
            .filter(|t| t.pnl < Decimal::ZERO)
            .map(|t| -t.pnl)
            .sum();
        let profit_factor = if gross_loss > Decimal::ZERO {
            (gross_win / gross_loss).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        let max_drawdown_pct = result
            .equity_curve
            .iter()
            .map(|p| p.drawdown_pct)
            .fold(0.0, f64::max);

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percentage).collect();
        let mean_return = mean(&returns);
        let sharpe_ratio = annualized_ratio(mean_return, population_std_dev(&returns));

        let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        let sortino_ratio = if downside.is_empty() {
            0.0
        } else {
            annualized_ratio(mean_return, population_std_dev(&downside))
        };

        Self {
            total_return_pct,
            win_rate_pct,
            profit_factor,
            max_drawdown_pct,
            sharpe_ratio,
            sortino_ratio,
            num_trades,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn annualized_ratio(mean_return: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        let ratio = mean_return / std_dev * TRADING_DAYS_PER_YEAR.sqrt();
        if ratio.is_finite() {
            ratio
        } else {
            0.0
        }
    } else {
        0.0
    }
}
