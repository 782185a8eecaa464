//! Synchronous backtest result surface. Consumers get the report up front
//! and can page through the full trade list and equity curve separately.

use crate::metrics::PerformanceMetrics;
use crate::simulator::{simulate, BacktestError, SimulationResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradeforge_core::Candle;
use tradeforge_strategy::StrategyConfig;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub backtest_run_id: Uuid,
    pub metrics: PerformanceMetrics,
    pub trades_count: usize,
}

/// Runs a full simulation and aggregates it into a report. Simulation errors
/// abort the run; no partial report is produced.
///
/// # Errors
/// Propagates `BacktestError` from the simulator unchanged.
pub fn run_backtest(
    candles: &[Candle],
    config: &StrategyConfig,
    initial_capital: Decimal,
) -> Result<(BacktestReport, SimulationResult), BacktestError> {
    let result = simulate(candles, config, initial_capital)?;
    let metrics = PerformanceMetrics::from_simulation(initial_capital, &result);
    let report = BacktestReport {
        backtest_run_id: Uuid::new_v4(),
        metrics,
        trades_count: result.trades.len(),
    };
    Ok((report, result))
}

pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn format(
        report: &BacktestReport,
        initial_capital: Decimal,
        final_capital: Decimal,
    ) -> String {
        let mut output = String::new();
        let m = &report.metrics;

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                    BACKTEST RESULTS                           \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');
        output.push_str(&format!("Run ID:                {}\n", report.backtest_run_id));
        output.push('\n');

        output.push_str("Portfolio Performance\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Initial Capital:       ${initial_capital:.2}\n"));
        output.push_str(&format!("Final Capital:         ${final_capital:.2}\n"));
        output.push_str(&format!("Total Return:          {:.2}%\n", m.total_return_pct));
        output.push_str(&format!("Max Drawdown:          {:.2}%\n", m.max_drawdown_pct));
        output.push_str(&format!("Sharpe Ratio:          {:.4}\n", m.sharpe_ratio));
        output.push_str(&format!("Sortino Ratio:         {:.4}\n", m.sortino_ratio));
        output.push('\n');

        output.push_str("Trade Statistics\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Total Trades:          {}\n", m.num_trades));
        if m.num_trades > 0 {
            output.push_str(&format!("Win Rate:              {:.2}%\n", m.win_rate_pct));
            output.push_str(&format!("Profit Factor:         {:.2}\n", m.profit_factor));
        } else {
            output.push_str("Win Rate:              N/A (no trades)\n");
        }

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if m.num_trades == 0 {
            output.push_str("\nNo trades were made during this backtest.\n");
            output.push_str("Consider adjusting strategy parameters or data range.\n\n");
        }

        output
    }
}
