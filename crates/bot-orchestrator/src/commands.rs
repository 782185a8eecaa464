use crate::events::RunEvent;
use crate::ledger::OpenPosition;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tradeforge_core::{GateDecision, RunMode, RunRecord, RunStatus};
use tradeforge_strategy::{StrategyConfig, WARMUP_PERIOD};

#[derive(Debug)]
pub enum RunCommand {
    Start,
    Stop,
    Pause,
    Resume,
    /// Emergency stop: synchronously cancels all outstanding orders for the
    /// run before reporting stopped. The only command with cancel semantics.
    Kill,
    /// Explicit opt-in for live submission; also resets the failure counter.
    Arm,
    Disarm,
    /// One decision cycle, driven by the external scheduler.
    Tick,
    GetStatus(oneshot::Sender<RunSnapshot>),
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_id: String,
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default = "default_warmup_periods")]
    pub warmup_periods: usize,
    /// Rolling candle history retained per run.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Whether exchange credentials resolve for this run. Resolution itself
    /// is the secrets collaborator's job; the gate only consumes the result.
    #[serde(default)]
    pub secrets_ready: bool,
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_initial_capital() -> Decimal {
    Decimal::from(10000)
}

const fn default_warmup_periods() -> usize {
    WARMUP_PERIOD
}

const fn default_max_history() -> usize {
    500
}

/// Point-in-time view of a run published to watchers after every command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub record: RunRecord,
    pub equity: Decimal,
    pub realized_pnl: Decimal,
    pub open_position: Option<OpenPosition>,
    pub last_gate_decision: Option<GateDecision>,
    pub recent_events: Vec<RunEvent>,
}

impl RunSnapshot {
    /// Snapshot for a freshly spawned run that has not processed anything.
    #[must_use]
    pub fn initial(config: &RunConfig) -> Self {
        let mut record = RunRecord::new(config.run_id.clone(), config.symbol.clone(), config.mode);
        record.status = RunStatus::Stopped;
        Self {
            record,
            equity: config.initial_capital,
            realized_pnl: Decimal::ZERO,
            open_position: None,
            last_gate_decision: None,
            recent_events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_apply_from_minimal_json() {
        let config: RunConfig =
            serde_json::from_str(r#"{"run_id": "r1", "symbol": "XBTUSD"}"#).unwrap();

        assert_eq!(config.interval, "1m");
        assert_eq!(config.mode, RunMode::Paper);
        assert_eq!(config.initial_capital, Decimal::from(10000));
        assert_eq!(config.warmup_periods, WARMUP_PERIOD);
        assert_eq!(config.max_history, 500);
        assert!(!config.secrets_ready);
    }

    #[test]
    fn initial_snapshot_is_stopped_with_full_capital() {
        let config: RunConfig =
            serde_json::from_str(r#"{"run_id": "r1", "symbol": "XBTUSD"}"#).unwrap();
        let snapshot = RunSnapshot::initial(&config);

        assert_eq!(snapshot.record.status, RunStatus::Stopped);
        assert_eq!(snapshot.equity, config.initial_capital);
        assert!(snapshot.open_position.is_none());
        assert!(snapshot.recent_events.is_empty());
    }
}
