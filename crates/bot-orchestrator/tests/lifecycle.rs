//! End-to-end lifecycle tests: registry, actor, safety gate, and circuit
//! breaker working together over stub collaborators.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tradeforge_bot_orchestrator::{
    MemoryRunStore, RunConfig, RunEvent, RunRegistry, SafetyControls,
};
use tradeforge_core::{
    BlockReason, Candle, CandleFeed, ExchangeConfig, LiveSafetyConfig, OrderGateway, OrderRequest,
    RunMode, RunStatus,
};
use tradeforge_strategy::{StrategyConfig, WARMUP_PERIOD};

/// Serves the same fixed candle series on every fetch.
struct StaticFeed {
    candles: Vec<Candle>,
}

#[async_trait]
impl CandleFeed for StaticFeed {
    async fn recent_candles(
        &self,
        _symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> Result<Vec<Candle>> {
        Ok(self.candles.clone())
    }
}

/// Always fails, as an unreachable market-data collaborator would.
struct FailingFeed;

#[async_trait]
impl CandleFeed for FailingFeed {
    async fn recent_candles(
        &self,
        _symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> Result<Vec<Candle>> {
        Err(anyhow!("feed unreachable"))
    }
}

/// Accepts every order and counts cancel-all invocations.
struct CountingGateway {
    cancels: Arc<AtomicU32>,
}

#[async_trait]
impl OrderGateway for CountingGateway {
    async fn submit_order(&self, _order: &OrderRequest) -> Result<Value> {
        Ok(json!({"error": [], "result": {"txid": ["TX-1"]}}))
    }

    async fn cancel_all(&self, _symbol: &str) -> Result<u32> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(2)
    }
}

fn rising_candles(len: usize) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let price = Decimal::from(100 + i as i64);
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

fn trend_strategy() -> StrategyConfig {
    StrategyConfig {
        trend_weight: 1.0,
        mean_rev_weight: 0.0,
        carry_weight: 0.0,
        signal_threshold: 0.05,
        stop_loss: 0.5,
        take_profit: 0.5,
        max_position_size: 0.2,
    }
}

fn run_config(run_id: &str, mode: RunMode, secrets_ready: bool) -> RunConfig {
    RunConfig {
        run_id: run_id.to_string(),
        symbol: "XBTUSD".to_string(),
        interval: "1m".to_string(),
        mode,
        initial_capital: dec!(10000),
        strategy: trend_strategy(),
        warmup_periods: WARMUP_PERIOD,
        max_history: 500,
        secrets_ready,
    }
}

fn registry_with(feed: Arc<dyn CandleFeed>, live: LiveSafetyConfig) -> RunRegistry {
    RunRegistry::new(
        feed,
        Arc::new(MemoryRunStore::new()),
        Arc::new(SafetyControls::new(live)),
        ExchangeConfig {
            api_url: "https://api.kraken.com".to_string(),
            request_timeout_secs: 5,
        },
    )
}

fn open_live_config() -> LiveSafetyConfig {
    LiveSafetyConfig {
        live_trading_enabled: true,
        kill_switch_active: false,
        cooldown_seconds: 60,
        failure_threshold: 3,
    }
}

#[tokio::test]
async fn paper_run_walks_the_full_lifecycle() {
    let registry = registry_with(
        Arc::new(StaticFeed {
            candles: rising_candles(60),
        }),
        LiveSafetyConfig::default(),
    );
    let handle = registry
        .spawn_run(run_config("r1", RunMode::Paper, false))
        .await
        .unwrap();

    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Stopped);

    handle.start().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Running);

    handle.pause().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Paused);

    handle.resume().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Running);

    handle.stop().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Stopped);
}

#[tokio::test]
async fn invalid_transitions_leave_state_unchanged() {
    let registry = registry_with(
        Arc::new(StaticFeed {
            candles: rising_candles(60),
        }),
        LiveSafetyConfig::default(),
    );
    let handle = registry
        .spawn_run(run_config("r1", RunMode::Paper, false))
        .await
        .unwrap();

    // Pause and resume are only valid around running.
    handle.pause().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Stopped);

    handle.resume().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Stopped);

    handle.start().await.unwrap();
    handle.resume().await.unwrap();
    assert_eq!(handle.status().await.unwrap().record.status, RunStatus::Running);
}

#[tokio::test]
async fn kill_cancels_outstanding_orders_but_stop_does_not() {
    let cancels = Arc::new(AtomicU32::new(0));
    let registry = registry_with(
        Arc::new(StaticFeed {
            candles: rising_candles(60),
        }),
        LiveSafetyConfig::default(),
    );

    let handle = registry
        .spawn_run_with_gateway(
            run_config("r1", RunMode::Paper, false),
            Box::new(CountingGateway {
                cancels: Arc::clone(&cancels),
            }),
        )
        .await
        .unwrap();

    handle.start().await.unwrap();
    handle.stop().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.status, RunStatus::Stopped);
    assert_eq!(cancels.load(Ordering::SeqCst), 0, "stop must not cancel");

    handle.start().await.unwrap();
    handle.kill().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.status, RunStatus::Stopped);
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| matches!(e, RunEvent::OrdersCanceled { count: 2, .. })));
}

#[tokio::test]
async fn blocked_live_tick_reports_every_reason() {
    // Live trading disabled globally, run unarmed, secrets unresolved: the
    // decision must carry all three blockers at once.
    let registry = registry_with(
        Arc::new(StaticFeed {
            candles: rising_candles(60),
        }),
        LiveSafetyConfig::default(),
    );
    let handle = registry
        .spawn_run(run_config("r1", RunMode::Live, false))
        .await
        .unwrap();

    handle.start().await.unwrap();
    handle.tick().await.unwrap();

    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.status, RunStatus::Running);

    let decision = snapshot.last_gate_decision.expect("gate must be consulted");
    assert!(!decision.allowed);
    for reason in [
        BlockReason::LiveDisabled,
        BlockReason::LiveNotArmed,
        BlockReason::SecretsNotReady,
    ] {
        assert!(decision.is_blocked_by(reason), "missing {reason:?}");
    }
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| matches!(e, RunEvent::GateBlocked { .. })));
}

#[tokio::test]
async fn feed_failures_trip_the_breaker_and_rearm_recovers() {
    let registry = registry_with(Arc::new(FailingFeed), open_live_config());
    let handle = registry
        .spawn_run_with_gateway(
            run_config("r1", RunMode::Live, true),
            Box::new(CountingGateway {
                cancels: Arc::new(AtomicU32::new(0)),
            }),
        )
        .await
        .unwrap();

    handle.arm().await.unwrap();
    handle.start().await.unwrap();

    handle.tick().await.unwrap();
    handle.tick().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.live_failure_count, 2);
    assert_eq!(snapshot.record.status, RunStatus::Running);

    // Third consecutive failure reaches the threshold exactly.
    handle.tick().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.status, RunStatus::Error);
    assert_eq!(snapshot.record.live_failure_count, 3);
    assert!(!snapshot.record.live_armed, "trip must disarm");
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| matches!(e, RunEvent::CircuitTripped { failure_count: 3, .. })));

    // Ticks in error state are ignored; the counter stays put.
    handle.tick().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.live_failure_count, 3);

    // Manual re-arm plus restart brings the run back with a clean counter.
    handle.arm().await.unwrap();
    handle.start().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.status, RunStatus::Running);
    assert_eq!(snapshot.record.live_failure_count, 0);
    assert!(snapshot.record.live_armed);
}

#[tokio::test]
async fn successful_live_submission_resets_counter_and_starts_cooldown() {
    let registry = registry_with(
        Arc::new(StaticFeed {
            candles: rising_candles(60),
        }),
        open_live_config(),
    );
    let handle = registry
        .spawn_run_with_gateway(
            run_config("r1", RunMode::Live, true),
            Box::new(CountingGateway {
                cancels: Arc::new(AtomicU32::new(0)),
            }),
        )
        .await
        .unwrap();

    handle.arm().await.unwrap();
    handle.start().await.unwrap();

    // Rising series, trend-only config: the signal clears the threshold, the
    // gate is open, the order goes out.
    handle.tick().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.record.live_failure_count, 0);
    assert!(snapshot.record.last_live_action_at.is_some());
    assert!(snapshot.open_position.is_some());
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| matches!(e, RunEvent::OrderSubmitted { .. })));

    // The next tick falls inside the cooldown window.
    handle.tick().await.unwrap();
    let snapshot = handle.status().await.unwrap();
    let decision = snapshot.last_gate_decision.unwrap();
    assert!(!decision.allowed);
    assert!(decision.is_blocked_by(BlockReason::CooldownActive));
}

#[tokio::test]
async fn paper_ticks_never_consult_the_gate() {
    // Kill switch on and live trading off: a paper run trades anyway, since
    // no capital is at risk.
    let registry = registry_with(
        Arc::new(StaticFeed {
            candles: rising_candles(60),
        }),
        LiveSafetyConfig {
            kill_switch_active: true,
            ..LiveSafetyConfig::default()
        },
    );
    let handle = registry
        .spawn_run(run_config("r1", RunMode::Paper, false))
        .await
        .unwrap();

    handle.start().await.unwrap();
    handle.tick().await.unwrap();

    let snapshot = handle.status().await.unwrap();
    assert!(snapshot.last_gate_decision.is_none());
    assert!(snapshot.open_position.is_some());
    assert!(snapshot
        .recent_events
        .iter()
        .any(|e| matches!(e, RunEvent::OrderSubmitted { .. })));
}
