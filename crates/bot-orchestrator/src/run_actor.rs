use crate::commands::{RunCommand, RunConfig, RunSnapshot};
use crate::controls::SafetyControls;
use crate::events::RunEvent;
use crate::ledger::{OpenPosition, PositionLedger};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tradeforge_core::{
    gate, Candle, CandleFeed, GateDecision, OrderGateway, OrderKind, OrderRequest, RunMode,
    RunStatus, RunStore, TradeSide,
};
use tradeforge_kraken::{NormalizedOrder, OrderStatus};
use tradeforge_strategy::{composite_signal, StrategyConfig};

/// Fraction-of-capital ceiling applied to every entry, independent of the
/// configured max position size.
const CAPITAL_HARD_CAP: Decimal = dec!(0.95);

/// Events retained for late subscribers.
const RECENT_EVENT_CAPACITY: usize = 10;

/// External collaborators and shared state a run actor needs.
pub struct RunDeps {
    pub gateway: Box<dyn OrderGateway>,
    pub candle_feed: Arc<dyn CandleFeed>,
    pub store: Arc<dyn RunStore>,
    pub controls: Arc<SafetyControls>,
    /// Bound on every candle-fetch and order call; a timeout counts as a
    /// live-action failure.
    pub call_timeout: Duration,
}

/// What a tick decided to do, before any gate or submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    Exit,
    Enter(TradeSide),
}

/// Entry/exit decision rules, shared in shape with the backtest simulator so
/// paper and live behavior track the simulated behavior.
fn decide_action(
    position: Option<&OpenPosition>,
    signal: f64,
    config: &StrategyConfig,
    close: Decimal,
) -> Option<TickAction> {
    if let Some(open) = position {
        let change = open.favorable_change(close);
        let stop_hit = change <= -config.stop_loss;
        let target_hit = change >= config.take_profit;
        let signal_reversal = match open.side {
            TradeSide::Long => signal < -config.signal_threshold,
            TradeSide::Short => signal > config.signal_threshold,
        };
        if stop_hit || target_hit || signal_reversal {
            return Some(TickAction::Exit);
        }
        return None;
    }

    if signal > config.signal_threshold {
        Some(TickAction::Enter(TradeSide::Long))
    } else if signal < -config.signal_threshold {
        Some(TickAction::Enter(TradeSide::Short))
    } else {
        None
    }
}

/// One actor per run. The mpsc mailbox is the single-writer queue that
/// serializes all mutation of the run record: concurrent ticks for the same
/// run are impossible by construction, while different runs tick in parallel.
pub struct RunActor {
    config: RunConfig,
    record: tradeforge_core::RunRecord,
    rx: mpsc::Receiver<RunCommand>,
    deps: RunDeps,
    history: Vec<Candle>,
    ledger: PositionLedger,
    event_tx: broadcast::Sender<RunEvent>,
    status_tx: watch::Sender<RunSnapshot>,
    recent_events: VecDeque<RunEvent>,
    last_gate_decision: Option<GateDecision>,
}

impl RunActor {
    #[must_use]
    pub fn new(
        config: RunConfig,
        rx: mpsc::Receiver<RunCommand>,
        deps: RunDeps,
        event_tx: broadcast::Sender<RunEvent>,
        status_tx: watch::Sender<RunSnapshot>,
    ) -> Self {
        let record =
            tradeforge_core::RunRecord::new(config.run_id.clone(), config.symbol.clone(), config.mode);
        let ledger = PositionLedger::new(config.initial_capital);
        Self {
            config,
            record,
            rx,
            deps,
            history: Vec::new(),
            ledger,
            event_tx,
            status_tx,
            recent_events: VecDeque::with_capacity(RECENT_EVENT_CAPACITY),
            last_gate_decision: None,
        }
    }

    /// Runs the actor's command loop until `Shutdown` or the channel closes.
    ///
    /// Per-tick failures never escape this loop; they are recorded as events
    /// and fed to the circuit breaker so the external scheduler survives.
    ///
    /// # Errors
    /// Currently always returns `Ok`; the `Result` keeps the spawn-site
    /// contract uniform with other tasks.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(run_id = %self.config.run_id, "run actor starting");

        // Resume from the persisted record so a restart continues where the
        // previous process left off.
        match self.deps.store.load(&self.config.run_id).await {
            Ok(Some(existing)) => {
                tracing::info!(run_id = %self.config.run_id, "restored persisted run record");
                self.record = existing;
            }
            Ok(None) => {
                self.persist().await;
            }
            Err(e) => {
                tracing::error!(run_id = %self.config.run_id, "failed to load run record: {e}");
            }
        }
        self.publish();

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                RunCommand::Start => self.handle_start().await,
                RunCommand::Stop => self.handle_stop().await,
                RunCommand::Pause => self.handle_pause().await,
                RunCommand::Resume => self.handle_resume().await,
                RunCommand::Kill => self.handle_kill().await,
                RunCommand::Arm => self.handle_arm().await,
                RunCommand::Disarm => self.handle_disarm().await,
                RunCommand::Tick => self.handle_tick().await,
                RunCommand::GetStatus(tx) => {
                    let _ = tx.send(self.snapshot());
                }
                RunCommand::Shutdown => {
                    tracing::info!(run_id = %self.config.run_id, "run actor shutting down");
                    break;
                }
            }
        }

        tracing::info!(run_id = %self.config.run_id, "run actor stopped");
        Ok(())
    }

    async fn handle_start(&mut self) {
        // Start only from stopped or error; restart from error is allowed,
        // though live submission additionally needs a manual re-arm.
        if matches!(self.record.status, RunStatus::Running | RunStatus::Paused) {
            tracing::warn!(
                run_id = %self.config.run_id,
                status = ?self.record.status,
                "ignoring start in current state"
            );
            return;
        }
        self.transition(RunStatus::Running, Utc::now());
        self.persist().await;
        self.publish();
    }

    async fn handle_stop(&mut self) {
        if matches!(self.record.status, RunStatus::Stopped | RunStatus::Error) {
            tracing::warn!(run_id = %self.config.run_id, "already stopped, ignoring stop");
            return;
        }
        // Ordinary stop leaves outstanding orders alone; only kill cancels.
        self.transition(RunStatus::Stopped, Utc::now());
        self.persist().await;
        self.publish();
    }

    async fn handle_pause(&mut self) {
        if self.record.status != RunStatus::Running {
            tracing::warn!(
                run_id = %self.config.run_id,
                status = ?self.record.status,
                "cannot pause: not running"
            );
            return;
        }
        self.transition(RunStatus::Paused, Utc::now());
        self.persist().await;
        self.publish();
    }

    async fn handle_resume(&mut self) {
        if self.record.status != RunStatus::Paused {
            tracing::warn!(
                run_id = %self.config.run_id,
                status = ?self.record.status,
                "cannot resume: not paused"
            );
            return;
        }
        self.transition(RunStatus::Running, Utc::now());
        self.persist().await;
        self.publish();
    }

    /// Emergency stop. Reachable from every state; the only path that
    /// cancels outstanding orders, and it does so before reporting stopped.
    async fn handle_kill(&mut self) {
        let now = Utc::now();
        tracing::warn!(run_id = %self.config.run_id, "kill requested");

        let count = match tokio::time::timeout(
            self.deps.call_timeout,
            self.deps.gateway.cancel_all(&self.config.symbol),
        )
        .await
        {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                self.push_event(RunEvent::Error {
                    message: format!("cancel-all failed during kill: {e}"),
                    timestamp: now,
                });
                0
            }
            Err(_) => {
                self.push_event(RunEvent::Error {
                    message: "cancel-all timed out during kill".to_string(),
                    timestamp: now,
                });
                0
            }
        };
        self.push_event(RunEvent::OrdersCanceled {
            count,
            timestamp: now,
        });

        if self.record.status != RunStatus::Stopped {
            self.transition(RunStatus::Stopped, now);
        }
        self.persist().await;
        self.publish();
    }

    async fn handle_arm(&mut self) {
        let now = Utc::now();
        self.record.arm(now);
        tracing::info!(run_id = %self.config.run_id, "run armed for live submission");
        self.persist().await;
        self.publish();
    }

    async fn handle_disarm(&mut self) {
        self.record.disarm();
        tracing::info!(run_id = %self.config.run_id, "run disarmed");
        self.persist().await;
        self.publish();
    }

    async fn handle_tick(&mut self) {
        let now = Utc::now();
        self.record.touch_heartbeat(now);

        if self.record.status != RunStatus::Running {
            tracing::debug!(
                run_id = %self.config.run_id,
                status = ?self.record.status,
                "tick ignored: run not running"
            );
            return;
        }

        let fetch = tokio::time::timeout(
            self.deps.call_timeout,
            self.deps.candle_feed.recent_candles(
                &self.config.symbol,
                &self.config.interval,
                self.config.warmup_periods,
            ),
        )
        .await;

        match fetch {
            Ok(Ok(candles)) => self.absorb_candles(candles),
            Ok(Err(e)) => {
                self.handle_external_failure(now, &format!("candle fetch failed: {e}"));
                self.persist().await;
                self.publish();
                return;
            }
            Err(_) => {
                self.handle_external_failure(now, "candle fetch timed out");
                self.persist().await;
                self.publish();
                return;
            }
        }

        let Some(latest) = self.history.last().cloned() else {
            tracing::debug!(run_id = %self.config.run_id, "no candles yet, skipping tick");
            self.persist().await;
            self.publish();
            return;
        };

        let signal = composite_signal(
            &self.history,
            self.history.len() - 1,
            &self.config.strategy,
        );
        self.push_event(RunEvent::SignalGenerated {
            signal,
            price: latest.close,
            timestamp: now,
        });

        match self.record.mode {
            RunMode::Paper => {
                if let Some(action) = decide_action(
                    self.ledger.position(),
                    signal,
                    &self.config.strategy,
                    latest.close,
                ) {
                    self.execute_paper(action, &latest, signal, now).await;
                }
            }
            RunMode::Live => {
                // Gate inputs are re-read on every live tick; the kill switch
                // and cooldown can change while the run sits in running.
                let ctx = self.deps.controls.gate_context(self.config.secrets_ready);
                let decision = gate::evaluate(&self.record, &ctx, now);
                self.last_gate_decision = Some(decision.clone());

                if decision.allowed {
                    if let Some(action) = decide_action(
                        self.ledger.position(),
                        signal,
                        &self.config.strategy,
                        latest.close,
                    ) {
                        self.execute_live(action, &latest, signal, now).await;
                    }
                } else {
                    tracing::warn!(
                        run_id = %self.config.run_id,
                        reasons = ?decision.reasons,
                        "live tick blocked by gate"
                    );
                    self.push_event(RunEvent::GateBlocked {
                        reasons: decision.reasons,
                        timestamp: now,
                    });
                }
            }
        }

        self.persist().await;
        self.publish();
    }

    /// Merges freshly fetched candles into the rolling history, keeping it
    /// strictly ascending and bounded.
    fn absorb_candles(&mut self, candles: Vec<Candle>) {
        for candle in candles {
            let newer = self
                .history
                .last()
                .map_or(true, |last| candle.timestamp > last.timestamp);
            if newer {
                self.history.push(candle);
            }
        }
        if self.history.len() > self.config.max_history {
            let excess = self.history.len() - self.config.max_history;
            self.history.drain(0..excess);
        }
    }

    fn order_for(&self, action: TickAction, latest: &Candle, now: DateTime<Utc>) -> Option<OrderRequest> {
        match action {
            TickAction::Exit => {
                let position = self.ledger.position()?;
                Some(OrderRequest {
                    symbol: self.config.symbol.clone(),
                    side: position.side.exit_order_side(),
                    kind: OrderKind::Market,
                    volume: position.size,
                    price: None,
                    timestamp: now,
                })
            }
            TickAction::Enter(side) => {
                let capital = self.ledger.capital();
                if latest.close <= Decimal::ZERO || capital <= Decimal::ZERO {
                    return None;
                }
                let max_position =
                    Decimal::try_from(self.config.strategy.max_position_size).ok()?;
                let notional = (capital * max_position).min(capital * CAPITAL_HARD_CAP);
                let volume = notional / latest.close;
                if volume <= Decimal::ZERO {
                    return None;
                }
                Some(OrderRequest {
                    symbol: self.config.symbol.clone(),
                    side: side.entry_order_side(),
                    kind: OrderKind::Market,
                    volume,
                    price: None,
                    timestamp: now,
                })
            }
        }
    }

    async fn execute_paper(
        &mut self,
        action: TickAction,
        latest: &Candle,
        signal: f64,
        now: DateTime<Utc>,
    ) {
        // Paper mode never consults the gate: no capital is at risk.
        let Some(order) = self.order_for(action, latest, now) else {
            return;
        };

        match self.deps.gateway.submit_order(&order).await {
            Ok(raw) => {
                let normalized = NormalizedOrder::from_value(&raw);
                self.push_event(RunEvent::OrderSubmitted {
                    side: order.side,
                    volume: order.volume,
                    order: normalized,
                    timestamp: now,
                });
                self.apply_fill(action, order.volume, latest, signal, now);
            }
            Err(e) => {
                self.push_event(RunEvent::Error {
                    message: format!("paper submission failed: {e}"),
                    timestamp: now,
                });
            }
        }
    }

    /// Submits a live order. The caller has already cleared the gate for
    /// this tick.
    async fn execute_live(
        &mut self,
        action: TickAction,
        latest: &Candle,
        signal: f64,
        now: DateTime<Utc>,
    ) {
        let Some(order) = self.order_for(action, latest, now) else {
            return;
        };
        self.record.record_live_attempt(now);

        let submission = tokio::time::timeout(
            self.deps.call_timeout,
            self.deps.gateway.submit_order(&order),
        )
        .await;

        match submission {
            Ok(Ok(raw)) => {
                let normalized = NormalizedOrder::from_value(&raw);
                self.push_event(RunEvent::OrderSubmitted {
                    side: order.side,
                    volume: order.volume,
                    order: normalized.clone(),
                    timestamp: now,
                });
                match normalized.status {
                    OrderStatus::Rejected => {
                        self.apply_live_failure(now, "order rejected by exchange");
                    }
                    OrderStatus::Submitted => {
                        self.record.record_live_success(now);
                        self.apply_fill(action, order.volume, latest, signal, now);
                    }
                    OrderStatus::PendingConfirmation | OrderStatus::Canceled => {
                        // Submission status unknown: requires reconciliation.
                        // Neither a success (no counter reset) nor a breaker
                        // failure.
                        tracing::warn!(
                            run_id = %self.config.run_id,
                            "order accepted without id, reconciliation required"
                        );
                    }
                }
            }
            Ok(Err(e)) => {
                self.apply_live_failure(now, &format!("order submission failed: {e}"));
            }
            Err(_) => {
                self.apply_live_failure(now, "order submission timed out");
            }
        }
    }

    /// Updates the ledger after a confirmed (or paper) submission, using the
    /// volume that actually went out on the order.
    fn apply_fill(
        &mut self,
        action: TickAction,
        volume: Decimal,
        latest: &Candle,
        signal: f64,
        now: DateTime<Utc>,
    ) {
        match action {
            TickAction::Exit => {
                if let Some(closed) = self.ledger.close(latest.close) {
                    self.push_event(RunEvent::TradeClosed {
                        pnl: closed.pnl,
                        win: closed.win,
                        timestamp: now,
                    });
                }
            }
            TickAction::Enter(side) => {
                self.ledger
                    .open(side, latest.close, volume, latest.timestamp, signal);
            }
        }
    }

    /// Candle-feed failures and timeouts. For live runs these feed the
    /// circuit breaker exactly like a rejected order.
    fn handle_external_failure(&mut self, now: DateTime<Utc>, message: &str) {
        tracing::error!(run_id = %self.config.run_id, "{message}");
        if self.record.mode == RunMode::Live {
            self.apply_live_failure(now, message);
        } else {
            self.push_event(RunEvent::Error {
                message: message.to_string(),
                timestamp: now,
            });
        }
    }

    /// Advances the failure counter and applies the mandatory trip side
    /// effects: error status and disarm, requiring a manual re-arm.
    fn apply_live_failure(&mut self, now: DateTime<Utc>, message: &str) {
        let threshold = self.deps.controls.failure_threshold();
        let transition = gate::next_failure_state(&self.record, threshold);
        self.record.live_failure_count = transition.next_count;

        self.push_event(RunEvent::Error {
            message: message.to_string(),
            timestamp: now,
        });

        if transition.triggered {
            tracing::error!(
                run_id = %self.config.run_id,
                failures = transition.next_count,
                "circuit breaker tripped, forcing run into error and disarming"
            );
            self.transition(RunStatus::Error, now);
            self.record.disarm();
            self.push_event(RunEvent::CircuitTripped {
                failure_count: transition.next_count,
                timestamp: now,
            });
        }
    }

    fn transition(&mut self, to: RunStatus, now: DateTime<Utc>) {
        let from = self.record.status;
        if from == to {
            return;
        }
        self.record.status = to;
        tracing::info!(run_id = %self.config.run_id, ?from, ?to, "run state changed");
        self.push_event(RunEvent::StateChanged {
            from,
            to,
            timestamp: now,
        });
    }

    fn push_event(&mut self, event: RunEvent) {
        if self.recent_events.len() >= RECENT_EVENT_CAPACITY {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(event.clone());
        // Ignore send errors: no subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    async fn persist(&self) {
        if let Err(e) = self.deps.store.save(&self.record).await {
            tracing::error!(run_id = %self.config.run_id, "failed to persist run record: {e}");
        }
    }

    fn publish(&self) {
        let _ = self.status_tx.send(self.snapshot());
    }

    fn snapshot(&self) -> RunSnapshot {
        let mark = self
            .history
            .last()
            .map_or(Decimal::ZERO, |candle| candle.close);
        RunSnapshot {
            record: self.record.clone(),
            equity: if mark > Decimal::ZERO {
                self.ledger.equity(mark)
            } else {
                self.ledger.capital()
            },
            realized_pnl: self.ledger.realized_pnl(),
            open_position: self.ledger.position().cloned(),
            last_gate_decision: self.last_gate_decision.clone(),
            recent_events: self.recent_events.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn candle(close: Decimal) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
        }
    }

    fn position(side: TradeSide, entry: Decimal) -> OpenPosition {
        OpenPosition {
            side,
            entry_price: entry,
            entry_timestamp: Utc.timestamp_opt(0, 0).unwrap(),
            size: dec!(1),
            signal_at_entry: 0.5,
        }
    }

    #[test]
    fn strong_positive_signal_enters_long() {
        let config = StrategyConfig::default();
        let action = decide_action(None, 0.5, &config, candle(dec!(100)).close);
        assert_eq!(action, Some(TickAction::Enter(TradeSide::Long)));
    }

    #[test]
    fn strong_negative_signal_enters_short() {
        let config = StrategyConfig::default();
        let action = decide_action(None, -0.5, &config, dec!(100));
        assert_eq!(action, Some(TickAction::Enter(TradeSide::Short)));
    }

    #[test]
    fn weak_signal_holds() {
        let config = StrategyConfig::default();
        assert_eq!(decide_action(None, 0.1, &config, dec!(100)), None);
        // Threshold is strict: exactly at threshold does not enter.
        assert_eq!(
            decide_action(None, config.signal_threshold, &config, dec!(100)),
            None
        );
    }

    #[test]
    fn stop_loss_breach_exits() {
        let config = StrategyConfig::default();
        let open = position(TradeSide::Long, dec!(100));
        // Default stop is 2%; price at 97 is a 3% adverse move.
        let action = decide_action(Some(&open), 0.0, &config, dec!(97));
        assert_eq!(action, Some(TickAction::Exit));
    }

    #[test]
    fn take_profit_breach_exits() {
        let config = StrategyConfig::default();
        let open = position(TradeSide::Long, dec!(100));
        // Default take profit is 4%.
        let action = decide_action(Some(&open), 0.0, &config, dec!(105));
        assert_eq!(action, Some(TickAction::Exit));
    }

    #[test]
    fn signal_reversal_exits_held_side() {
        let config = StrategyConfig::default();
        let long = position(TradeSide::Long, dec!(100));
        assert_eq!(
            decide_action(Some(&long), -0.5, &config, dec!(100)),
            Some(TickAction::Exit)
        );

        let short = position(TradeSide::Short, dec!(100));
        assert_eq!(
            decide_action(Some(&short), 0.5, &config, dec!(100)),
            Some(TickAction::Exit)
        );
    }

    #[test]
    fn open_position_within_bounds_holds() {
        let config = StrategyConfig::default();
        let open = position(TradeSide::Long, dec!(100));
        // 1% favorable move, signal agreeing with the held side.
        assert_eq!(decide_action(Some(&open), 0.5, &config, dec!(101)), None);
    }

    #[test]
    fn no_second_entry_while_position_open() {
        let config = StrategyConfig::default();
        let open = position(TradeSide::Long, dec!(100));
        // Strong long signal with an open long: hold, never stack.
        assert_eq!(decide_action(Some(&open), 0.9, &config, dec!(100.5)), None);
    }
}
