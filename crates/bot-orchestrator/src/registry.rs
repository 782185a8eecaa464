use crate::commands::{RunConfig, RunSnapshot};
use crate::controls::SafetyControls;
use crate::gateway::GatewayWrapper;
use crate::run_actor::{RunActor, RunDeps};
use crate::run_handle::RunHandle;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tradeforge_core::{CandleFeed, ExchangeConfig, OrderGateway, RunStore};

const MAILBOX_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Spawns and tracks run actors. Each run gets its own tokio task and
/// mailbox; the registry only hands out handles.
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<String, RunHandle>>>,
    candle_feed: Arc<dyn CandleFeed>,
    store: Arc<dyn RunStore>,
    controls: Arc<SafetyControls>,
    exchange: ExchangeConfig,
}

impl RunRegistry {
    #[must_use]
    pub fn new(
        candle_feed: Arc<dyn CandleFeed>,
        store: Arc<dyn RunStore>,
        controls: Arc<SafetyControls>,
        exchange: ExchangeConfig,
    ) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            candle_feed,
            store,
            controls,
            exchange,
        }
    }

    /// Spawns a run with the gateway matching its mode: the Kraken REST
    /// client for live, the paper gateway otherwise.
    ///
    /// # Errors
    /// Returns an error if a run with this id already exists.
    pub async fn spawn_run(&self, config: RunConfig) -> Result<RunHandle> {
        let gateway = GatewayWrapper::for_mode(config.mode, &self.exchange);
        self.spawn_run_with_gateway(config, Box::new(gateway)).await
    }

    /// Spawns a run with an explicit gateway. Lets callers substitute their
    /// own `OrderGateway` implementation.
    ///
    /// # Errors
    /// Returns an error if a run with this id already exists.
    pub async fn spawn_run_with_gateway(
        &self,
        config: RunConfig,
        gateway: Box<dyn OrderGateway>,
    ) -> Result<RunHandle> {
        let run_id = config.run_id.clone();
        if self.runs.read().await.contains_key(&run_id) {
            bail!("run {run_id} already exists");
        }

        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(RunSnapshot::initial(&config));

        let deps = RunDeps {
            gateway,
            candle_feed: Arc::clone(&self.candle_feed),
            store: Arc::clone(&self.store),
            controls: Arc::clone(&self.controls),
            call_timeout: Duration::from_secs(self.exchange.request_timeout_secs),
        };

        let handle = RunHandle::new(tx, event_tx.clone(), status_rx);
        let actor = RunActor::new(config, rx, deps, event_tx, status_tx);
        let task_run_id = run_id.clone();
        tokio::spawn(async move {
            if let Err(e) = actor.run().await {
                tracing::error!(run_id = %task_run_id, "run actor failed: {e}");
            }
        });

        self.runs.write().await.insert(run_id, handle.clone());
        Ok(handle)
    }

    #[must_use]
    pub async fn get_run(&self, run_id: &str) -> Option<RunHandle> {
        self.runs.read().await.get(run_id).cloned()
    }

    #[must_use]
    pub async fn list_runs(&self) -> Vec<String> {
        self.runs.read().await.keys().cloned().collect()
    }

    /// Shuts the run's actor down and drops its handle. The persisted run
    /// record survives; spawning the same id later resumes it.
    ///
    /// # Errors
    /// Returns an error if the shutdown command cannot be delivered.
    pub async fn remove_run(&self, run_id: &str) -> Result<()> {
        let handle = self.runs.write().await.remove(run_id);
        if let Some(handle) = handle {
            handle.shutdown().await?;
        }
        Ok(())
    }

    /// Shuts down every registered run actor.
    ///
    /// # Errors
    /// Returns an error if any shutdown command cannot be delivered.
    pub async fn shutdown_all(&self) -> Result<()> {
        let handles: Vec<_> = self.runs.read().await.values().cloned().collect();
        for handle in handles {
            handle.shutdown().await?;
        }
        Ok(())
    }

    /// Emergency stop for every run: each actor cancels its outstanding
    /// orders and lands in stopped.
    ///
    /// # Errors
    /// Returns an error if any kill command cannot be delivered.
    pub async fn kill_all(&self) -> Result<()> {
        let handles: Vec<_> = self.runs.read().await.values().cloned().collect();
        for handle in handles {
            handle.kill().await?;
        }
        Ok(())
    }
}
