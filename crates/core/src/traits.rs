//! Seams to the external collaborators: market data, order submission, and
//! run persistence. The engine core never fetches, routes, or stores on its
//! own; everything crosses one of these traits.

use crate::candle::Candle;
use crate::order::OrderRequest;
use crate::run::RunRecord;
use anyhow::Result;
use async_trait::async_trait;

/// Delivers ordered OHLCV candles for (symbol, interval).
#[async_trait]
pub trait CandleFeed: Send + Sync {
    /// Returns up to `limit` most recent candles, ascending by timestamp.
    async fn recent_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<Candle>>;
}

/// Submits validated orders and returns the exchange's raw response payload.
/// Only the order normalizer may interpret that payload.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit_order(&self, order: &OrderRequest) -> Result<serde_json::Value>;

    /// Cancels every outstanding order for the symbol, returning how many
    /// were canceled. Used by the kill path only.
    async fn cancel_all(&self, symbol: &str) -> Result<u32>;
}

/// Read/write access to the persisted run record. Reads are a snapshot;
/// writes are the authoritative state change.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn load(&self, run_id: &str) -> Result<Option<RunRecord>>;
    async fn save(&self, record: &RunRecord) -> Result<()>;
}
