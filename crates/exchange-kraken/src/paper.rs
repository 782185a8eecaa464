use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tradeforge_core::{OrderGateway, OrderRequest, OrderSide};

/// Paper-trading gateway: synthesizes accepted responses locally.
///
/// # Safety
///
/// This gateway makes **zero API calls** to the exchange. It is impossible to
/// execute real trades through it, which is what makes paper mode safe to run
/// with live market data.
pub struct PaperGateway {
    next_txid: AtomicU64,
}

impl PaperGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_txid: AtomicU64::new(1),
        }
    }
}

impl Default for PaperGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn submit_order(&self, order: &OrderRequest) -> Result<Value> {
        let id = self.next_txid.fetch_add(1, Ordering::SeqCst);
        let side = match order.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        // Same envelope shape the live exchange returns, so the normalizer
        // path is identical in both modes.
        Ok(json!({
            "error": [],
            "result": {
                "txid": [format!("PAPER-{id:08}")],
                "descr": {
                    "order": format!("{side} {} {} @ market", order.volume, order.symbol)
                }
            }
        }))
    }

    async fn cancel_all(&self, _symbol: &str) -> Result<u32> {
        // Paper fills are instantaneous; nothing is ever outstanding.
        Ok(0)
    }
}
