use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tradeforge_core::{ExchangeConfig, OrderGateway, OrderRequest, RunMode};
use tradeforge_kraken::{KrakenClient, PaperGateway};

/// Type-safe wrapper over the two execution modes.
///
/// # Safety
///
/// Physical type separation prevents accidental live trading when configured
/// for paper mode: the Paper variant holds no client, no credentials, and
/// makes zero API calls.
pub enum GatewayWrapper {
    /// Live trading: real orders through the Kraken REST client.
    Live(Box<KrakenClient>),
    /// Paper trading: locally synthesized fills.
    Paper(PaperGateway),
}

impl GatewayWrapper {
    #[must_use]
    pub fn for_mode(mode: RunMode, exchange: &ExchangeConfig) -> Self {
        match mode {
            RunMode::Live => Self::Live(Box::new(KrakenClient::from_config(exchange))),
            RunMode::Paper => Self::Paper(PaperGateway::new()),
        }
    }
}

#[async_trait]
impl OrderGateway for GatewayWrapper {
    async fn submit_order(&self, order: &OrderRequest) -> Result<Value> {
        match self {
            Self::Live(client) => client.submit_order(order).await,
            Self::Paper(gateway) => gateway.submit_order(order).await,
        }
    }

    async fn cancel_all(&self, symbol: &str) -> Result<u32> {
        match self {
            Self::Live(client) => client.cancel_all(symbol).await,
            Self::Paper(gateway) => gateway.cancel_all(symbol).await,
        }
    }
}
