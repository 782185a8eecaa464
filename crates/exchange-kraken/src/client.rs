use crate::error::ExchangeError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tradeforge_core::{Candle, CandleFeed, ExchangeConfig, OrderGateway, OrderKind, OrderRequest, OrderSide};

/// REST client for Kraken. Every call is bounded by the configured request
/// timeout; a timeout surfaces as `ExchangeError::Timeout`, which the
/// orchestrator counts as a live-action failure.
pub struct KrakenClient {
    http_client: Client,
    base_url: String,
    request_timeout: Duration,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
}

impl KrakenClient {
    #[must_use]
    pub fn new(base_url: String, request_timeout_secs: u64) -> Self {
        // Kraken REST allows roughly one sustained request per second.
        let quota = Quota::per_second(NonZeroU32::new(1).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            http_client: Client::new(),
            base_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            rate_limiter,
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.api_url.clone(), config.request_timeout_secs)
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, ExchangeError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, endpoint);
        let request = async {
            let response = self.http_client.get(&url).query(query).send().await?;
            let json = response.json::<Value>().await?;
            Ok::<_, ExchangeError>(json)
        };
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::Timeout {
                timeout_secs: self.request_timeout.as_secs(),
            }),
        }
    }

    async fn post(&self, endpoint: &str, form: &[(&str, String)]) -> Result<Value, ExchangeError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, endpoint);
        let request = async {
            let response = self.http_client.post(&url).form(form).send().await?;
            let json = response.json::<Value>().await?;
            Ok::<_, ExchangeError>(json)
        };
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::Timeout {
                timeout_secs: self.request_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl OrderGateway for KrakenClient {
    async fn submit_order(&self, order: &OrderRequest) -> Result<Value> {
        let mut form: Vec<(&str, String)> = vec![
            ("pair", order.symbol.clone()),
            (
                "type",
                match order.side {
                    OrderSide::Buy => "buy".to_string(),
                    OrderSide::Sell => "sell".to_string(),
                },
            ),
            (
                "ordertype",
                match order.kind {
                    OrderKind::Market => "market".to_string(),
                    OrderKind::Limit => "limit".to_string(),
                },
            ),
            ("volume", order.volume.to_string()),
        ];
        if let Some(price) = order.price {
            form.push(("price", price.to_string()));
        }

        tracing::debug!(symbol = %order.symbol, side = ?order.side, "submitting order");
        // The raw payload goes back untouched; only the normalizer may
        // interpret it.
        let response = self.post("/0/private/AddOrder", &form).await?;
        Ok(response)
    }

    async fn cancel_all(&self, symbol: &str) -> Result<u32> {
        let response = self.post("/0/private/CancelAll", &[]).await?;

        if let Some(errors) = response.get("error").and_then(Value::as_array) {
            if !errors.is_empty() {
                let joined = errors
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(ExchangeError::Rejected(joined).into());
            }
        }

        let count = response
            .get("result")
            .and_then(|r| r.get("count"))
            .and_then(Value::as_u64)
            .ok_or_else(|| ExchangeError::Malformed("missing cancel count".to_string()))?;

        tracing::info!(symbol, count, "canceled outstanding orders");
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl CandleFeed for KrakenClient {
    async fn recent_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let minutes = interval_minutes(interval)?;
        let response = self
            .get(
                "/0/public/OHLC",
                &[
                    ("pair", symbol.to_string()),
                    ("interval", minutes.to_string()),
                ],
            )
            .await?;
        let candles = parse_ohlc(&response, limit)?;
        Ok(candles)
    }
}

/// Maps a human interval label to Kraken's minute granularity.
fn interval_minutes(interval: &str) -> Result<u32, ExchangeError> {
    match interval {
        "1m" => Ok(1),
        "5m" => Ok(5),
        "15m" => Ok(15),
        "30m" => Ok(30),
        "1h" => Ok(60),
        "4h" => Ok(240),
        "1d" => Ok(1440),
        other => Err(ExchangeError::Malformed(format!(
            "unsupported interval: {other}"
        ))),
    }
}

/// Parses the OHLC envelope: `result` holds one array of rows keyed by pair
/// name plus a `last` cursor. Rows are
/// `[time, open, high, low, close, vwap, volume, count]`.
fn parse_ohlc(value: &Value, limit: usize) -> Result<Vec<Candle>, ExchangeError> {
    if let Some(errors) = value.get("error").and_then(Value::as_array) {
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ExchangeError::Rejected(joined));
        }
    }

    let result = value
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| ExchangeError::Malformed("missing result object".to_string()))?;

    let rows = result
        .iter()
        .find(|(key, _)| key.as_str() != "last")
        .and_then(|(_, v)| v.as_array())
        .ok_or_else(|| ExchangeError::Malformed("no OHLC series in result".to_string()))?;

    let start = rows.len().saturating_sub(limit);
    let mut candles = Vec::with_capacity(rows.len() - start);
    for row in &rows[start..] {
        let candle = parse_ohlc_row(row)
            .ok_or_else(|| ExchangeError::Malformed(format!("bad OHLC row: {row}")))?;
        candles.push(candle);
    }
    Ok(candles)
}

fn parse_ohlc_row(row: &Value) -> Option<Candle> {
    let fields = row.as_array()?;

    let secs = fields.first().and_then(|v| {
        #[allow(clippy::cast_possible_truncation)]
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    })?;
    let timestamp = Utc.timestamp_opt(secs, 0).single()?;

    let decimal_at = |index: usize| -> Option<Decimal> {
        let field = fields.get(index)?;
        if let Some(text) = field.as_str() {
            Decimal::from_str(text).ok()
        } else {
            field.as_f64().and_then(|f| Decimal::try_from(f).ok())
        }
    };

    Some(Candle {
        timestamp,
        open: decimal_at(1)?,
        high: decimal_at(2)?,
        low: decimal_at(3)?,
        close: decimal_at(4)?,
        volume: decimal_at(6)?,
    })
}
