//! Error types for the Kraken REST integration.

use thiserror::Error;

/// Errors raised by the live exchange client. The orchestrator treats every
/// one of these on the submission path as a live-action failure that feeds
/// the circuit breaker.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The bounded per-call deadline elapsed.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// HTTP-level failure from the exchange.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport failure before any response was produced.
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Exchange refused the request.
    #[error("rejected by exchange: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
