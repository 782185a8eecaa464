use crate::gate::GateContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub live: LiveSafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub api_url: String,
    /// Upper bound for any single exchange call; a timeout counts as a
    /// live-action failure.
    pub request_timeout_secs: u64,
}

/// Operator-controlled safety settings for live trading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSafetyConfig {
    /// Global live-trading flag. Off by default: paper is the safe default.
    pub live_trading_enabled: bool,
    /// Emergency flag that unconditionally blocks live submission.
    pub kill_switch_active: bool,
    /// Minimum gap between successive live actions, in seconds.
    pub cooldown_seconds: u64,
    /// Consecutive failures that trip the circuit breaker.
    pub failure_threshold: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig {
                api_url: "https://api.kraken.com".to_string(),
                request_timeout_secs: 10,
            },
            live: LiveSafetyConfig::default(),
        }
    }
}

impl Default for LiveSafetyConfig {
    fn default() -> Self {
        Self {
            live_trading_enabled: false,
            kill_switch_active: false,
            cooldown_seconds: 60,
            failure_threshold: 3,
        }
    }
}

impl LiveSafetyConfig {
    /// Builds the gate inputs from this config plus the per-run secrets
    /// resolution result.
    #[must_use]
    pub fn gate_context(&self, secrets_ready: bool) -> GateContext {
        GateContext {
            live_trading_enabled: self.live_trading_enabled,
            kill_switch_active: self.kill_switch_active,
            secrets_ready,
            cooldown: chrono::Duration::seconds(i64::try_from(self.cooldown_seconds).unwrap_or(i64::MAX)),
        }
    }
}
