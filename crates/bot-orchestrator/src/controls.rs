//! Operator-mutable safety switches, shared across every run. Gate inputs
//! are read fresh on each tick, never cached, because the kill switch and
//! the live-trading flag can flip while runs sit in `running`.

use parking_lot::RwLock;
use tradeforge_core::{GateContext, LiveSafetyConfig};

pub struct SafetyControls {
    state: RwLock<LiveSafetyConfig>,
}

impl SafetyControls {
    #[must_use]
    pub fn new(config: LiveSafetyConfig) -> Self {
        Self {
            state: RwLock::new(config),
        }
    }

    pub fn set_live_trading_enabled(&self, enabled: bool) {
        self.state.write().live_trading_enabled = enabled;
        tracing::info!(enabled, "live trading flag changed");
    }

    pub fn set_kill_switch(&self, active: bool) {
        self.state.write().kill_switch_active = active;
        if active {
            tracing::warn!("kill switch engaged: live submission blocked globally");
        } else {
            tracing::info!("kill switch released");
        }
    }

    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.state.read().failure_threshold
    }

    /// Current gate inputs, combined with the per-run secrets resolution
    /// result.
    #[must_use]
    pub fn gate_context(&self, secrets_ready: bool) -> GateContext {
        self.state.read().gate_context(secrets_ready)
    }
}

impl Default for SafetyControls {
    fn default() -> Self {
        Self::new(LiveSafetyConfig::default())
    }
}
