//! The externally persisted run/bot record, referenced by the engine but
//! owned by the persistence collaborator. All mutation for one run must be
//! serialized by the caller (per-run actor mailbox in the orchestrator).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a run risks real capital.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Simulated fills, no real money.
    #[default]
    Paper,
    /// Real order submission, gated by the live-trading safety gate.
    Live,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Stopped,
    Running,
    Paused,
    Error,
}

/// Snapshot of the persisted run record. Reads are a snapshot; writes through
/// the store are the authoritative state change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    pub run_id: String,
    pub symbol: String,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub status: RunStatus,
    /// Explicit opt-in for live submission, distinct from selecting live mode.
    #[serde(default)]
    pub live_armed: bool,
    #[serde(default)]
    pub armed_at: Option<DateTime<Utc>>,
    /// Consecutive live-action failures. Non-negative; reset to zero only by
    /// an explicit successful live action or a manual re-arm.
    #[serde(default)]
    pub live_failure_count: u32,
    #[serde(default)]
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Cooldown base: stamped on every live submission attempt.
    #[serde(default)]
    pub last_live_action_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    #[must_use]
    pub fn new(run_id: impl Into<String>, symbol: impl Into<String>, mode: RunMode) -> Self {
        Self {
            run_id: run_id.into(),
            symbol: symbol.into(),
            mode,
            status: RunStatus::Stopped,
            live_armed: false,
            armed_at: None,
            live_failure_count: 0,
            last_heartbeat_at: None,
            last_live_action_at: None,
        }
    }

    /// Arms the run for live submission. Manual re-arm is an explicit reset
    /// point for the failure counter.
    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.live_armed = true;
        self.armed_at = Some(now);
        self.live_failure_count = 0;
    }

    pub fn disarm(&mut self) {
        self.live_armed = false;
    }

    /// Stamps the cooldown base. Called on every live submission attempt,
    /// successful or not.
    pub fn record_live_attempt(&mut self, now: DateTime<Utc>) {
        self.last_live_action_at = Some(now);
    }

    /// Records an explicit successful live action: resets the failure counter
    /// and stamps the cooldown base.
    pub fn record_live_success(&mut self, now: DateTime<Utc>) {
        self.live_failure_count = 0;
        self.last_live_action_at = Some(now);
    }

    pub fn touch_heartbeat(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat_at = Some(now);
    }
}
