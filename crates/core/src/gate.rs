//! Live-trading safety gate and circuit breaker.
//!
//! The gate decides, per tick, whether real capital may be risked. Every
//! applicable blocking reason is reported, not just the first: operators need
//! to see all blockers at once, so reasons are accumulated into a set rather
//! than short-circuited.
//!
//! The circuit breaker is a pure transition over the run record's consecutive
//! failure counter. The caller owns the mandatory side effects on trip
//! (status to error, disarm); resets happen only through
//! [`RunRecord::record_live_success`](crate::run::RunRecord::record_live_success)
//! or a manual re-arm.

use crate::run::{RunMode, RunRecord, RunStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A reason live order submission is currently blocked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    /// Global live-trading flag is off.
    LiveDisabled,
    /// Operator kill switch is on.
    KillSwitchActive,
    /// Run is in live mode but has not been explicitly armed.
    LiveNotArmed,
    /// Exchange credentials for the run are not resolvable.
    SecretsNotReady,
    /// Too little time has passed since the last live action.
    CooldownActive,
    /// Run status is not `running`.
    RunNotRunning,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LiveDisabled => "LIVE_DISABLED",
            Self::KillSwitchActive => "KILL_SWITCH_ACTIVE",
            Self::LiveNotArmed => "LIVE_NOT_ARMED",
            Self::SecretsNotReady => "SECRETS_NOT_READY",
            Self::CooldownActive => "COOLDOWN_ACTIVE",
            Self::RunNotRunning => "RUN_NOT_RUNNING",
        };
        f.write_str(name)
    }
}

/// Outcome of a gate evaluation. `allowed` is true only when `reasons` is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub reasons: BTreeSet<BlockReason>,
}

impl GateDecision {
    #[must_use]
    pub fn is_blocked_by(&self, reason: BlockReason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Gate inputs that live outside the run record. These can change while a run
/// sits in `running`, which is why the gate is re-evaluated on every tick.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub live_trading_enabled: bool,
    pub kill_switch_active: bool,
    pub secrets_ready: bool,
    /// Minimum gap between successive live actions.
    pub cooldown: Duration,
}

/// Evaluates whether live order submission is permitted for this run, now.
///
/// All checks run unconditionally; nothing short-circuits.
#[must_use]
pub fn evaluate(run: &RunRecord, ctx: &GateContext, now: DateTime<Utc>) -> GateDecision {
    let mut reasons = BTreeSet::new();

    if !ctx.live_trading_enabled {
        reasons.insert(BlockReason::LiveDisabled);
    }
    if ctx.kill_switch_active {
        reasons.insert(BlockReason::KillSwitchActive);
    }
    if run.mode == RunMode::Live && !run.live_armed {
        reasons.insert(BlockReason::LiveNotArmed);
    }
    if !ctx.secrets_ready {
        reasons.insert(BlockReason::SecretsNotReady);
    }
    if let Some(last_action) = run.last_live_action_at {
        if now - last_action < ctx.cooldown {
            reasons.insert(BlockReason::CooldownActive);
        }
    }
    if run.status != RunStatus::Running {
        reasons.insert(BlockReason::RunNotRunning);
    }

    GateDecision {
        allowed: reasons.is_empty(),
        reasons,
    }
}

/// Result of advancing the consecutive-failure counter by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTransition {
    pub next_count: u32,
    /// True once `next_count >= threshold`; the trip happens exactly at the
    /// threshold value.
    pub triggered: bool,
}

/// Computes the counter transition for one more live-action failure. Only
/// ever increments; the caller applies the trip side effects and persists the
/// new count.
#[must_use]
pub fn next_failure_state(run: &RunRecord, threshold: u32) -> FailureTransition {
    let next_count = run.live_failure_count.saturating_add(1);
    FailureTransition {
        next_count,
        triggered: next_count >= threshold,
    }
}
