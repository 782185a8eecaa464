use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tradeforge_core::{BlockReason, OrderSide, RunStatus};
use tradeforge_kraken::NormalizedOrder;

/// Events a run broadcasts to subscribers. The latest few are retained in the
/// run snapshot for operators who subscribe late.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    StateChanged {
        from: RunStatus,
        to: RunStatus,
        timestamp: DateTime<Utc>,
    },

    /// Composite signal computed for a tick.
    SignalGenerated {
        signal: f64,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },

    /// An order went out (live or paper) and was normalized.
    OrderSubmitted {
        side: OrderSide,
        volume: Decimal,
        order: NormalizedOrder,
        timestamp: DateTime<Utc>,
    },

    /// The gate refused a live tick. Carries every applicable reason so
    /// operators see all blockers at once.
    GateBlocked {
        reasons: BTreeSet<BlockReason>,
        timestamp: DateTime<Utc>,
    },

    /// Consecutive failures reached the threshold; the run was forced into
    /// error status and disarmed.
    CircuitTripped {
        failure_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// Kill path canceled outstanding orders.
    OrdersCanceled {
        count: u32,
        timestamp: DateTime<Utc>,
    },

    /// A position closed and realized P&L.
    TradeClosed {
        pnl: Decimal,
        win: bool,
        timestamp: DateTime<Utc>,
    },

    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}
