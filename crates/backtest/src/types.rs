use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tradeforge_core::TradeSide;

/// The one open position a simulation may hold. Transient: exists only while
/// open, never persisted standalone.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPosition {
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub entry_timestamp: DateTime<Utc>,
    pub size: Decimal,
    pub signal_at_entry: f64,
}

impl SimulatedPosition {
    /// Unrealized P&L of the position marked at `close`.
    #[must_use]
    pub fn unrealized_pnl(&self, close: Decimal) -> Decimal {
        match self.side {
            TradeSide::Long => (close - self.entry_price) * self.size,
            TradeSide::Short => (self.entry_price - close) * self.size,
        }
    }

    /// Price change since entry, signed in the position's favorable
    /// direction: positive means the position is winning.
    #[must_use]
    pub fn favorable_change(&self, close: Decimal) -> f64 {
        if self.entry_price <= Decimal::ZERO {
            return 0.0;
        }
        let change = match self.side {
            TradeSide::Long => (close - self.entry_price) / self.entry_price,
            TradeSide::Short => (self.entry_price - close) / self.entry_price,
        };
        change.to_f64().unwrap_or(0.0)
    }

    /// Realizes the position into an immutable closed trade.
    #[must_use]
    pub fn close_at(&self, exit_timestamp: DateTime<Utc>, exit_price: Decimal) -> Trade {
        let pnl = self.unrealized_pnl(exit_price);
        let cost_basis = self.entry_price * self.size;
        let pnl_percentage = if cost_basis > Decimal::ZERO {
            (pnl / cost_basis * dec!(100)).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };
        Trade {
            entry_timestamp: self.entry_timestamp,
            exit_timestamp,
            side: self.side,
            entry_price: self.entry_price,
            exit_price,
            size: self.size,
            pnl,
            pnl_percentage,
            signal_strength: self.signal_at_entry,
        }
    }
}

/// A closed trade leg. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub pnl: Decimal,
    pub pnl_percentage: f64,
    pub signal_strength: f64,
}

/// One point per simulated bar. Drawdown is measured from the running peak,
/// which is non-decreasing across the curve by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    /// Percent decline from the running equity peak, in [0, 100].
    pub drawdown_pct: f64,
}
