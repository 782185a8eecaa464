//! Capital and position accounting for a run, driven exclusively by
//! normalized order outcomes. Live P&L never comes from synthetic sources.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradeforge_core::TradeSide;

/// The single position a run may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub entry_timestamp: DateTime<Utc>,
    pub size: Decimal,
    pub signal_at_entry: f64,
}

impl OpenPosition {
    #[must_use]
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        match self.side {
            TradeSide::Long => (mark - self.entry_price) * self.size,
            TradeSide::Short => (self.entry_price - mark) * self.size,
        }
    }

    /// Price change since entry, positive when the position is winning.
    #[must_use]
    pub fn favorable_change(&self, mark: Decimal) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        if self.entry_price <= Decimal::ZERO {
            return 0.0;
        }
        let change = match self.side {
            TradeSide::Long => (mark - self.entry_price) / self.entry_price,
            TradeSide::Short => (self.entry_price - mark) / self.entry_price,
        };
        change.to_f64().unwrap_or(0.0)
    }
}

/// Outcome of closing a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub pnl: Decimal,
    pub win: bool,
}

pub struct PositionLedger {
    capital: Decimal,
    realized_pnl: Decimal,
    position: Option<OpenPosition>,
}

impl PositionLedger {
    #[must_use]
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            capital: initial_capital,
            realized_pnl: Decimal::ZERO,
            position: None,
        }
    }

    #[must_use]
    pub fn capital(&self) -> Decimal {
        self.capital
    }

    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    #[must_use]
    pub fn position(&self) -> Option<&OpenPosition> {
        self.position.as_ref()
    }

    /// Capital plus unrealized P&L at the given mark price.
    #[must_use]
    pub fn equity(&self, mark: Decimal) -> Decimal {
        self.capital
            + self
                .position
                .as_ref()
                .map_or(Decimal::ZERO, |p| p.unrealized_pnl(mark))
    }

    /// Opens a position. At most one may be open; a second open is refused
    /// and logged, leaving the existing position untouched.
    pub fn open(
        &mut self,
        side: TradeSide,
        entry_price: Decimal,
        size: Decimal,
        entry_timestamp: DateTime<Utc>,
        signal_at_entry: f64,
    ) {
        if self.position.is_some() {
            tracing::warn!("refusing to open a second position");
            return;
        }
        self.position = Some(OpenPosition {
            side,
            entry_price,
            entry_timestamp,
            size,
            signal_at_entry,
        });
    }

    /// Closes the open position at `exit_price`, realizing P&L into capital.
    /// Returns `None` when no position is open.
    pub fn close(&mut self, exit_price: Decimal) -> Option<ClosedTrade> {
        let position = self.position.take()?;
        let pnl = position.unrealized_pnl(exit_price);
        self.capital += pnl;
        self.realized_pnl += pnl;
        Some(ClosedTrade {
            pnl,
            win: pnl > Decimal::ZERO,
        })
    }
}
