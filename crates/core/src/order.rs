use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

/// Direction of an open or closed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    /// Order side that opens a position on this side.
    #[must_use]
    pub const fn entry_order_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Order side that closes a position on this side.
    #[must_use]
    pub const fn exit_order_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Sell,
            Self::Short => OrderSide::Buy,
        }
    }
}

/// A validated order request handed to the order-submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub volume: Decimal,
    pub price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_side_maps_to_order_sides() {
        assert_eq!(TradeSide::Long.entry_order_side(), OrderSide::Buy);
        assert_eq!(TradeSide::Long.exit_order_side(), OrderSide::Sell);
        assert_eq!(TradeSide::Short.entry_order_side(), OrderSide::Sell);
        assert_eq!(TradeSide::Short.exit_order_side(), OrderSide::Buy);
    }

    #[test]
    fn order_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&TradeSide::Short).unwrap(), "\"short\"");
    }
}
