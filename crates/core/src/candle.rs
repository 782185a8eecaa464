use crate::error::DataError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single OHLCV bar. Series are ordered ascending by timestamp with no
/// duplicate timestamps within one (symbol, interval) series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Checks that a candle series is strictly ascending by timestamp.
    ///
    /// # Errors
    /// Returns `DataError::OutOfOrder` or `DataError::DuplicateTimestamp` on
    /// the first violation found.
    pub fn validate_series(candles: &[Self]) -> Result<(), DataError> {
        for pair in candles.windows(2) {
            match pair[0].timestamp.cmp(&pair[1].timestamp) {
                Ordering::Less => {}
                Ordering::Equal => {
                    return Err(DataError::DuplicateTimestamp {
                        timestamp: pair[1].timestamp,
                    })
                }
                Ordering::Greater => {
                    return Err(DataError::OutOfOrder {
                        prev: pair[0].timestamp,
                        next: pair[1].timestamp,
                    })
                }
            }
        }
        Ok(())
    }

    /// Returns the (first, last) timestamps of a series, if non-empty.
    #[must_use]
    pub fn series_range(candles: &[Self]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}
