use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use tradeforge_core::Candle;

/// Loads candles from a CSV file with the format:
/// `timestamp,open,high,low,close,volume` (RFC 3339 timestamps, header row).
///
/// Rows are sorted by timestamp after loading and the resulting series is
/// validated for ordering and duplicate timestamps.
///
/// # Errors
///
/// Returns an error if:
/// - The CSV file cannot be opened
/// - A row has invalid format
/// - Timestamp or decimal parsing fails
/// - The sorted series still contains duplicate timestamps
pub fn load_candles_csv(path: &str) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles = Vec::new();

    for result in reader.records() {
        let record = result?;
        let timestamp: DateTime<Utc> = record[0].parse()?;
        let open = Decimal::from_str(&record[1])?;
        let high = Decimal::from_str(&record[2])?;
        let low = Decimal::from_str(&record[3])?;
        let close = Decimal::from_str(&record[4])?;
        let volume = Decimal::from_str(&record[5])?;

        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    candles.sort_by_key(|c| c.timestamp);
    Candle::validate_series(&candles)?;

    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // Minimal scoped temp file so tests clean up after themselves.
    struct TempCsv {
        path: std::path::PathBuf,
    }

    impl TempCsv {
        fn new(contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "tradeforge-history-{}-{}.csv",
                std::process::id(),
                contents.len()
            ));
            std::fs::write(&path, contents).unwrap();
            Self { path }
        }
    }

    impl Drop for TempCsv {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn write_csv(contents: &str) -> TempCsv {
        TempCsv::new(contents)
    }

    #[test]
    fn loads_and_sorts_rows() {
        let csv = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T01:00:00Z,101,102,100,101.5,10\n\
             2024-01-01T00:00:00Z,100,101,99,100.5,12\n",
        );

        let candles = load_candles_csv(csv.path.to_str().unwrap()).unwrap();

        assert_eq!(candles.len(), 2);
        assert!(candles[0].timestamp < candles[1].timestamp);
        assert_eq!(candles[0].close, dec!(100.5));
        assert_eq!(candles[1].volume, dec!(10));
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let csv = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,100,101,99,100.5,12\n\
             2024-01-01T00:00:00Z,101,102,100,101.5,10\n",
        );

        assert!(load_candles_csv(csv.path.to_str().unwrap()).is_err());
    }

    #[test]
    fn malformed_decimal_is_an_error() {
        let csv = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,abc,101,99,100.5,12\n",
        );

        assert!(load_candles_csv(csv.path.to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_candles_csv("/nonexistent/candles.csv").is_err());
    }
}
