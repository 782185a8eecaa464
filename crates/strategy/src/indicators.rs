//! Price-series indicator primitives. All helpers operate on close prices
//! already converted to `f64` and return `None` until enough history exists
//! at or before `index` (no lookahead past `index`).

/// Simple moving average of the `period` closes ending at `index` inclusive.
#[must_use]
pub fn sma(closes: &[f64], period: usize, index: usize) -> Option<f64> {
    if period == 0 || index >= closes.len() || index + 1 < period {
        return None;
    }
    let start = index + 1 - period;
    #[allow(clippy::cast_precision_loss)]
    let mean = closes[start..=index].iter().sum::<f64>() / period as f64;
    Some(mean)
}

/// Relative strength index over the last `period` close-to-close deltas
/// ending at `index`. Simple (non-smoothed) averages of gains and losses.
///
/// A window with no losses reads 100; a completely flat window reads 50
/// (neutral, no directional pressure either way).
#[must_use]
pub fn rsi(closes: &[f64], period: usize, index: usize) -> Option<f64> {
    if period == 0 || index >= closes.len() || index < period {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in (index + 1 - period)..=index {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let avg_gain = gains / period as f64;
    #[allow(clippy::cast_precision_loss)]
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return Some(50.0);
        }
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
