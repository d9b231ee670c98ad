//! Daily price bars — the sole input to the volatility estimators.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trading day of OHLCV data for an underlying.
///
/// Bars are immutable and externally sourced; the engine never mutates or
/// retains them past the end of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adj_close: Decimal,
    pub volume: u64,
    /// Cash dividend paid this session, if any.
    pub dividend: Option<Decimal>,
    /// Split factor applied this session (e.g., 4.0 for a 4:1 split).
    pub split_factor: Option<Decimal>,
}

impl PriceBar {
    /// Bar with positive prices and a coherent high/low range.
    ///
    /// Estimators skip bars that fail this check rather than propagate NaN.
    #[must_use]
    pub fn has_valid_ohlc(&self) -> bool {
        self.open > Decimal::ZERO
            && self.high > Decimal::ZERO
            && self.low > Decimal::ZERO
            && self.close > Decimal::ZERO
            && self.high >= self.low
            && self.high >= self.open.min(self.close)
            && self.low <= self.open.max(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            open,
            high,
            low,
            close,
            adj_close: close,
            volume: 1_000_000,
            dividend: None,
            split_factor: None,
        }
    }

    #[test]
    fn valid_bar_passes() {
        assert!(bar(dec!(100), dec!(102), dec!(99), dec!(101)).has_valid_ohlc());
    }

    #[test]
    fn inverted_range_fails() {
        assert!(!bar(dec!(100), dec!(99), dec!(102), dec!(101)).has_valid_ohlc());
    }

    #[test]
    fn zero_price_fails() {
        assert!(!bar(dec!(0), dec!(102), dec!(99), dec!(101)).has_valid_ohlc());
    }

    #[test]
    fn close_above_high_fails() {
        assert!(!bar(dec!(100), dec!(102), dec!(99), dec!(103)).has_valid_ohlc());
    }
}
