//! Error taxonomy and non-fatal data-quality warnings.
//!
//! Errors abort the triggering call; warnings are attached to outputs and
//! never raised.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal engine errors. Each aborts only the triggering call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Too few usable bars for an estimator.
    #[error("{estimator}: insufficient data (need {required} bars, got {actual})")]
    InsufficientData {
        estimator: &'static str,
        required: usize,
        actual: usize,
    },

    /// Non-positive volatility/DTE/sigma or other out-of-domain argument.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Structurally broken chain snapshot (crossed book, bad strike).
    #[error("malformed chain for {symbol}: {detail}")]
    MalformedChain { symbol: String, detail: String },
}

/// Non-fatal quality findings attached to engine outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Chain snapshot older than the configured maximum age.
    StaleQuote { symbol: String, age_secs: i64 },
    /// Quoted spread wide enough to distort the cost model.
    WideSpread {
        symbol: String,
        strike: rust_decimal::Decimal,
        expiry: NaiveDate,
        spread_pct: f64,
    },
    /// Bar skipped by an estimator (zero range, bad OHLC).
    BarExcluded { date: NaiveDate, detail: String },
    /// A failed estimator's blend weight was spread across the survivors.
    WeightRedistributed { estimator: String, weight: f64 },
    /// Ladder leg dropped.
    LegExcluded { week: usize, expiry: NaiveDate, detail: String },
    /// Ladder leg kept but altered (clamped sigma, unlisted strike).
    LegAdjusted { week: usize, expiry: NaiveDate, detail: String },
    /// Fewer weekly expirations available than the ladder requested.
    LadderTruncated { requested: usize, available: usize },
    /// Symbol skipped during a batch scan; other symbols are unaffected.
    SymbolSkipped { symbol: String, detail: String },
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaleQuote { symbol, age_secs } => {
                write!(f, "stale quote for {symbol} ({age_secs}s old)")
            }
            Self::WideSpread {
                symbol,
                strike,
                expiry,
                spread_pct,
            } => write!(
                f,
                "wide spread on {symbol} {strike} {expiry} ({:.1}% of mid)",
                spread_pct * 100.0
            ),
            Self::BarExcluded { date, detail } => write!(f, "bar {date} excluded: {detail}"),
            Self::WeightRedistributed { estimator, weight } => {
                write!(f, "{estimator} failed; weight {weight:.2} redistributed")
            }
            Self::LegExcluded { week, expiry, detail } => {
                write!(f, "week {week} ({expiry}) excluded: {detail}")
            }
            Self::LegAdjusted { week, expiry, detail } => {
                write!(f, "week {week} ({expiry}) adjusted: {detail}")
            }
            Self::LadderTruncated { requested, available } => {
                write!(f, "ladder truncated: {available} of {requested} weeks available")
            }
            Self::SymbolSkipped { symbol, detail } => {
                write!(f, "{symbol} skipped: {detail}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_is_log_friendly() {
        let w = DataQualityWarning::LegExcluded {
            week: 3,
            expiry: NaiveDate::from_ymd_opt(2025, 7, 18).unwrap(),
            detail: "spans earnings".to_string(),
        };
        assert_eq!(w.to_string(), "week 3 (2025-07-18) excluded: spans earnings");
    }

    #[test]
    fn error_display_includes_context() {
        let e = EngineError::InsufficientData {
            estimator: "yang_zhang",
            required: 21,
            actual: 5,
        };
        assert!(e.to_string().contains("yang_zhang"));
        assert!(e.to_string().contains("21"));
    }

    #[test]
    fn warning_serializes_with_kind_tag() {
        let w = DataQualityWarning::StaleQuote {
            symbol: "MSFT".to_string(),
            age_secs: 400,
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"kind\":\"stale_quote\""));
    }
}
