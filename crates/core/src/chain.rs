//! Options chain snapshot — contracts, quotes, greeks, OI.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{DataQualityWarning, EngineError};

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    #[must_use]
    pub fn is_call(self) -> bool {
        matches!(self, Self::Call)
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// One listed contract inside a chain snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub right: OptionRight,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub volume: u64,
    pub open_interest: u64,
    /// Broker-quoted delta, when the feed supplies greeks.
    pub delta: Option<f64>,
    /// Broker-quoted implied volatility (annualized decimal).
    pub implied_vol: Option<f64>,
}

impl OptionContract {
    /// Midpoint of the quoted market.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    /// Absolute bid/ask spread.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Spread as a fraction of the midpoint. Zero when the mid is zero.
    #[must_use]
    pub fn spread_pct(&self) -> f64 {
        let mid = self.mid();
        if mid <= Decimal::ZERO {
            return 0.0;
        }
        (self.spread() / mid).to_f64().unwrap_or(0.0)
    }

    /// Human-readable description (e.g., "140C 2026-03-20").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}{} {}", self.strike, self.right, self.expiry)
    }
}

/// Immutable options chain snapshot for a single underlying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsChain {
    pub symbol: String,
    pub underlying_price: Decimal,
    pub retrieved_at: DateTime<Utc>,
    pub contracts: Vec<OptionContract>,
}

impl OptionsChain {
    /// Contracts matching an expiry and right, in strike order.
    #[must_use]
    pub fn contracts_for(&self, expiry: NaiveDate, right: OptionRight) -> Vec<&OptionContract> {
        let mut out: Vec<&OptionContract> = self
            .contracts
            .iter()
            .filter(|c| c.expiry == expiry && c.right == right)
            .collect();
        out.sort_by(|a, b| a.strike.cmp(&b.strike));
        out
    }

    /// Distinct expirations present in the chain, ascending.
    #[must_use]
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.contracts.iter().map(|c| c.expiry).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// The contract at an exact strike/expiry/right, if listed.
    #[must_use]
    pub fn find(
        &self,
        strike: Decimal,
        expiry: NaiveDate,
        right: OptionRight,
    ) -> Option<&OptionContract> {
        self.contracts
            .iter()
            .find(|c| c.strike == strike && c.expiry == expiry && c.right == right)
    }

    /// Structural validation of the snapshot.
    ///
    /// Crossed books and non-positive strikes are malformed input and fail
    /// the call; a stale snapshot merely attaches a warning.
    pub fn validate(
        &self,
        as_of: DateTime<Utc>,
        max_quote_age_secs: i64,
    ) -> Result<Vec<DataQualityWarning>, EngineError> {
        if self.underlying_price <= Decimal::ZERO {
            return Err(EngineError::MalformedChain {
                symbol: self.symbol.clone(),
                detail: format!("non-positive underlying price {}", self.underlying_price),
            });
        }
        for c in &self.contracts {
            if c.strike <= Decimal::ZERO {
                return Err(EngineError::MalformedChain {
                    symbol: self.symbol.clone(),
                    detail: format!("non-positive strike {}", c.strike),
                });
            }
            if c.bid > c.ask && c.ask > Decimal::ZERO {
                return Err(EngineError::MalformedChain {
                    symbol: self.symbol.clone(),
                    detail: format!("crossed book on {} (bid {} > ask {})", c.display_name(), c.bid, c.ask),
                });
            }
        }

        let mut warnings = Vec::new();
        let age = (as_of - self.retrieved_at).num_seconds();
        if age > max_quote_age_secs {
            warnings.push(DataQualityWarning::StaleQuote {
                symbol: self.symbol.clone(),
                age_secs: age,
            });
        }
        Ok(warnings)
    }
}
