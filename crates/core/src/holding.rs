//! Underlying holdings and covered-call sizing.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A share position the engine may overwrite with covered calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: u64,
    /// Per-share cost basis, when the caller tracks tax lots.
    pub cost_basis: Option<Decimal>,
    pub acquired_at: Option<NaiveDate>,
}

impl Holding {
    #[must_use]
    pub fn new(symbol: &str, shares: u64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            shares,
            cost_basis: None,
            acquired_at: None,
        }
    }

    /// Contracts sellable under an overwrite cap expressed in whole percent.
    ///
    /// `floor(shares * cap_pct / 10_000)` — the truncation is intentional so
    /// the engine never sells calls against more shares than the cap allows.
    #[must_use]
    pub fn contracts_to_sell(&self, overwrite_cap_pct: u32) -> u64 {
        self.shares * u64::from(overwrite_cap_pct) / 10_000
    }
}
