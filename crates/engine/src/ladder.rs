//! Expiration ladders — one large position split across several weekly
//! expirations instead of concentrated in one.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wheelhouse_core::{DataQualityWarning, EngineError, OptionRight, OptionsChain};

use crate::strike::{probability_result, strike_result, ProbabilityResult, StrikeResult};

/// How shares are split across the rungs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Even split.
    Equal,
    /// More shares in the near weeks.
    FrontWeighted,
    /// More shares in the far weeks.
    BackWeighted,
}

/// Sigma never adjusts below this floor.
const MIN_SIGMA: f64 = 0.05;

/// One rung of the ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderLeg {
    /// 1-based rung number.
    pub week: usize,
    pub expiry: NaiveDate,
    /// Sigma target after the per-week adjustment.
    pub sigma_target: f64,
    pub shares: u64,
    pub contracts: u64,
    pub strike: StrikeResult,
    /// Midpoint premium of the listed contract at the rounded strike, when
    /// one exists.
    pub premium: Option<Decimal>,
    pub probability: ProbabilityResult,
}

/// Aggregated ladder output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderResult {
    pub symbol: String,
    pub legs: Vec<LadderLeg>,
    /// Shares the caller asked to ladder.
    pub total_shares: u64,
    /// Shares actually covered by surviving legs.
    pub shares_laddered: u64,
    pub contracts_total: u64,
    /// Sum of premium x 100 x contracts over legs with a listed premium.
    pub projected_premium: Decimal,
    pub warnings: Vec<DataQualityWarning>,
}

/// Ladder construction inputs.
#[derive(Debug, Clone)]
pub struct LadderRequest {
    pub symbol: String,
    pub total_shares: u64,
    pub price: Decimal,
    /// Annualized volatility from the volatility engine.
    pub volatility: f64,
    /// Number of weekly rungs wanted.
    pub weeks: usize,
    pub strategy: AllocationStrategy,
    /// Sigma distance before the per-week adjustment.
    pub base_sigma: f64,
    pub right: OptionRight,
    pub strike_increment: Decimal,
    /// Next earnings date; legs spanning it are dropped.
    pub earnings: Option<NaiveDate>,
    pub risk_free_rate: f64,
}

/// Splits `total` shares across `weeks` rungs. Allocations always sum
/// exactly to `total`; any integer remainder goes to week 1.
#[must_use]
pub fn allocate_shares(total: u64, weeks: usize, strategy: AllocationStrategy) -> Vec<u64> {
    let weights: Vec<u64> = match strategy {
        AllocationStrategy::Equal => vec![1; weeks],
        AllocationStrategy::FrontWeighted => (1..=weeks as u64).rev().collect(),
        AllocationStrategy::BackWeighted => (1..=weeks as u64).collect(),
    };
    let weight_sum: u64 = weights.iter().sum();

    let mut allocations: Vec<u64> = weights.iter().map(|w| total * w / weight_sum).collect();
    let assigned: u64 = allocations.iter().sum();
    allocations[0] += total - assigned;
    allocations
}

/// Per-week sigma schedule: the near week runs a touch more aggressive
/// (less time-value uncertainty), week 4 and beyond a touch wider.
fn sigma_for_week(week: usize, base: f64) -> f64 {
    match week {
        1 => base - 0.25,
        2 | 3 => base,
        _ => base + 0.25,
    }
}

/// One expiration per upcoming calendar week, Fridays preferred when a week
/// lists both a Friday and a Monday/Wednesday weekly.
fn weekly_expirations(chain: &OptionsChain, after: NaiveDate) -> Vec<NaiveDate> {
    let mut weeks: Vec<((i32, u32), NaiveDate)> = Vec::new();
    for expiry in chain.expirations() {
        if expiry <= after {
            continue;
        }
        let iso = expiry.iso_week();
        let key = (iso.year(), iso.week());
        match weeks.iter_mut().find(|(k, _)| *k == key) {
            Some((_, chosen)) => {
                if expiry.weekday() == Weekday::Fri {
                    *chosen = expiry;
                }
            }
            None => weeks.push((key, expiry)),
        }
    }
    weeks.sort_by_key(|(_, date)| *date);
    weeks.into_iter().map(|(_, date)| date).collect()
}

/// Builds a ladder from the chain's upcoming weekly expirations.
///
/// Legs spanning the earnings date are dropped with a warning; per-leg
/// failures (no strike, clamped sigma) degrade the leg, never the ladder.
pub fn build_ladder(
    request: &LadderRequest,
    chain: &OptionsChain,
    as_of: NaiveDate,
) -> Result<LadderResult, EngineError> {
    if request.weeks == 0 {
        return Err(EngineError::InvalidParameter {
            name: "weeks",
            reason: "ladder needs at least one week".to_string(),
        });
    }
    if request.total_shares == 0 {
        return Err(EngineError::InvalidParameter {
            name: "total_shares",
            reason: "nothing to ladder".to_string(),
        });
    }

    let mut warnings = Vec::new();

    let available = weekly_expirations(chain, as_of);
    let weeks = request.weeks.min(available.len());
    if weeks < request.weeks {
        warnings.push(DataQualityWarning::LadderTruncated {
            requested: request.weeks,
            available: weeks,
        });
    }
    if weeks == 0 {
        return Err(EngineError::MalformedChain {
            symbol: request.symbol.clone(),
            detail: "no upcoming weekly expirations in chain".to_string(),
        });
    }

    let allocations = allocate_shares(request.total_shares, weeks, request.strategy);

    let mut legs = Vec::with_capacity(weeks);
    for (i, expiry) in available.iter().take(weeks).enumerate() {
        let week = i + 1;
        let expiry = *expiry;
        let shares = allocations[i];

        // Hard gate: a leg whose window spans earnings is not laddered.
        if let Some(earnings) = request.earnings {
            if earnings > as_of && earnings <= expiry {
                warnings.push(DataQualityWarning::LegExcluded {
                    week,
                    expiry,
                    detail: "spans earnings".to_string(),
                });
                continue;
            }
        }

        let mut sigma = sigma_for_week(week, request.base_sigma);
        if sigma < MIN_SIGMA {
            warnings.push(DataQualityWarning::LegAdjusted {
                week,
                expiry,
                detail: format!("sigma target {sigma:.2} clamped to {MIN_SIGMA}"),
            });
            sigma = MIN_SIGMA;
        }

        let dte = (expiry - as_of).num_days() as u32;
        let strike = match strike_result(
            request.price,
            request.volatility,
            dte,
            sigma,
            request.strike_increment,
            request.right,
        ) {
            Ok(s) => s,
            Err(e) => {
                warnings.push(DataQualityWarning::LegExcluded {
                    week,
                    expiry,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        let listed = chain.find(strike.tradeable, expiry, request.right);
        if listed.is_none() {
            warnings.push(DataQualityWarning::LegAdjusted {
                week,
                expiry,
                detail: format!("no listed {} strike at {}", request.right, strike.tradeable),
            });
        }

        let probability = probability_result(
            request.price,
            strike.tradeable,
            request.volatility,
            dte,
            request.risk_free_rate,
            request.right,
            listed.and_then(|c| c.delta),
        )?;

        legs.push(LadderLeg {
            week,
            expiry,
            sigma_target: sigma,
            shares,
            contracts: shares / 100,
            strike,
            premium: listed.map(wheelhouse_core::OptionContract::mid),
            probability,
        });
    }

    let shares_laddered: u64 = legs.iter().map(|l| l.shares).sum();
    let contracts_total: u64 = legs.iter().map(|l| l.contracts).sum();
    let projected_premium: Decimal = legs
        .iter()
        .filter_map(|l| l.premium.map(|p| p * Decimal::from(100) * Decimal::from(l.contracts)))
        .sum();

    debug!(
        symbol = request.symbol,
        legs = legs.len(),
        contracts = contracts_total,
        "ladder built"
    );

    Ok(LadderResult {
        symbol: request.symbol.clone(),
        legs,
        total_shares: request.total_shares,
        shares_laddered,
        contracts_total,
        projected_premium,
        warnings,
    })
}
