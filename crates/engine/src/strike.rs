//! Strike selection — sigma-distance targets, tradeable rounding, and
//! assignment probability.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wheelhouse_core::{EngineError, LiquidityConfig, OptionRight, OptionsChain};

use crate::math::{norm_cdf, require_positive, to_decimal, to_f64};

/// Named sigma-distance profiles for strike targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaProfile {
    Aggressive,
    Moderate,
    Conservative,
    Defensive,
}

impl SigmaProfile {
    /// Inclusive sigma range scanned for this profile.
    #[must_use]
    pub fn sigma_range(self) -> (f64, f64) {
        match self {
            Self::Aggressive => (0.5, 1.0),
            Self::Moderate => (1.0, 1.5),
            Self::Conservative => (1.5, 2.0),
            Self::Defensive => (2.0, 2.5),
        }
    }

    /// Midpoint of the profile band; candidates are ranked by distance to it.
    #[must_use]
    pub fn target(self) -> f64 {
        let (lo, hi) = self.sigma_range();
        (lo + hi) / 2.0
    }
}

/// Which way a theoretical strike was rounded to become tradeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingDirection {
    Up,
    Down,
}

/// A sigma-targeted strike before and after rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeResult {
    pub theoretical: Decimal,
    pub tradeable: Decimal,
    pub sigma: f64,
    pub direction: RoundingDirection,
}

/// Model probability next to the chain's own delta. The two are independent
/// views and are never combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResult {
    /// Black-Scholes P(ITM) from the model.
    pub p_itm_model: f64,
    /// Broker-quoted delta, surfaced unmodified as a cross-check.
    pub delta_chain: Option<f64>,
}

/// One liquid contract near the profile band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeCandidate {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub right: OptionRight,
    pub strike: StrikeResult,
    pub probability: ProbabilityResult,
    /// Quoted midpoint premium.
    pub premium: Decimal,
    pub open_interest: u64,
    pub spread: Decimal,
}

/// Theoretical strike at `sigma` standard deviations from spot.
///
/// K = S * exp(n * sigma_annual * sqrt(dte/365)), n positive for calls and
/// negative for puts.
pub fn strike_at_sigma(
    price: Decimal,
    volatility: f64,
    dte: u32,
    sigma: f64,
    right: OptionRight,
) -> Result<Decimal, EngineError> {
    if price <= Decimal::ZERO {
        return Err(EngineError::InvalidParameter {
            name: "price",
            reason: format!("must be positive, got {price}"),
        });
    }
    require_positive(volatility, "volatility")?;
    require_positive(f64::from(dte), "dte")?;
    require_positive(sigma, "sigma")?;

    let spot = to_f64(price, "price")?;
    let t = f64::from(dte) / 365.0;
    let n = if right.is_call() { sigma } else { -sigma };
    let strike = spot * (n * volatility * t.sqrt()).exp();

    to_decimal(strike, "strike")
}

/// Rounds a theoretical strike to a listed increment, conservatively:
/// calls round up, puts round down, so the tradeable strike is never more
/// aggressive than the target. Idempotent on already-rounded strikes.
pub fn round_to_tradeable(
    theoretical: Decimal,
    increment: Decimal,
    right: OptionRight,
) -> Result<Decimal, EngineError> {
    if increment <= Decimal::ZERO {
        return Err(EngineError::InvalidParameter {
            name: "increment",
            reason: format!("must be positive, got {increment}"),
        });
    }
    let steps = theoretical / increment;
    let rounded = match right {
        OptionRight::Call => steps.ceil() * increment,
        OptionRight::Put => steps.floor() * increment,
    };
    Ok(rounded.normalize())
}

/// Computes the sigma-targeted strike and its tradeable rounding in one step.
pub fn strike_result(
    price: Decimal,
    volatility: f64,
    dte: u32,
    sigma: f64,
    increment: Decimal,
    right: OptionRight,
) -> Result<StrikeResult, EngineError> {
    let theoretical = strike_at_sigma(price, volatility, dte, sigma, right)?;
    let tradeable = round_to_tradeable(theoretical, increment, right)?;
    Ok(StrikeResult {
        theoretical,
        tradeable,
        sigma,
        direction: if right.is_call() {
            RoundingDirection::Up
        } else {
            RoundingDirection::Down
        },
    })
}

/// Black-Scholes probability the option finishes in the money.
///
/// d2 = (ln(S/K) + (r - sigma^2/2) T) / (sigma sqrt(T));
/// P(ITM) = N(d2) for calls, N(-d2) for puts. The sign convention is pinned
/// by a regression test — swapping the right must flip the direction.
pub fn assignment_probability(
    price: Decimal,
    strike: Decimal,
    volatility: f64,
    dte: u32,
    risk_free_rate: f64,
    right: OptionRight,
) -> Result<f64, EngineError> {
    if price <= Decimal::ZERO || strike <= Decimal::ZERO {
        return Err(EngineError::InvalidParameter {
            name: "price",
            reason: format!("price and strike must be positive, got {price}/{strike}"),
        });
    }
    require_positive(volatility, "volatility")?;
    require_positive(f64::from(dte), "dte")?;

    let s = to_f64(price, "price")?;
    let k = to_f64(strike, "strike")?;
    let t = f64::from(dte) / 365.0;
    let d2 = ((s / k).ln() + (risk_free_rate - volatility * volatility / 2.0) * t)
        / (volatility * t.sqrt());

    Ok(match right {
        OptionRight::Call => norm_cdf(d2),
        OptionRight::Put => norm_cdf(-d2),
    })
}

/// Pairs the model P(ITM) with the chain's quoted delta, kept separate.
pub fn probability_result(
    price: Decimal,
    strike: Decimal,
    volatility: f64,
    dte: u32,
    risk_free_rate: f64,
    right: OptionRight,
    delta_chain: Option<f64>,
) -> Result<ProbabilityResult, EngineError> {
    let p_itm_model = assignment_probability(price, strike, volatility, dte, risk_free_rate, right)?;
    Ok(ProbabilityResult {
        p_itm_model,
        delta_chain,
    })
}

/// Sigma step used when scanning a profile band.
const SIGMA_STEP: f64 = 0.1;

/// Scans a profile's sigma band against the chain and returns liquid
/// candidates ordered by proximity to the band midpoint.
///
/// Only strikes actually listed at `expiry` become candidates; liquidity
/// filtering applies the open-interest and spread thresholds from config.
#[allow(clippy::too_many_arguments)]
pub fn recommendations(
    chain: &OptionsChain,
    price: Decimal,
    volatility: f64,
    dte: u32,
    expiry: NaiveDate,
    right: OptionRight,
    profile: SigmaProfile,
    increment: Decimal,
    risk_free_rate: f64,
    liquidity: &LiquidityConfig,
) -> Result<Vec<StrikeCandidate>, EngineError> {
    let (lo, hi) = profile.sigma_range();
    let mut candidates: Vec<StrikeCandidate> = Vec::new();

    let steps = ((hi - lo) / SIGMA_STEP).round() as usize;
    for i in 0..=steps {
        let sigma = lo + SIGMA_STEP * i as f64;
        let result = strike_result(price, volatility, dte, sigma, increment, right)?;

        // Several sigma steps can round to the same listed strike; keep the
        // first, which is closest to the aggressive end of the band.
        if candidates.iter().any(|c| c.strike.tradeable == result.tradeable) {
            continue;
        }

        let Some(contract) = chain.find(result.tradeable, expiry, right) else {
            continue;
        };
        if contract.open_interest < liquidity.min_open_interest {
            continue;
        }
        if contract.spread() > liquidity.max_spread_abs
            || contract.spread_pct() > liquidity.max_spread_pct
        {
            continue;
        }

        let probability = probability_result(
            price,
            result.tradeable,
            volatility,
            dte,
            risk_free_rate,
            right,
            contract.delta,
        )?;

        candidates.push(StrikeCandidate {
            symbol: chain.symbol.clone(),
            expiry,
            right,
            strike: result,
            probability,
            premium: contract.mid(),
            open_interest: contract.open_interest,
            spread: contract.spread(),
        });
    }

    let target = profile.target();
    candidates.sort_by(|a, b| {
        let da = (a.strike.sigma - target).abs();
        let db = (b.strike.sigma - target).abs();
        da.partial_cmp(&db)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.strike.tradeable.cmp(&b.strike.tradeable))
    });

    debug!(
        symbol = chain.symbol,
        profile = ?profile,
        candidates = candidates.len(),
        "strike scan complete"
    );
    Ok(candidates)
}
