//! Income, risk, and scenario analysis for a chosen strike/premium.
//!
//! Pure function of its inputs: nothing here reads the clock, the chain, or
//! any shared state.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use wheelhouse_core::{EngineError, OptionRight};

use crate::math::{to_decimal, to_f64};

/// Inputs to the analyzer. Premium and prices are per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInputs {
    pub price: Decimal,
    pub strike: Decimal,
    pub premium: Decimal,
    pub dte: u32,
    pub right: OptionRight,
    /// Model probability of finishing in the money, in [0, 1].
    pub p_itm: f64,
    /// Annualized volatility, used to scale the risk proxy.
    pub volatility: f64,
    /// Caller's price target. Without one, opportunity cost is zero — an
    /// explicit default, not inferred intent.
    pub price_target: Option<Decimal>,
    /// Extra relative shocks in whole percent (e.g., -15.0), added to the
    /// fixed scenario grid.
    pub custom_shocks_pct: Vec<f64>,
}

/// Premium income expressed against the underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeMetrics {
    /// (premium / price) * (365 / dte), as a fraction.
    pub annualized_yield: f64,
    /// Premium / price: return if the underlying goes nowhere.
    pub return_if_flat: f64,
    /// Return if assigned: (strike - price + premium) / price for calls,
    /// mirrored for puts.
    pub return_if_assigned: f64,
    /// strike + premium for calls, strike - premium for puts.
    pub breakeven: Decimal,
}

/// Probability-weighted risk metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// P(OTM) * premium - P(ITM) * opportunity_cost, per share.
    pub expected_value: Decimal,
    /// Per-share cost of assignment versus the price target (zero without a
    /// target).
    pub opportunity_cost: Decimal,
    /// Expected value over a volatility-scaled risk proxy.
    pub risk_adjusted_return: f64,
    /// Premium cushion as whole-number percent of spot.
    pub downside_protection_pct: f64,
}

/// P&L at one terminal price, against buy-and-hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub label: String,
    /// Relative shock in whole percent; the strike row carries its implied
    /// shock.
    pub shock_pct: f64,
    pub price: Decimal,
    /// Per-share P&L of the option-selling position.
    pub strategy_pnl: Decimal,
    /// Per-share P&L of simply holding the stock.
    pub buy_hold_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub income: IncomeMetrics,
    pub risk: RiskMetrics,
    pub scenarios: Vec<ScenarioResult>,
}

/// Fixed relative shocks evaluated for every analysis, in whole percent.
const FIXED_SHOCKS_PCT: [f64; 7] = [-20.0, -10.0, -5.0, 0.0, 5.0, 10.0, 20.0];

fn validate(inputs: &AnalysisInputs) -> Result<(), EngineError> {
    if inputs.price <= Decimal::ZERO || inputs.strike <= Decimal::ZERO {
        return Err(EngineError::InvalidParameter {
            name: "price",
            reason: "price and strike must be positive".to_string(),
        });
    }
    if inputs.premium < Decimal::ZERO {
        return Err(EngineError::InvalidParameter {
            name: "premium",
            reason: format!("must be non-negative, got {}", inputs.premium),
        });
    }
    if inputs.dte == 0 {
        return Err(EngineError::InvalidParameter {
            name: "dte",
            reason: "must be positive".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&inputs.p_itm) {
        return Err(EngineError::InvalidParameter {
            name: "p_itm",
            reason: format!("must be a fraction in [0, 1], got {}", inputs.p_itm),
        });
    }
    Ok(())
}

fn income_metrics(inputs: &AnalysisInputs) -> Result<IncomeMetrics, EngineError> {
    let price = to_f64(inputs.price, "price")?;
    let premium = to_f64(inputs.premium, "premium")?;
    let strike = to_f64(inputs.strike, "strike")?;

    let return_if_flat = premium / price;
    let annualized_yield = return_if_flat * 365.0 / f64::from(inputs.dte);
    let return_if_assigned = match inputs.right {
        OptionRight::Call => (strike - price + premium) / price,
        OptionRight::Put => (price - strike + premium) / price,
    };
    let breakeven = match inputs.right {
        OptionRight::Call => inputs.strike + inputs.premium,
        OptionRight::Put => inputs.strike - inputs.premium,
    };

    Ok(IncomeMetrics {
        annualized_yield,
        return_if_flat,
        return_if_assigned,
        breakeven,
    })
}

fn risk_metrics(inputs: &AnalysisInputs) -> Result<RiskMetrics, EngineError> {
    // Opportunity cost is the per-share gap between the price target and the
    // strike, floored at zero. No target means zero cost, by definition.
    let opportunity_cost = match inputs.price_target {
        Some(target) => match inputs.right {
            OptionRight::Call => (target - inputs.strike).max(Decimal::ZERO),
            OptionRight::Put => (inputs.strike - target).max(Decimal::ZERO),
        },
        None => Decimal::ZERO,
    };

    let p_itm = to_decimal(inputs.p_itm, "p_itm")?;
    let p_otm = Decimal::ONE - p_itm;
    let expected_value = p_otm * inputs.premium - p_itm * opportunity_cost;

    // Risk proxy: one-sigma move of the underlying over the holding period.
    let price = to_f64(inputs.price, "price")?;
    let horizon_sigma = price * inputs.volatility * (f64::from(inputs.dte) / 365.0).sqrt();
    let risk_adjusted_return = if horizon_sigma > 0.0 {
        to_f64(expected_value, "expected_value")? / horizon_sigma
    } else {
        0.0
    };

    let downside_protection_pct = to_f64(inputs.premium, "premium")? / price * 100.0;

    Ok(RiskMetrics {
        expected_value,
        opportunity_cost,
        risk_adjusted_return,
        downside_protection_pct,
    })
}

/// Per-share strategy P&L at a terminal price.
///
/// Covered call: stock move plus premium minus the short call payoff.
/// Cash-secured put: premium minus the short put payoff.
fn strategy_pnl(inputs: &AnalysisInputs, terminal: Decimal) -> Decimal {
    match inputs.right {
        OptionRight::Call => {
            let call_payoff = (terminal - inputs.strike).max(Decimal::ZERO);
            (terminal - inputs.price) + inputs.premium - call_payoff
        }
        OptionRight::Put => {
            let put_payoff = (inputs.strike - terminal).max(Decimal::ZERO);
            inputs.premium - put_payoff
        }
    }
}

fn scenario(inputs: &AnalysisInputs, label: String, shock_pct: f64, terminal: Decimal) -> ScenarioResult {
    ScenarioResult {
        label,
        shock_pct,
        price: terminal,
        strategy_pnl: strategy_pnl(inputs, terminal),
        buy_hold_pnl: terminal - inputs.price,
    }
}

fn scenarios(inputs: &AnalysisInputs) -> Result<Vec<ScenarioResult>, EngineError> {
    let mut rows = Vec::with_capacity(FIXED_SHOCKS_PCT.len() + 1 + inputs.custom_shocks_pct.len());

    for pct in FIXED_SHOCKS_PCT {
        let factor = Decimal::ONE + to_decimal(pct, "shock_pct")? / dec!(100);
        let terminal = inputs.price * factor;
        let label = if pct == 0.0 {
            "atm".to_string()
        } else {
            format!("{pct:+.0}%")
        };
        rows.push(scenario(inputs, label, pct, terminal));
    }

    // The strike itself is always a scenario of interest.
    let strike_shock =
        (to_f64(inputs.strike, "strike")? / to_f64(inputs.price, "price")? - 1.0) * 100.0;
    rows.push(scenario(inputs, "strike".to_string(), strike_shock, inputs.strike));

    for pct in &inputs.custom_shocks_pct {
        let factor = Decimal::ONE + to_decimal(*pct, "custom_shock_pct")? / dec!(100);
        let terminal = inputs.price * factor;
        rows.push(scenario(inputs, format!("{pct:+.1}%"), *pct, terminal));
    }

    rows.sort_by(|a, b| {
        a.shock_pct
            .partial_cmp(&b.shock_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rows)
}

/// Full income/risk/scenario analysis for one candidate trade.
pub fn analyze(inputs: &AnalysisInputs) -> Result<RiskAnalysis, EngineError> {
    validate(inputs)?;
    Ok(RiskAnalysis {
        income: income_metrics(inputs)?,
        risk: risk_metrics(inputs)?,
        scenarios: scenarios(inputs)?,
    })
}
