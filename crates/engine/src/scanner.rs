//! Covered-call overlay scanner.
//!
//! Per-holding pipeline: Size -> Gate(earnings) -> Select(delta band) ->
//! Filter(tradability) -> Cost(fee + slippage) -> Rank. Every candidate the
//! scanner examines ends up accepted or rejected with a reason — nothing is
//! discarded silently, and one bad symbol never poisons the rest of the
//! batch.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wheelhouse_core::{
    DataQualityWarning, EngineConfig, EngineError, Holding, OptionRight, OptionsChain,
};

use crate::math::to_f64;
use crate::risk::{self, AnalysisInputs, RiskAnalysis};
use crate::strike::{probability_result, ProbabilityResult};

/// Delta bands used to select weekly candidates. Deltas, not sigma — the
/// broker-quoted delta is the risk signal the desk actually watches for
/// short-dated contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaBand {
    Defensive,
    Conservative,
    Moderate,
    Aggressive,
}

impl DeltaBand {
    /// Inclusive |delta| range for this band.
    #[must_use]
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::Defensive => (0.05, 0.10),
            Self::Conservative => (0.10, 0.15),
            Self::Moderate => (0.15, 0.25),
            Self::Aggressive => (0.25, 0.35),
        }
    }

    #[must_use]
    pub fn contains(self, delta: f64) -> bool {
        let (lo, hi) = self.range();
        let d = delta.abs();
        d >= lo && d <= hi
    }
}

/// Why a candidate was rejected. Closed set — consumers can match
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    EarningsConflict,
    ZeroBid,
    SpreadTooWide,
    DeltaOutOfBand,
    BelowOpenInterest,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EarningsConflict => write!(f, "earnings_conflict"),
            Self::ZeroBid => write!(f, "zero_bid"),
            Self::SpreadTooWide => write!(f, "spread_too_wide"),
            Self::DeltaOutOfBand => write!(f, "delta_out_of_band"),
            Self::BelowOpenInterest => write!(f, "below_open_interest"),
        }
    }
}

/// A contract that survived the full pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerCandidate {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    pub dte: u32,
    pub contracts: u64,
    /// Quoted midpoint premium per share.
    pub premium: Decimal,
    /// Premium net of commission and modeled slippage, per share.
    pub net_credit: Decimal,
    /// Annualized net premium yield, the ranking key.
    pub net_premium_yield: f64,
    pub probability: ProbabilityResult,
    pub analysis: RiskAnalysis,
}

/// A contract the pipeline examined and refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    pub reason: RejectionReason,
}

/// A holding too small to write even one contract under the cap. Surfaced,
/// never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroContractHolding {
    pub symbol: String,
    pub shares: u64,
}

/// Full scan output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Survivors, ranked by descending annualized net premium yield.
    pub candidates: Vec<ScannerCandidate>,
    pub rejected: Vec<RejectedCandidate>,
    pub zero_contract: Vec<ZeroContractHolding>,
    pub warnings: Vec<DataQualityWarning>,
}

/// One scan's inputs. All references are caller-owned snapshots.
#[derive(Debug)]
pub struct ScanRequest<'a> {
    pub holdings: &'a [Holding],
    /// Chain snapshot per symbol.
    pub chains: &'a HashMap<String, OptionsChain>,
    /// Annualized volatility per symbol, from the volatility engine.
    pub volatilities: &'a HashMap<String, f64>,
    /// Next earnings date per symbol, where one is known.
    pub earnings: &'a HashMap<String, NaiveDate>,
    /// Snapshot time the scan is evaluated at.
    pub as_of: DateTime<Utc>,
    /// Contracts expiring beyond this horizon are not examined.
    pub max_dte: u32,
    pub band: DeltaBand,
}

/// Scans every holding and partitions examined contracts into accepted and
/// rejected. Per-symbol failures become warnings, not batch failures.
#[must_use]
pub fn scan(request: &ScanRequest<'_>, config: &EngineConfig) -> ScanReport {
    let mut report = ScanReport {
        candidates: Vec::new(),
        rejected: Vec::new(),
        zero_contract: Vec::new(),
        warnings: Vec::new(),
    };

    for holding in request.holdings {
        if let Err(e) = scan_holding(holding, request, config, &mut report) {
            warn!(symbol = holding.symbol, error = %e, "symbol skipped");
            report.warnings.push(DataQualityWarning::SymbolSkipped {
                symbol: holding.symbol.clone(),
                detail: e.to_string(),
            });
        }
    }

    report.candidates.sort_by(|a, b| {
        b.net_premium_yield
            .partial_cmp(&a.net_premium_yield)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.expiry.cmp(&b.expiry))
            .then_with(|| a.strike.cmp(&b.strike))
    });

    debug!(
        accepted = report.candidates.len(),
        rejected = report.rejected.len(),
        "overlay scan complete"
    );
    report
}

fn scan_holding(
    holding: &Holding,
    request: &ScanRequest<'_>,
    config: &EngineConfig,
    report: &mut ScanReport,
) -> Result<(), EngineError> {
    let chain = request
        .chains
        .get(&holding.symbol)
        .ok_or_else(|| EngineError::MalformedChain {
            symbol: holding.symbol.clone(),
            detail: "no chain snapshot supplied".to_string(),
        })?;
    let volatility = *request
        .volatilities
        .get(&holding.symbol)
        .ok_or_else(|| EngineError::InvalidParameter {
            name: "volatility",
            reason: format!("no volatility supplied for {}", holding.symbol),
        })?;

    report
        .warnings
        .extend(chain.validate(request.as_of, config.liquidity.max_quote_age_secs)?);

    // Size. Zero contracts is an answer, not an error.
    let contracts = holding.contracts_to_sell(config.overlay.overwrite_cap_pct);
    if contracts == 0 {
        report.zero_contract.push(ZeroContractHolding {
            symbol: holding.symbol.clone(),
            shares: holding.shares,
        });
        return Ok(());
    }

    let today = request.as_of.date_naive();
    let earnings = request.earnings.get(&holding.symbol).copied();

    for contract in &chain.contracts {
        if contract.right != OptionRight::Call {
            continue;
        }
        let dte = (contract.expiry - today).num_days();
        if dte <= 0 || dte > i64::from(request.max_dte) {
            continue;
        }
        let dte = dte as u32;

        let reject = |reason: RejectionReason| RejectedCandidate {
            symbol: holding.symbol.clone(),
            expiry: contract.expiry,
            strike: contract.strike,
            right: contract.right,
            reason,
        };

        // Gate: hard earnings exclusion, unless disabled.
        if config.overlay.earnings_gate {
            if let Some(date) = earnings {
                if date > today && date <= contract.expiry {
                    report.rejected.push(reject(RejectionReason::EarningsConflict));
                    continue;
                }
            }
        }

        // Select: quoted delta inside the band. No delta, no selection.
        match contract.delta {
            Some(delta) if request.band.contains(delta) => {}
            _ => {
                report.rejected.push(reject(RejectionReason::DeltaOutOfBand));
                continue;
            }
        }

        // Filter: tradability.
        if contract.bid <= Decimal::ZERO {
            report.rejected.push(reject(RejectionReason::ZeroBid));
            continue;
        }
        if contract.spread() > config.liquidity.max_spread_abs
            || contract.spread_pct() > config.liquidity.max_spread_pct
        {
            report.rejected.push(reject(RejectionReason::SpreadTooWide));
            continue;
        }
        if contract.open_interest < config.liquidity.min_open_interest {
            report.rejected.push(reject(RejectionReason::BelowOpenInterest));
            continue;
        }
        if contract.spread_pct() > config.liquidity.max_spread_pct / 2.0 {
            report.warnings.push(DataQualityWarning::WideSpread {
                symbol: holding.symbol.clone(),
                strike: contract.strike,
                expiry: contract.expiry,
                spread_pct: contract.spread_pct(),
            });
        }

        // Cost: commission plus half the spread, capped.
        let premium = contract.mid();
        let half_spread = contract.spread() / Decimal::from(2);
        let slippage = half_spread.min(config.costs.slippage_cap);
        let net_credit = premium - config.costs.per_contract_fee / Decimal::from(100) - slippage;

        let probability = probability_result(
            chain.underlying_price,
            contract.strike,
            volatility,
            dte,
            config.rates.risk_free_rate,
            contract.right,
            contract.delta,
        )?;

        let analysis = risk::analyze(&AnalysisInputs {
            price: chain.underlying_price,
            strike: contract.strike,
            premium,
            dte,
            right: contract.right,
            p_itm: probability.p_itm_model,
            volatility,
            price_target: None,
            custom_shocks_pct: Vec::new(),
        })?;

        let net_yield = to_f64(net_credit / chain.underlying_price, "net_credit")?
            * 365.0
            / f64::from(dte);

        report.candidates.push(ScannerCandidate {
            symbol: holding.symbol.clone(),
            expiry: contract.expiry,
            strike: contract.strike,
            right: contract.right,
            dte,
            contracts,
            premium,
            net_credit,
            net_premium_yield: net_yield,
            probability,
            analysis,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use wheelhouse_core::OptionContract;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap()
    }

    fn contract(
        strike: Decimal,
        expiry: NaiveDate,
        bid: Decimal,
        ask: Decimal,
        oi: u64,
        delta: Option<f64>,
    ) -> OptionContract {
        OptionContract {
            strike,
            expiry,
            right: OptionRight::Call,
            bid,
            ask,
            last: bid,
            volume: 200,
            open_interest: oi,
            delta,
            implied_vol: Some(0.25),
        }
    }

    fn chain(symbol: &str, contracts: Vec<OptionContract>) -> OptionsChain {
        OptionsChain {
            symbol: symbol.to_string(),
            underlying_price: dec!(100),
            retrieved_at: as_of(),
            contracts,
        }
    }

    struct Fixture {
        holdings: Vec<Holding>,
        chains: HashMap<String, OptionsChain>,
        volatilities: HashMap<String, f64>,
        earnings: HashMap<String, NaiveDate>,
    }

    impl Fixture {
        fn request(&self) -> ScanRequest<'_> {
            ScanRequest {
                holdings: &self.holdings,
                chains: &self.chains,
                volatilities: &self.volatilities,
                earnings: &self.earnings,
                as_of: as_of(),
                max_dte: 45,
                band: DeltaBand::Moderate,
            }
        }
    }

    fn fixture(contracts: Vec<OptionContract>) -> Fixture {
        let mut chains = HashMap::new();
        chains.insert("AAPL".to_string(), chain("AAPL", contracts));
        let mut volatilities = HashMap::new();
        volatilities.insert("AAPL".to_string(), 0.25);
        Fixture {
            holdings: vec![Holding::new("AAPL", 500)],
            chains,
            volatilities,
            earnings: HashMap::new(),
        }
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.overlay.overwrite_cap_pct = 25; // 500 shares -> 1 contract
        config
    }

    #[test]
    fn accepted_and_rejected_partition_every_examined_contract() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let contracts = vec![
            contract(dec!(105), expiry, dec!(1.00), dec!(1.06), 500, Some(0.20)),
            contract(dec!(110), expiry, dec!(0.40), dec!(0.46), 500, Some(0.08)), // out of band
            contract(dec!(115), expiry, dec!(0), dec!(0.10), 500, Some(0.20)),    // zero bid
            contract(dec!(120), expiry, dec!(0.10), dec!(0.70), 500, Some(0.20)), // wide
            contract(dec!(125), expiry, dec!(0.40), dec!(0.42), 10, Some(0.20)),  // thin OI
        ];
        let examined = contracts.len();
        let fix = fixture(contracts);
        let report = scan(&fix.request(), &config());

        assert_eq!(report.candidates.len() + report.rejected.len(), examined);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].strike, dec!(105));

        let reasons: Vec<RejectionReason> =
            report.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectionReason::DeltaOutOfBand,
                RejectionReason::ZeroBid,
                RejectionReason::SpreadTooWide,
                RejectionReason::BelowOpenInterest,
            ]
        );
    }

    #[test]
    fn earnings_gate_excludes_spanning_contracts() {
        let near = NaiveDate::from_ymd_opt(2025, 6, 13).unwrap();
        let far = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let mut fix = fixture(vec![
            contract(dec!(105), near, dec!(1.00), dec!(1.06), 500, Some(0.20)),
            contract(dec!(105), far, dec!(1.40), dec!(1.46), 500, Some(0.22)),
        ]);
        // Earnings between the two expiries: only the far contract spans it.
        fix.earnings.insert(
            "AAPL".to_string(),
            NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
        );
        let report = scan(&fix.request(), &config());

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].expiry, near);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].reason, RejectionReason::EarningsConflict);
    }

    #[test]
    fn earnings_gate_can_be_disabled() {
        let far = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let mut fix = fixture(vec![contract(
            dec!(105),
            far,
            dec!(1.40),
            dec!(1.46),
            500,
            Some(0.22),
        )]);
        fix.earnings.insert(
            "AAPL".to_string(),
            NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
        );
        let mut cfg = config();
        cfg.overlay.earnings_gate = false;
        let report = scan(&fix.request(), &cfg);
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn missing_delta_cannot_be_selected_by_band() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let fix = fixture(vec![contract(
            dec!(105),
            expiry,
            dec!(1.00),
            dec!(1.06),
            500,
            None,
        )]);
        let report = scan(&fix.request(), &config());
        assert!(report.candidates.is_empty());
        assert_eq!(report.rejected[0].reason, RejectionReason::DeltaOutOfBand);
    }

    #[test]
    fn zero_contract_holdings_are_surfaced() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let mut fix = fixture(vec![contract(
            dec!(105),
            expiry,
            dec!(1.00),
            dec!(1.06),
            500,
            Some(0.20),
        )]);
        fix.holdings = vec![Holding::new("AAPL", 300)]; // 300 * 25 / 10000 = 0
        let report = scan(&fix.request(), &config());

        assert!(report.candidates.is_empty());
        assert!(report.rejected.is_empty());
        assert_eq!(
            report.zero_contract,
            vec![ZeroContractHolding {
                symbol: "AAPL".to_string(),
                shares: 300,
            }]
        );
    }

    #[test]
    fn net_credit_subtracts_fee_and_capped_slippage() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let fix = fixture(vec![contract(
            dec!(105),
            expiry,
            dec!(1.00),
            dec!(1.06),
            500,
            Some(0.20),
        )]);
        let report = scan(&fix.request(), &config());

        let candidate = &report.candidates[0];
        assert_eq!(candidate.premium, dec!(1.03));
        // mid 1.03 - fee 0.65/100 - min(half spread 0.03, cap 0.05)
        assert_eq!(candidate.net_credit, dec!(1.03) - dec!(0.0065) - dec!(0.03));
    }

    #[test]
    fn bad_symbol_is_isolated_from_the_batch() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let mut fix = fixture(vec![contract(
            dec!(105),
            expiry,
            dec!(1.00),
            dec!(1.06),
            500,
            Some(0.20),
        )]);
        // Second holding with no chain snapshot at all.
        fix.holdings.push(Holding::new("MSFT", 800));
        let report = scan(&fix.request(), &config());

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].symbol, "AAPL");
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::SymbolSkipped { symbol, .. } if symbol == "MSFT"
        )));
    }

    #[test]
    fn candidates_rank_by_net_premium_yield() {
        let near = NaiveDate::from_ymd_opt(2025, 6, 13).unwrap();
        let far = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let fix = fixture(vec![
            contract(dec!(105), far, dec!(1.00), dec!(1.06), 500, Some(0.20)),
            contract(dec!(104), near, dec!(1.00), dec!(1.06), 500, Some(0.20)),
        ]);
        let report = scan(&fix.request(), &config());

        assert_eq!(report.candidates.len(), 2);
        // Same credit over fewer days annualizes higher.
        assert_eq!(report.candidates[0].expiry, near);
        assert!(
            report.candidates[0].net_premium_yield > report.candidates[1].net_premium_yield
        );
    }

    #[test]
    fn report_serializes_with_stable_field_names() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let fix = fixture(vec![contract(
            dec!(105),
            expiry,
            dec!(1.00),
            dec!(1.06),
            500,
            Some(0.20),
        )]);
        let report = scan(&fix.request(), &config());
        let json = serde_json::to_value(&report).unwrap();

        let candidate = &json["candidates"][0];
        for field in [
            "symbol",
            "expiry",
            "strike",
            "net_credit",
            "net_premium_yield",
            "probability",
            "analysis",
        ] {
            assert!(!candidate[field].is_null(), "missing field {field}");
        }
        // The two probability views stay separate on the wire.
        assert!(!candidate["probability"]["p_itm_model"].is_null());
        assert!(!candidate["probability"]["delta_chain"].is_null());
    }

    #[test]
    fn scan_is_deterministic() {
        let expiry = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let fix = fixture(vec![
            contract(dec!(105), expiry, dec!(1.00), dec!(1.06), 500, Some(0.20)),
            contract(dec!(110), expiry, dec!(0.40), dec!(0.46), 500, Some(0.16)),
        ]);
        let a = scan(&fix.request(), &config());
        let b = scan(&fix.request(), &config());
        assert_eq!(a, b);
    }
}
