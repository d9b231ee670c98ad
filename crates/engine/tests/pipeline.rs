//! End-to-end pipeline: bars -> blended volatility -> strikes -> scan ->
//! ladder, on one synthetic snapshot.

use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use wheelhouse_core::{EngineConfig, Holding, OptionContract, OptionRight, OptionsChain, PriceBar};
use wheelhouse_engine::{
    build_ladder, ladder::AllocationStrategy, scan, scanner::DeltaBand, volatility, LadderRequest,
    ScanRequest,
};

fn as_of_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn bars() -> Vec<PriceBar> {
    (0..60u32)
        .map(|i| {
            let base = if i % 2 == 0 { dec!(98) } else { dec!(101) };
            PriceBar {
                date: NaiveDate::from_ymd_opt(2025, 3, 1)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(u64::from(i)))
                    .unwrap(),
                open: base,
                high: base + dec!(2),
                low: base - dec!(2),
                close: base + dec!(1),
                adj_close: base + dec!(1),
                volume: 2_000_000,
                dividend: None,
                split_factor: None,
            }
        })
        .collect()
}

fn friday(offset_weeks: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 6)
        .unwrap()
        .checked_add_days(chrono::Days::new(offset_weeks * 7))
        .unwrap()
}

fn chain() -> OptionsChain {
    let mut contracts = Vec::new();
    for week in 0..4u64 {
        for strike in 100..=130 {
            let deep = strike >= 110;
            contracts.push(OptionContract {
                strike: Decimal::from(strike),
                expiry: friday(week),
                right: OptionRight::Call,
                bid: if deep { dec!(0.30) } else { dec!(1.10) },
                ask: if deep { dec!(0.36) } else { dec!(1.16) },
                last: dec!(1.10),
                volume: 300,
                open_interest: 800,
                delta: Some(if deep { 0.12 } else { 0.22 }),
                implied_vol: Some(0.28),
            });
        }
    }
    OptionsChain {
        symbol: "AAPL".to_string(),
        underlying_price: dec!(100),
        retrieved_at: Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap(),
        contracts,
    }
}

#[test]
fn snapshot_flows_through_the_whole_engine() {
    let vol = volatility::blend(&bars(), 20, None).expect("volatility");
    assert!(vol.annualized > 0.0 && vol.annualized.is_finite());

    let mut chains = HashMap::new();
    chains.insert("AAPL".to_string(), chain());
    let mut vols = HashMap::new();
    vols.insert("AAPL".to_string(), vol.annualized);
    let earnings = HashMap::new();
    let holdings = vec![Holding::new("AAPL", 500)];

    let request = ScanRequest {
        holdings: &holdings,
        chains: &chains,
        volatilities: &vols,
        earnings: &earnings,
        as_of: Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap(),
        max_dte: 45,
        band: DeltaBand::Moderate,
    };
    let config = EngineConfig::default();
    let report = scan(&request, &config);

    // Partition: every examined call landed exactly one side.
    let examined = 4 * 31; // four weeks, strikes 100..=130
    assert_eq!(report.candidates.len() + report.rejected.len(), examined);
    assert!(!report.candidates.is_empty());

    // Every accepted candidate carries both probability views and a full
    // scenario grid.
    for candidate in &report.candidates {
        assert!(candidate.probability.p_itm_model > 0.0);
        assert!(candidate.probability.p_itm_model < 1.0);
        assert_eq!(candidate.probability.delta_chain, Some(0.22));
        assert_eq!(candidate.analysis.scenarios.len(), 8);
        assert!(candidate.net_credit < candidate.premium);
    }

    // Ranking is by descending annualized net yield.
    for pair in report.candidates.windows(2) {
        assert!(pair[0].net_premium_yield >= pair[1].net_premium_yield);
    }

    let ladder = build_ladder(
        &LadderRequest {
            symbol: "AAPL".to_string(),
            total_shares: 400,
            price: dec!(100),
            volatility: vol.annualized,
            weeks: 4,
            strategy: AllocationStrategy::Equal,
            base_sigma: 1.5,
            right: OptionRight::Call,
            strike_increment: dec!(1),
            earnings: None,
            risk_free_rate: config.rates.risk_free_rate,
        },
        &chain(),
        as_of_date(),
    )
    .expect("ladder");

    assert_eq!(ladder.legs.len(), 4);
    assert_eq!(ladder.shares_laddered, 400);
    assert_eq!(ladder.legs.iter().map(|l| l.shares).sum::<u64>(), 400);
}

#[test]
fn identical_inputs_give_bitwise_identical_outputs() {
    let run = || {
        let vol = volatility::blend(&bars(), 20, None).unwrap();
        let mut chains = HashMap::new();
        chains.insert("AAPL".to_string(), chain());
        let mut vols = HashMap::new();
        vols.insert("AAPL".to_string(), vol.annualized);
        let earnings = HashMap::new();
        let holdings = vec![Holding::new("AAPL", 500)];
        let report = scan(
            &ScanRequest {
                holdings: &holdings,
                chains: &chains,
                volatilities: &vols,
                earnings: &earnings,
                as_of: Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap(),
                max_dte: 45,
                band: DeltaBand::Moderate,
            },
            &EngineConfig::default(),
        );
        (vol, report)
    };

    let (vol_a, report_a) = run();
    let (vol_b, report_b) = run();

    assert_eq!(vol_a.annualized.to_bits(), vol_b.annualized.to_bits());
    assert_eq!(report_a, report_b);
    for (a, b) in report_a.candidates.iter().zip(&report_b.candidates) {
        assert_eq!(a.net_premium_yield.to_bits(), b.net_premium_yield.to_bits());
        assert_eq!(
            a.probability.p_itm_model.to_bits(),
            b.probability.p_itm_model.to_bits()
        );
    }
}
