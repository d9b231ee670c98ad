//! Historical volatility estimators and estimator blending.
//!
//! Four estimators over daily bars: close-to-close, Parkinson, Garman-Klass,
//! and Yang-Zhang. Each fails loudly on insufficient data; the blend
//! redistributes a failed estimator's weight across the survivors and says
//! so in a warning rather than dropping it silently.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wheelhouse_core::{DataQualityWarning, EngineError, PriceBar};

/// Trading days per year used for annualization.
const TRADING_DAYS: f64 = 252.0;

/// The four supported estimators, in blend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    CloseToClose,
    Parkinson,
    GarmanKlass,
    YangZhang,
}

impl Estimator {
    pub const ALL: [Estimator; 4] = [
        Estimator::CloseToClose,
        Estimator::Parkinson,
        Estimator::GarmanKlass,
        Estimator::YangZhang,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CloseToClose => "close_to_close",
            Self::Parkinson => "parkinson",
            Self::GarmanKlass => "garman_klass",
            Self::YangZhang => "yang_zhang",
        }
    }
}

impl std::fmt::Display for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One estimator's annualized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityEstimate {
    pub estimator: Estimator,
    /// Annualized volatility as a decimal (0.25 = 25%).
    pub annualized: f64,
    /// Lookback window in return observations.
    pub window: usize,
}

/// Blend weights per estimator. Must be non-negative and sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub close_to_close: f64,
    pub parkinson: f64,
    pub garman_klass: f64,
    pub yang_zhang: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            close_to_close: 0.25,
            parkinson: 0.25,
            garman_klass: 0.25,
            yang_zhang: 0.25,
        }
    }
}

impl BlendWeights {
    #[must_use]
    pub fn get(&self, estimator: Estimator) -> f64 {
        match estimator {
            Estimator::CloseToClose => self.close_to_close,
            Estimator::Parkinson => self.parkinson,
            Estimator::GarmanKlass => self.garman_klass,
            Estimator::YangZhang => self.yang_zhang,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let weights = [
            self.close_to_close,
            self.parkinson,
            self.garman_klass,
            self.yang_zhang,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(EngineError::InvalidParameter {
                name: "blend_weights",
                reason: "weights must be non-negative and finite".to_string(),
            });
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(EngineError::InvalidParameter {
                name: "blend_weights",
                reason: format!("weights must sum to 1.0, got {sum}"),
            });
        }
        Ok(())
    }
}

/// Weighted blend of the estimators that succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedVolatility {
    /// Annualized blended volatility.
    pub annualized: f64,
    /// Per-estimator results that contributed to the blend.
    pub estimates: Vec<VolatilityEstimate>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Drops bars an estimator cannot price, recording one warning per exclusion.
fn usable_bars<'a>(bars: &'a [PriceBar]) -> (Vec<&'a PriceBar>, Vec<DataQualityWarning>) {
    let mut usable = Vec::with_capacity(bars.len());
    let mut warnings = Vec::new();
    for bar in bars {
        if bar.has_valid_ohlc() {
            usable.push(bar);
        } else {
            warnings.push(DataQualityWarning::BarExcluded {
                date: bar.date,
                detail: "invalid OHLC range".to_string(),
            });
        }
    }
    (usable, warnings)
}

fn check_window(window: usize) -> Result<(), EngineError> {
    if window < 2 {
        return Err(EngineError::InvalidParameter {
            name: "window",
            reason: format!("lookback window must be at least 2, got {window}"),
        });
    }
    Ok(())
}

/// The most recent `count` usable bars, oldest first.
fn tail<'a>(
    bars: &[&'a PriceBar],
    count: usize,
    estimator: &'static str,
) -> Result<Vec<&'a PriceBar>, EngineError> {
    if bars.len() < count {
        return Err(EngineError::InsufficientData {
            estimator,
            required: count,
            actual: bars.len(),
        });
    }
    Ok(bars[bars.len() - count..].to_vec())
}

fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

fn ln_ratio(a: &rust_decimal::Decimal, b: &rust_decimal::Decimal) -> f64 {
    // Callers guarantee positive prices via has_valid_ohlc.
    (a.to_f64().unwrap_or(0.0) / b.to_f64().unwrap_or(1.0)).ln()
}

/// Close-to-close estimator: stdev of log returns of adjusted closes.
///
/// Needs `window + 1` bars to form `window` returns.
pub fn close_to_close(bars: &[PriceBar], window: usize) -> Result<VolatilityEstimate, EngineError> {
    check_window(window)?;
    let (usable, _) = usable_bars(bars);
    let tail = tail(&usable, window + 1, "close_to_close")?;

    let returns: Vec<f64> = tail
        .windows(2)
        .map(|pair| ln_ratio(&pair[1].adj_close, &pair[0].adj_close))
        .collect();

    let annualized = (sample_variance(&returns) * TRADING_DAYS).sqrt();
    Ok(VolatilityEstimate {
        estimator: Estimator::CloseToClose,
        annualized,
        window,
    })
}

/// Parkinson estimator from the high/low range only.
///
/// sigma^2 = (1 / 4 ln 2) * mean[(ln H/L)^2]. Structurally lower variance
/// than close-to-close because each bar contributes a full range.
pub fn parkinson(bars: &[PriceBar], window: usize) -> Result<VolatilityEstimate, EngineError> {
    check_window(window)?;
    let (usable, _) = usable_bars(bars);
    let tail = tail(&usable, window, "parkinson")?;

    let factor = 1.0 / (4.0 * std::f64::consts::LN_2);
    let mean_sq = tail
        .iter()
        .map(|b| ln_ratio(&b.high, &b.low).powi(2))
        .sum::<f64>()
        / tail.len() as f64;

    let annualized = (factor * mean_sq * TRADING_DAYS).sqrt();
    Ok(VolatilityEstimate {
        estimator: Estimator::Parkinson,
        annualized,
        window,
    })
}

/// Garman-Klass estimator: Parkinson range term plus an open/close term.
pub fn garman_klass(bars: &[PriceBar], window: usize) -> Result<VolatilityEstimate, EngineError> {
    check_window(window)?;
    let (usable, _) = usable_bars(bars);
    let tail = tail(&usable, window, "garman_klass")?;

    let oc_coeff = 2.0 * std::f64::consts::LN_2 - 1.0;
    let mean_var = tail
        .iter()
        .map(|b| {
            let hl = ln_ratio(&b.high, &b.low);
            let co = ln_ratio(&b.close, &b.open);
            0.5 * hl * hl - oc_coeff * co * co
        })
        .sum::<f64>()
        / tail.len() as f64;

    // The open/close term can push a pathological sample negative; variance floors at zero.
    let annualized = (mean_var.max(0.0) * TRADING_DAYS).sqrt();
    Ok(VolatilityEstimate {
        estimator: Estimator::GarmanKlass,
        annualized,
        window,
    })
}

/// Yang-Zhang estimator: overnight + open-to-close + Rogers-Satchell terms.
///
/// Robust to opening jumps. Needs `window + 1` bars for the overnight
/// component.
pub fn yang_zhang(bars: &[PriceBar], window: usize) -> Result<VolatilityEstimate, EngineError> {
    check_window(window)?;
    let (usable, _) = usable_bars(bars);
    let tail = tail(&usable, window + 1, "yang_zhang")?;

    let n = window as f64;
    let mut overnight = Vec::with_capacity(window);
    let mut open_close = Vec::with_capacity(window);
    let mut rs_sum = 0.0;

    for pair in tail.windows(2) {
        let prev = pair[0];
        let bar = pair[1];
        overnight.push(ln_ratio(&bar.open, &prev.close));
        open_close.push(ln_ratio(&bar.close, &bar.open));

        let hc = ln_ratio(&bar.high, &bar.close);
        let ho = ln_ratio(&bar.high, &bar.open);
        let lc = ln_ratio(&bar.low, &bar.close);
        let lo = ln_ratio(&bar.low, &bar.open);
        rs_sum += hc * ho + lc * lo;
    }

    let sigma_overnight = sample_variance(&overnight);
    let sigma_open_close = sample_variance(&open_close);
    let sigma_rs = rs_sum / n;

    let k = 0.34 / (1.34 + (n + 1.0) / (n - 1.0));
    let variance = sigma_overnight + k * sigma_open_close + (1.0 - k) * sigma_rs;

    let annualized = (variance.max(0.0) * TRADING_DAYS).sqrt();
    Ok(VolatilityEstimate {
        estimator: Estimator::YangZhang,
        annualized,
        window,
    })
}

fn estimate(
    estimator: Estimator,
    bars: &[PriceBar],
    window: usize,
) -> Result<VolatilityEstimate, EngineError> {
    match estimator {
        Estimator::CloseToClose => close_to_close(bars, window),
        Estimator::Parkinson => parkinson(bars, window),
        Estimator::GarmanKlass => garman_klass(bars, window),
        Estimator::YangZhang => yang_zhang(bars, window),
    }
}

/// Blends the four estimators with the given weights (default equal).
///
/// Estimators that fail on insufficient data have their weight redistributed
/// proportionally among the survivors, with a warning per failure. Invalid
/// parameters (bad window, bad weights) fail the whole call.
pub fn blend(
    bars: &[PriceBar],
    window: usize,
    weights: Option<BlendWeights>,
) -> Result<BlendedVolatility, EngineError> {
    check_window(window)?;
    let weights = weights.unwrap_or_default();
    weights.validate()?;

    let (usable, mut warnings) = usable_bars(bars);

    let mut estimates = Vec::new();
    let mut weighted = Vec::new();
    for estimator in Estimator::ALL {
        let weight = weights.get(estimator);
        if weight == 0.0 {
            continue;
        }
        match estimate(estimator, bars, window) {
            Ok(est) => {
                weighted.push((weight, est.annualized));
                estimates.push(est);
            }
            Err(EngineError::InsufficientData { .. }) => {
                debug!(estimator = %estimator, weight, "estimator failed; redistributing weight");
                warnings.push(DataQualityWarning::WeightRedistributed {
                    estimator: estimator.name().to_string(),
                    weight,
                });
            }
            Err(e) => return Err(e),
        }
    }

    if weighted.is_empty() {
        return Err(EngineError::InsufficientData {
            estimator: "blend",
            required: window + 1,
            actual: usable.len(),
        });
    }

    // Renormalize surviving weights so they still sum to 1.
    let live_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
    let annualized = weighted
        .iter()
        .map(|(w, v)| (w / live_weight) * v)
        .sum::<f64>();

    Ok(BlendedVolatility {
        annualized,
        estimates,
        warnings,
    })
}
