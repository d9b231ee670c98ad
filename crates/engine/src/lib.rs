//! Deterministic option-selling decision engine.
//!
//! Turns a market-data snapshot (price bars, options chain, earnings date,
//! holdings) into ranked, auditable trade candidates:
//! - Estimates volatility from daily bars and blends estimators
//! - Targets strikes at a sigma distance and rounds them tradeable
//! - Scores income, risk, and price scenarios per candidate
//! - Scans a basket of holdings for covered-call overlays
//! - Splits large positions across weekly expiration ladders
//!
//! Every call is a pure function of its inputs — no I/O, no clock reads, no
//! state across calls. Rejections and degradations are always structured,
//! never silent.

pub mod ladder;
pub mod math;
pub mod risk;
pub mod scanner;
pub mod strike;
pub mod volatility;

pub use ladder::{build_ladder, AllocationStrategy, LadderLeg, LadderRequest, LadderResult};
pub use risk::{analyze, AnalysisInputs, IncomeMetrics, RiskAnalysis, RiskMetrics, ScenarioResult};
pub use scanner::{
    scan, DeltaBand, RejectedCandidate, RejectionReason, ScanReport, ScanRequest, ScannerCandidate,
};
pub use strike::{
    assignment_probability, probability_result, recommendations, round_to_tradeable,
    strike_at_sigma, strike_result, ProbabilityResult, RoundingDirection, SigmaProfile,
    StrikeCandidate, StrikeResult,
};
pub use volatility::{
    blend, close_to_close, garman_klass, parkinson, yang_zhang, BlendWeights, BlendedVolatility,
    Estimator, VolatilityEstimate,
};
