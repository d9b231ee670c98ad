//! Engine configuration — thresholds, cost model, overlay policy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub liquidity: LiquidityConfig,
    pub costs: CostConfig,
    pub overlay: OverlayConfig,
    pub rates: RateConfig,
}

/// Tradability thresholds applied when filtering chain contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Minimum open interest for a contract to be considered.
    pub min_open_interest: u64,
    /// Maximum absolute bid/ask spread in currency units.
    pub max_spread_abs: Decimal,
    /// Maximum spread as a fraction of the midpoint.
    pub max_spread_pct: f64,
    /// Chain snapshots older than this attach a stale-quote warning.
    pub max_quote_age_secs: i64,
}

/// Execution cost model for net-credit pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Broker commission per contract.
    pub per_contract_fee: Decimal,
    /// Cap on modeled slippage per contract (half-spread above this is not charged).
    pub slippage_cap: Decimal,
}

/// Covered-call overlay policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Maximum fraction of each holding sellable as calls, in whole percent.
    pub overwrite_cap_pct: u32,
    /// Exclude contracts whose window spans the next earnings date.
    pub earnings_gate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Annualized risk-free rate used in the probability model.
    pub risk_free_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            liquidity: LiquidityConfig {
                min_open_interest: 100,
                max_spread_abs: Decimal::new(15, 2), // 0.15
                max_spread_pct: 0.10,
                max_quote_age_secs: 300,
            },
            costs: CostConfig {
                per_contract_fee: Decimal::new(65, 2), // 0.65
                slippage_cap: Decimal::new(5, 2),      // 0.05
            },
            overlay: OverlayConfig {
                overwrite_cap_pct: 50,
                earnings_gate: true,
            },
            rates: RateConfig {
                risk_free_rate: 0.05,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_cost_model() {
        let config = EngineConfig::default();
        assert_eq!(config.costs.per_contract_fee, dec!(0.65));
        assert_eq!(config.costs.slippage_cap, dec!(0.05));
    }

    #[test]
    fn default_gate_is_on() {
        assert!(EngineConfig::default().overlay.earnings_gate);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
