//! Shared numeric helpers — Decimal/f64 boundary and the normal CDF.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use statrs::distribution::{ContinuousCDF, Normal};

use wheelhouse_core::EngineError;

/// Standard normal CDF (erf-based via statrs).
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Converts a monetary value to f64 for the volatility/probability math.
pub(crate) fn to_f64(value: Decimal, name: &'static str) -> Result<f64, EngineError> {
    value.to_f64().ok_or_else(|| EngineError::InvalidParameter {
        name,
        reason: format!("{value} is not representable as f64"),
    })
}

/// Converts a math result back to a monetary value.
pub(crate) fn to_decimal(value: f64, name: &'static str) -> Result<Decimal, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::InvalidParameter {
            name,
            reason: format!("{value} is not finite"),
        });
    }
    Decimal::from_f64(value).ok_or_else(|| EngineError::InvalidParameter {
        name,
        reason: format!("{value} is outside the Decimal range"),
    })
}

/// Rejects non-positive required parameters up front.
pub(crate) fn require_positive(value: f64, name: &'static str) -> Result<(), EngineError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(EngineError::InvalidParameter {
            name,
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(())
}
