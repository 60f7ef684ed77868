use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::normalizer::derived_revenue_growth;
use crate::types::{FinancialHistory, Money, Rate};
use crate::DealIntelResult;

use super::monte_carlo::{
    simulate_dcf, AssumptionDistribution, CancelToken, DcfTrialParams,
};

/// Default explicit projection horizon.
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Industry-default discount rate applied when the caller supplies none.
pub fn default_discount_rate() -> Rate {
    dec!(0.10)
}

/// Default perpetuity growth rate for the terminal value.
pub fn default_terminal_growth() -> Rate {
    dec!(0.02)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Assumptions for the DCF methodology. Every field is optional; omitted
/// values are derived from the financial history or filled with documented
/// defaults. Supplying this struct (even empty) opts the DCF methodology in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Base-year free cash flow. Derived from the latest period's operating
    /// cash flow less capital expenditure when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fcf: Option<Money>,
    /// Explicit projection horizon (default 5 years).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_years: Option<u32>,
    /// Annual cash flow growth rate. Derived from historical revenue growth
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<Rate>,
    /// Discount rate (default 10%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Perpetuity growth rate for the terminal value (default 2%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_growth: Option<Rate>,
    /// Sampling distribution for the growth rate. Defaults to a truncated
    /// Normal around the resolved growth rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_distribution: Option<AssumptionDistribution>,
    /// Sampling distribution for the discount rate. Defaults to a truncated
    /// Normal around the resolved discount rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_distribution: Option<AssumptionDistribution>,
}

/// DCF methodology result with the stochastic overlay applied.
///
/// The point estimate is the trial median; low and high are the 10th and
/// 90th percentiles of the simulated distribution, not min/max.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfMethodResult {
    pub low: Money,
    pub point: Money,
    pub high: Money,
    pub mean: Money,
    /// Methodology confidence in [0, 1], derived from the relative spread
    /// of the simulated distribution.
    pub confidence: Decimal,
    pub trials_run: u32,
    pub trials_skipped: u32,
    pub base_fcf_used: Money,
    pub growth_used: Rate,
    pub discount_used: Rate,
    pub terminal_growth_used: Rate,
    pub horizon_years: u32,
}

// ---------------------------------------------------------------------------
// Methodology entry point
// ---------------------------------------------------------------------------

/// Run the DCF methodology: resolve assumptions, validate them before any
/// simulation starts, then run the Monte Carlo overlay.
pub(crate) fn run_dcf(
    history: &FinancialHistory,
    assumptions: &DcfAssumptions,
    trials: u32,
    seed: u64,
    cancel: Option<&CancelToken>,
    warnings: &mut Vec<String>,
) -> DealIntelResult<DcfMethodResult> {
    // --- Resolve ---
    let base_fcf = resolve_base_fcf(history, assumptions)?;
    let growth = resolve_growth(history, assumptions)?;
    let discount = assumptions.discount_rate.unwrap_or_else(|| {
        warnings.push("DCF: no discount rate supplied; using the 10% industry default".into());
        default_discount_rate()
    });
    let terminal_growth = assumptions.terminal_growth.unwrap_or_else(default_terminal_growth);
    let horizon = assumptions.horizon_years.unwrap_or(DEFAULT_HORIZON_YEARS);

    // --- Validate before simulation ---
    validate_assumptions(growth, discount, terminal_growth, horizon)?;

    let growth_f = to_f64(growth, "growth_rate")?;
    let discount_f = to_f64(discount, "discount_rate")?;

    let params = DcfTrialParams {
        base_fcf: to_f64(base_fcf, "base_fcf")?,
        horizon_years: horizon,
        growth: assumptions
            .growth_distribution
            .clone()
            .unwrap_or_else(|| AssumptionDistribution::around(growth_f)),
        discount: assumptions
            .discount_distribution
            .clone()
            .unwrap_or_else(|| AssumptionDistribution::around(discount_f)),
        terminal_growth: to_f64(terminal_growth, "terminal_growth")?,
        trials,
        seed,
    };

    let summary = simulate_dcf(&params, cancel)?;

    if summary.trials_skipped > 0 {
        warnings.push(format!(
            "DCF: {} of {} trials skipped (sampled terminal spread was non-positive)",
            summary.trials_skipped, trials
        ));
    }

    let low = from_f64(summary.p10)?;
    let point = from_f64(summary.median)?;
    let high = from_f64(summary.p90)?;

    Ok(DcfMethodResult {
        low,
        point,
        high,
        mean: from_f64(summary.mean)?,
        confidence: spread_confidence(low, point, high),
        trials_run: summary.trials_run,
        trials_skipped: summary.trials_skipped,
        base_fcf_used: base_fcf,
        growth_used: growth,
        discount_used: discount,
        terminal_growth_used: terminal_growth,
        horizon_years: horizon,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn resolve_base_fcf(
    history: &FinancialHistory,
    assumptions: &DcfAssumptions,
) -> DealIntelResult<Money> {
    let base = match assumptions.base_fcf {
        Some(fcf) => fcf,
        None => {
            let latest = history.latest().ok_or_else(|| {
                DealIntelError::InsufficientData(
                    "DCF: no base cash flow supplied and no financial periods recorded".into(),
                )
            })?;
            let cfo = latest.items.cash_flow_from_operations.ok_or_else(|| {
                DealIntelError::InsufficientData(
                    "DCF: cannot derive base free cash flow without operating cash flow".into(),
                )
            })?;
            cfo - latest.items.capital_expenditure.unwrap_or(Decimal::ZERO)
        }
    };

    if base == Decimal::ZERO {
        return Err(DealIntelError::InsufficientData(
            "DCF: base free cash flow is zero; a valuation would be fabricated".into(),
        ));
    }
    Ok(base)
}

fn resolve_growth(
    history: &FinancialHistory,
    assumptions: &DcfAssumptions,
) -> DealIntelResult<Rate> {
    match assumptions.growth_rate {
        Some(g) => Ok(g),
        None => derived_revenue_growth(history).ok_or_else(|| {
            DealIntelError::InsufficientData(
                "DCF: no growth rate supplied and fewer than two periods with revenue to derive one"
                    .into(),
            )
        }),
    }
}

fn validate_assumptions(
    growth: Rate,
    discount: Rate,
    terminal_growth: Rate,
    horizon: u32,
) -> DealIntelResult<()> {
    if discount <= Decimal::ZERO {
        return Err(DealIntelError::InvalidAssumption {
            field: "discount_rate".into(),
            reason: "Discount rate must be positive".into(),
        });
    }
    if growth >= discount {
        return Err(DealIntelError::InvalidAssumption {
            field: "growth_rate".into(),
            reason: format!(
                "Growth rate ({growth}) must be below the discount rate ({discount})"
            ),
        });
    }
    if terminal_growth >= discount {
        return Err(DealIntelError::InvalidAssumption {
            field: "terminal_growth".into(),
            reason: format!(
                "Terminal growth ({terminal_growth}) must be below the discount rate ({discount}) for a perpetuity"
            ),
        });
    }
    if horizon < 1 {
        return Err(DealIntelError::InvalidAssumption {
            field: "horizon_years".into(),
            reason: "Projection horizon must be at least one year".into(),
        });
    }
    Ok(())
}

/// Confidence from the relative 10th-90th spread: a tight distribution is
/// trusted more than a wide one. Clamped to [0.05, 0.95].
fn spread_confidence(low: Money, point: Money, high: Money) -> Decimal {
    if point == Decimal::ZERO {
        return dec!(0.05);
    }
    let relative_spread = (high - low) / (dec!(2) * point.abs());
    (Decimal::ONE - relative_spread).clamp(dec!(0.05), dec!(0.95))
}

fn to_f64(value: Decimal, field: &str) -> DealIntelResult<f64> {
    value.to_f64().ok_or_else(|| DealIntelError::InvalidInput {
        field: field.into(),
        reason: "Value is not representable as f64".into(),
    })
}

fn from_f64(value: f64) -> DealIntelResult<Money> {
    Decimal::from_f64(value).ok_or_else(|| DealIntelError::InvalidInput {
        field: "simulated_value".into(),
        reason: format!("Simulated value {value} is not representable"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
