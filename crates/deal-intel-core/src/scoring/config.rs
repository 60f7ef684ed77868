use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::types::{Money, Rate, Score};
use crate::DealIntelResult;

/// Weights applied to the five scoring dimensions. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub financial: Decimal,
    pub strategic: Decimal,
    pub risk: Decimal,
    pub market: Decimal,
    pub team: Decimal,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            financial: dec!(0.30),
            strategic: dec!(0.25),
            risk: dec!(0.20),
            market: dec!(0.15),
            team: dec!(0.10),
        }
    }
}

impl DimensionWeights {
    pub fn sum(&self) -> Decimal {
        self.financial + self.strategic + self.risk + self.market + self.team
    }

    fn validate(&self) -> DealIntelResult<()> {
        let all = [
            ("financial", self.financial),
            ("strategic", self.strategic),
            ("risk", self.risk),
            ("market", self.market),
            ("team", self.team),
        ];
        for (name, w) in all {
            if w < Decimal::ZERO {
                return Err(DealIntelError::InvalidInput {
                    field: format!("weights.{name}"),
                    reason: "Weights must be non-negative".into(),
                });
            }
        }
        if (self.sum() - Decimal::ONE).abs() > dec!(0.000001) {
            return Err(DealIntelError::InvalidInput {
                field: "weights".into(),
                reason: format!("Dimension weights must sum to 1.0 (got {})", self.sum()),
            });
        }
        Ok(())
    }
}

/// Risk-level boundaries over the risk sub-score. A higher risk sub-score
/// means lower detected risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    /// At or above: low risk.
    pub low: Score,
    /// At or above: medium risk.
    pub medium: Score,
    /// At or above: high risk; below: critical.
    pub high: Score,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            low: dec!(75),
            medium: dec!(50),
            high: dec!(25),
        }
    }
}

/// Overall-score boundaries for the recommendation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    pub proceed: Score,
    pub proceed_with_caution: Score,
    pub investigate_further: Score,
    pub negotiate_terms: Score,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            proceed: dec!(80),
            proceed_with_caution: dec!(65),
            investigate_further: dec!(50),
            negotiate_terms: dec!(35),
        }
    }
}

/// Breakpoints mapping raw financial ratios onto the 0-100 scale. Values
/// between the zero and full breakpoints interpolate linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialBreakpoints {
    /// EBITDA margin scoring 100.
    pub ebitda_margin_full: Rate,
    /// Revenue growth scoring 100.
    pub revenue_growth_full: Rate,
    /// Debt-to-assets at or below which leverage scores 100.
    pub leverage_full: Rate,
    /// Debt-to-assets at or above which leverage scores 0.
    pub leverage_zero: Rate,
    /// Valuation midpoint / asking price scoring 0 and 100 respectively.
    pub value_gap_zero: Rate,
    pub value_gap_full: Rate,
}

impl Default for FinancialBreakpoints {
    fn default() -> Self {
        Self {
            ebitda_margin_full: dec!(0.25),
            revenue_growth_full: dec!(0.20),
            leverage_full: dec!(0.20),
            leverage_zero: dec!(0.80),
            value_gap_zero: dec!(0.80),
            value_gap_full: dec!(1.20),
        }
    }
}

/// Breakpoints for the market dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBreakpoints {
    /// Addressable market size scoring 100.
    pub market_size_full: Money,
    /// Market growth rate scoring 100.
    pub market_growth_full: Rate,
}

impl Default for MarketBreakpoints {
    fn default() -> Self {
        Self {
            market_size_full: dec!(1_000_000_000),
            market_growth_full: dec!(0.15),
        }
    }
}

/// Breakpoints for the team dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBreakpoints {
    /// Average leadership tenure (years) scoring 100.
    pub tenure_full_years: Decimal,
    /// Points credited per prior successful exit, capped at 100.
    pub points_per_exit: Score,
}

impl Default for TeamBreakpoints {
    fn default() -> Self {
        Self {
            tenure_full_years: dec!(10),
            points_per_exit: dec!(50),
        }
    }
}

/// Fixed point deductions applied to the risk sub-score per detected
/// risk factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDeductions {
    /// Customer concentration above this share draws the moderate deduction.
    pub concentration_moderate_above: Rate,
    pub concentration_moderate_points: Score,
    /// Customer concentration above this share draws the severe deduction
    /// instead.
    pub concentration_severe_above: Rate,
    pub concentration_severe_points: Score,
    pub regulatory_exposure_points: Score,
    pub per_litigation_flag_points: Score,
    pub litigation_points_cap: Score,
    pub key_person_dependency_points: Score,
}

impl Default for RiskDeductions {
    fn default() -> Self {
        Self {
            concentration_moderate_above: dec!(0.25),
            concentration_moderate_points: dec!(10),
            concentration_severe_above: dec!(0.50),
            concentration_severe_points: dec!(25),
            regulatory_exposure_points: dec!(15),
            per_litigation_flag_points: dec!(10),
            litigation_points_cap: dec!(30),
            key_person_dependency_points: dec!(10),
        }
    }
}

/// Full configuration for the scoring engine. All weighting constants and
/// thresholds live here so alternate weightings can be tested without
/// touching the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: DimensionWeights,
    pub risk_levels: RiskLevelThresholds,
    pub recommendations: RecommendationThresholds,
    pub financial: FinancialBreakpoints,
    pub market: MarketBreakpoints,
    pub team: TeamBreakpoints,
    pub risk_deductions: RiskDeductions,
}

impl ScoringConfig {
    /// Validate the configuration; the weight-sum invariant is enforced
    /// here, before the engine is constructed.
    pub fn validate(&self) -> DealIntelResult<()> {
        self.weights.validate()?;

        if !(self.risk_levels.low > self.risk_levels.medium
            && self.risk_levels.medium > self.risk_levels.high)
        {
            return Err(DealIntelError::InvalidInput {
                field: "risk_levels".into(),
                reason: "Thresholds must be strictly decreasing: low > medium > high".into(),
            });
        }

        let r = &self.recommendations;
        if !(r.proceed > r.proceed_with_caution
            && r.proceed_with_caution > r.investigate_further
            && r.investigate_further > r.negotiate_terms)
        {
            return Err(DealIntelError::InvalidInput {
                field: "recommendations".into(),
                reason: "Thresholds must be strictly decreasing".into(),
            });
        }

        if self.financial.leverage_zero <= self.financial.leverage_full {
            return Err(DealIntelError::InvalidInput {
                field: "financial.leverage_zero".into(),
                reason: "Leverage zero-score breakpoint must exceed the full-score breakpoint"
                    .into(),
            });
        }

        Ok(())
    }
}
