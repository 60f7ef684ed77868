use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DealIntelError;
use crate::normalizer::{normalize, NormalizedRatioSet};
use crate::types::{
    with_metadata, ComputationOutput, FinancialHistory, Money, Rate, Score,
};
use crate::DealIntelResult;

use super::config::{RecommendationThresholds, RiskLevelThresholds, ScoringConfig};

// ---------------------------------------------------------------------------
// Attribute schemas
// ---------------------------------------------------------------------------
// Closed, versioned schemas: a missing field is a type-checked state, never
// an absent dictionary key.

/// Declared synergy and market-fit attributes, each on a 0-100 scale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategicAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synergy_potential: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_fit: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitive_moat: Option<Score>,
}

/// Detected risk factors. Each factor draws a fixed point deduction from
/// the risk sub-score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskFactors {
    /// Share of revenue attributable to the largest customer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_concentration: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulatory_exposure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub litigation_flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_person_dependency: Option<bool>,
}

impl RiskFactors {
    fn any_present(&self) -> bool {
        self.customer_concentration.is_some()
            || self.regulatory_exposure.is_some()
            || self.litigation_flags.is_some()
            || self.key_person_dependency.is_some()
    }

    fn complete(&self) -> bool {
        self.customer_concentration.is_some()
            && self.regulatory_exposure.is_some()
            && self.litigation_flags.is_some()
            && self.key_person_dependency.is_some()
    }
}

/// Market-size and growth attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addressable_market: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_growth_rate: Option<Rate>,
}

/// Management tenure and track-record attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_leadership_tenure_years: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_exits: Option<u32>,
    /// Qualitative track-record assessment, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_record: Option<Score>,
}

/// Scoring request. The valuation midpoint, when available, feeds a
/// value-gap component of the financial dimension; scoring never feeds back
/// into valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub deal_name: String,
    pub history: FinancialHistory,
    #[serde(default)]
    pub strategic: StrategicAttributes,
    #[serde(default)]
    pub risk: RiskFactors,
    #[serde(default)]
    pub market: MarketAttributes,
    #[serde(default)]
    pub team: TeamAttributes,
    /// Blended valuation point estimate from a prior valuation run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_midpoint: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asking_price: Option<Money>,
}

// ---------------------------------------------------------------------------
// Score types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Proceed,
    ProceedWithCaution,
    InvestigateFurther,
    NegotiateTerms,
    Decline,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Proceed => write!(f, "proceed"),
            Recommendation::ProceedWithCaution => write!(f, "proceed_with_caution"),
            Recommendation::InvestigateFurther => write!(f, "investigate_further"),
            Recommendation::NegotiateTerms => write!(f, "negotiate_terms"),
            Recommendation::Decline => write!(f, "decline"),
        }
    }
}

/// The five dimension sub-scores. `None` means the dimension had no usable
/// inputs and was excluded from the weighted overall.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategic: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Score>,
}

/// A scored deal. Immutable; recomputation produces a new score that is
/// appended to the deal's history rather than overwriting this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealScore {
    pub deal_name: String,
    pub sub_scores: SubScores,
    /// Weighted overall in [0, 100]; weights are renormalized over the
    /// available sub-scores.
    pub overall: Score,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    /// Fraction of the five dimensions with complete input data, in [0, 1].
    pub confidence: Decimal,
}

// ---------------------------------------------------------------------------
// Pure mappings
// ---------------------------------------------------------------------------

/// Map a risk sub-score onto a discrete risk level.
pub fn risk_level_for(score: Score, thresholds: &RiskLevelThresholds) -> RiskLevel {
    if score >= thresholds.low {
        RiskLevel::Low
    } else if score >= thresholds.medium {
        RiskLevel::Medium
    } else if score >= thresholds.high {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Recommendation policy: a pure function of (overall score, risk level).
pub fn recommend(
    overall: Score,
    risk: RiskLevel,
    thresholds: &RecommendationThresholds,
) -> Recommendation {
    if overall >= thresholds.proceed && risk == RiskLevel::Low {
        Recommendation::Proceed
    } else if overall >= thresholds.proceed_with_caution && risk != RiskLevel::Critical {
        Recommendation::ProceedWithCaution
    } else if overall >= thresholds.investigate_further {
        Recommendation::InvestigateFurther
    } else if overall >= thresholds.negotiate_terms {
        Recommendation::NegotiateTerms
    } else {
        Recommendation::Decline
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless per-call scoring engine. All weighting constants come from the
/// injected configuration.
#[derive(Debug, Clone)]
pub struct DealScoringEngine {
    config: ScoringConfig,
}

impl DealScoringEngine {
    pub fn new(config: ScoringConfig) -> DealIntelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a deal across the five dimensions.
    ///
    /// Missing optional inputs exclude the affected dimension and reduce
    /// confidence; they never pull the overall score down. Fails only when
    /// no dimension has any usable input.
    pub fn score_deal(
        &self,
        request: &ScoringRequest,
    ) -> DealIntelResult<ComputationOutput<DealScore>> {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();

        // Financial dimension works off the normalized ratio set.
        let ratios = match normalize(&request.history) {
            Ok(output) => Some(output.result),
            Err(DealIntelError::InsufficientData(reason)) => {
                warnings.push(format!("Financial dimension degraded: {reason}"));
                None
            }
            Err(e) => return Err(e),
        };

        let (financial, financial_complete) =
            self.financial_score(ratios.as_ref(), request, &mut warnings);
        let (strategic, strategic_complete) = self.strategic_score(&request.strategic, &mut warnings);
        let (risk, risk_complete) = self.risk_score(&request.risk, &mut warnings);
        let (market, market_complete) = self.market_score(&request.market, &mut warnings);
        let (team, team_complete) = self.team_score(&request.team, &mut warnings);

        let sub_scores = SubScores {
            financial,
            strategic,
            risk,
            market,
            team,
        };

        let overall = self.weighted_overall(&sub_scores)?;

        // A missing risk dimension is treated as neutral for the level
        // mapping; the reduced confidence signals the gap.
        let risk_basis = risk.unwrap_or_else(|| {
            warnings.push(
                "Risk level derived from a neutral baseline: no risk factors declared".into(),
            );
            dec!(50)
        });
        let risk_level = risk_level_for(risk_basis, &self.config.risk_levels);
        let recommendation = recommend(overall, risk_level, &self.config.recommendations);

        let complete_count = [
            financial_complete,
            strategic_complete,
            risk_complete,
            market_complete,
            team_complete,
        ]
        .iter()
        .filter(|c| **c)
        .count();
        let confidence = Decimal::from(complete_count as u32) / dec!(5);

        let score = DealScore {
            deal_name: request.deal_name.clone(),
            sub_scores,
            overall,
            risk_level,
            recommendation,
            confidence,
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Weighted Multi-Dimensional Deal Score",
            &serde_json::json!({
                "deal": request.deal_name,
                "weights": self.config.weights,
                "periods": request.history.len(),
            }),
            warnings,
            elapsed,
            score,
        ))
    }

    // -----------------------------------------------------------------------
    // Dimension scoring
    // -----------------------------------------------------------------------

    fn financial_score(
        &self,
        ratios: Option<&NormalizedRatioSet>,
        request: &ScoringRequest,
        warnings: &mut Vec<String>,
    ) -> (Option<Score>, bool) {
        let bp = &self.config.financial;
        let mut components: Vec<Score> = Vec::new();
        let mut core_missing = false;

        match ratios {
            Some(set) => {
                let core = [
                    (
                        set.ebitda_margin,
                        Decimal::ZERO,
                        bp.ebitda_margin_full,
                        "ebitda_margin",
                    ),
                    (
                        set.revenue_growth,
                        Decimal::ZERO,
                        bp.revenue_growth_full,
                        "revenue_growth",
                    ),
                    (
                        set.debt_to_assets,
                        bp.leverage_zero,
                        bp.leverage_full,
                        "debt_to_assets",
                    ),
                ];
                for (value, zero_at, full_at, name) in core {
                    match value {
                        Some(v) => components.push(linear_score(v, zero_at, full_at)),
                        None => {
                            warnings.push(format!(
                                "Financial dimension degraded: {name} is undefined"
                            ));
                            core_missing = true;
                        }
                    }
                }
            }
            None => core_missing = true,
        }

        // Optional value-gap component: how the valuation midpoint compares
        // to the asking price. Does not affect completeness.
        if let (Some(midpoint), Some(ask)) = (request.valuation_midpoint, request.asking_price) {
            if ask > Decimal::ZERO {
                components.push(linear_score(
                    midpoint / ask,
                    self.config.financial.value_gap_zero,
                    self.config.financial.value_gap_full,
                ));
            }
        }

        if components.is_empty() {
            return (None, false);
        }
        let sum: Decimal = components.iter().copied().sum();
        (
            Some(sum / Decimal::from(components.len() as u32)),
            !core_missing,
        )
    }

    fn strategic_score(
        &self,
        attrs: &StrategicAttributes,
        warnings: &mut Vec<String>,
    ) -> (Option<Score>, bool) {
        let fields = [
            attrs.synergy_potential,
            attrs.market_fit,
            attrs.competitive_moat,
        ];
        let available: Vec<Score> = fields
            .into_iter()
            .flatten()
            .map(|s| s.clamp(Decimal::ZERO, dec!(100)))
            .collect();

        if available.is_empty() {
            warnings.push("Strategic dimension excluded: no attributes declared".into());
            return (None, false);
        }
        let complete = available.len() == fields.len();
        if !complete {
            warnings.push("Strategic dimension degraded: some attributes missing".into());
        }
        let sum: Decimal = available.iter().copied().sum();
        (Some(sum / Decimal::from(available.len() as u32)), complete)
    }

    fn risk_score(&self, factors: &RiskFactors, warnings: &mut Vec<String>) -> (Option<Score>, bool) {
        if !factors.any_present() {
            warnings.push("Risk dimension excluded: no risk factors declared".into());
            return (None, false);
        }

        let d = &self.config.risk_deductions;
        let mut score = dec!(100);

        if let Some(share) = factors.customer_concentration {
            if share > d.concentration_severe_above {
                score -= d.concentration_severe_points;
            } else if share > d.concentration_moderate_above {
                score -= d.concentration_moderate_points;
            }
        }
        if factors.regulatory_exposure == Some(true) {
            score -= d.regulatory_exposure_points;
        }
        if let Some(flags) = factors.litigation_flags {
            let deduction =
                (d.per_litigation_flag_points * Decimal::from(flags)).min(d.litigation_points_cap);
            score -= deduction;
        }
        if factors.key_person_dependency == Some(true) {
            score -= d.key_person_dependency_points;
        }

        let complete = factors.complete();
        if !complete {
            warnings.push("Risk dimension degraded: some factors undeclared".into());
        }
        (Some(score.max(Decimal::ZERO)), complete)
    }

    fn market_score(
        &self,
        attrs: &MarketAttributes,
        warnings: &mut Vec<String>,
    ) -> (Option<Score>, bool) {
        let bp = &self.config.market;
        let mut components: Vec<Score> = Vec::new();

        if let Some(size) = attrs.addressable_market {
            components.push(linear_score(size, Decimal::ZERO, bp.market_size_full));
        }
        if let Some(growth) = attrs.market_growth_rate {
            components.push(linear_score(growth, Decimal::ZERO, bp.market_growth_full));
        }

        if components.is_empty() {
            warnings.push("Market dimension excluded: no attributes declared".into());
            return (None, false);
        }
        let complete = components.len() == 2;
        if !complete {
            warnings.push("Market dimension degraded: some attributes missing".into());
        }
        let sum: Decimal = components.iter().copied().sum();
        (Some(sum / Decimal::from(components.len() as u32)), complete)
    }

    fn team_score(&self, attrs: &TeamAttributes, warnings: &mut Vec<String>) -> (Option<Score>, bool) {
        let bp = &self.config.team;
        let mut components: Vec<Score> = Vec::new();

        if let Some(tenure) = attrs.avg_leadership_tenure_years {
            components.push(linear_score(tenure, Decimal::ZERO, bp.tenure_full_years));
        }
        if let Some(exits) = attrs.prior_exits {
            components.push((bp.points_per_exit * Decimal::from(exits)).min(dec!(100)));
        }
        if let Some(record) = attrs.track_record {
            components.push(record.clamp(Decimal::ZERO, dec!(100)));
        }

        if components.is_empty() {
            warnings.push("Team dimension excluded: no attributes declared".into());
            return (None, false);
        }
        let complete = components.len() == 3;
        if !complete {
            warnings.push("Team dimension degraded: some attributes missing".into());
        }
        let sum: Decimal = components.iter().copied().sum();
        (Some(sum / Decimal::from(components.len() as u32)), complete)
    }

    /// Weighted overall over the available sub-scores, with weights
    /// renormalized to sum to 1.0 over the available subset.
    fn weighted_overall(&self, sub_scores: &SubScores) -> DealIntelResult<Score> {
        let w = &self.config.weights;
        let pairs = [
            (sub_scores.financial, w.financial),
            (sub_scores.strategic, w.strategic),
            (sub_scores.risk, w.risk),
            (sub_scores.market, w.market),
            (sub_scores.team, w.team),
        ];

        let mut weighted_sum = Decimal::ZERO;
        let mut weight_total = Decimal::ZERO;
        for (score, weight) in pairs {
            if let Some(s) = score {
                weighted_sum += s * weight;
                weight_total += weight;
            }
        }

        if weight_total == Decimal::ZERO {
            return Err(DealIntelError::InsufficientData(
                "No scoring dimension had usable inputs; refusing to fabricate a score".into(),
            ));
        }
        Ok((weighted_sum / weight_total).clamp(Decimal::ZERO, dec!(100)))
    }
}

/// Linear interpolation onto the 0-100 scale. Supports inverted breakpoints
/// (zero_at above full_at) for ratios where lower is better.
fn linear_score(value: Decimal, zero_at: Decimal, full_at: Decimal) -> Score {
    let span = full_at - zero_at;
    if span == Decimal::ZERO {
        return if value >= full_at { dec!(100) } else { Decimal::ZERO };
    }
    ((value - zero_at) / span * dec!(100)).clamp(Decimal::ZERO, dec!(100))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinancialStatement, FiscalPeriod, PeriodFinancials};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn history() -> FinancialHistory {
        let mk = |label: &str, year: i32, scale: Decimal| FinancialStatement {
            period: FiscalPeriod {
                label: label.into(),
                end_date: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
            },
            items: PeriodFinancials {
                revenue: Some(dec!(1000) * scale),
                ebitda: Some(dec!(250) * scale),
                total_assets: Some(dec!(2000) * scale),
                total_liabilities: Some(dec!(400) * scale),
                ..Default::default()
            },
        };
        FinancialHistory::from_statements(vec![
            mk("FY2023", 2023, dec!(1)),
            mk("FY2024", 2024, dec!(1.20)),
        ])
        .unwrap()
    }

    fn full_request() -> ScoringRequest {
        ScoringRequest {
            deal_name: "ProjectAlpha".into(),
            history: history(),
            strategic: StrategicAttributes {
                synergy_potential: Some(dec!(80)),
                market_fit: Some(dec!(70)),
                competitive_moat: Some(dec!(90)),
            },
            risk: RiskFactors {
                customer_concentration: Some(dec!(0.10)),
                regulatory_exposure: Some(false),
                litigation_flags: Some(0),
                key_person_dependency: Some(false),
            },
            market: MarketAttributes {
                addressable_market: Some(dec!(500_000_000)),
                market_growth_rate: Some(dec!(0.12)),
            },
            team: TeamAttributes {
                avg_leadership_tenure_years: Some(dec!(8)),
                prior_exits: Some(1),
                track_record: Some(dec!(75)),
            },
            valuation_midpoint: None,
            asking_price: None,
        }
    }

    #[test]
    fn test_full_request_scores_all_dimensions() {
        let engine = DealScoringEngine::with_defaults();
        let output = engine.score_deal(&full_request()).unwrap();
        let score = &output.result;

        assert!(score.sub_scores.financial.is_some());
        assert!(score.sub_scores.strategic.is_some());
        assert!(score.sub_scores.risk.is_some());
        assert!(score.sub_scores.market.is_some());
        assert!(score.sub_scores.team.is_some());
        assert!(score.overall >= Decimal::ZERO && score.overall <= dec!(100));
        assert_eq!(score.confidence, Decimal::ONE);
    }

    #[test]
    fn test_financial_breakpoints() {
        // EBITDA margin 25%, growth 20%, leverage 20%: all components at 100.
        let engine = DealScoringEngine::with_defaults();
        let output = engine.score_deal(&full_request()).unwrap();
        // margin 250/1000 = 25% -> 100; growth 20% -> 100;
        // debt_to_assets 0.2 -> 100
        assert_eq!(output.result.sub_scores.financial, Some(dec!(100)));
    }

    #[test]
    fn test_clean_risk_profile_scores_100() {
        let engine = DealScoringEngine::with_defaults();
        let output = engine.score_deal(&full_request()).unwrap();
        assert_eq!(output.result.sub_scores.risk, Some(dec!(100)));
        assert_eq!(output.result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_deductions_stack_with_floor() {
        let engine = DealScoringEngine::with_defaults();
        let mut request = full_request();
        request.risk = RiskFactors {
            customer_concentration: Some(dec!(0.60)), // severe: -25
            regulatory_exposure: Some(true),          // -15
            litigation_flags: Some(5),                // capped at -30
            key_person_dependency: Some(true),        // -10
        };
        let output = engine.score_deal(&request).unwrap();
        // 100 - 25 - 15 - 30 - 10 = 20
        assert_eq!(output.result.sub_scores.risk, Some(dec!(20)));
        assert_eq!(output.result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_risk_floor_at_zero() {
        let mut config = ScoringConfig::default();
        config.risk_deductions.regulatory_exposure_points = dec!(90);
        config.risk_deductions.concentration_severe_points = dec!(90);
        let engine = DealScoringEngine::new(config).unwrap();

        let mut request = full_request();
        request.risk.customer_concentration = Some(dec!(0.90));
        request.risk.regulatory_exposure = Some(true);
        let output = engine.score_deal(&request).unwrap();
        assert_eq!(output.result.sub_scores.risk, Some(Decimal::ZERO));
    }

    #[test]
    fn test_missing_dimension_renormalizes_weights() {
        let engine = DealScoringEngine::with_defaults();
        let mut request = full_request();
        request.team = TeamAttributes::default();
        request.market = MarketAttributes::default();

        let output = engine.score_deal(&request).unwrap();
        let score = &output.result;

        assert!(score.sub_scores.team.is_none());
        assert!(score.sub_scores.market.is_none());
        // financial 100 * 0.30, strategic 80 * 0.25, risk 100 * 0.20,
        // renormalized over 0.75
        let expected = (dec!(100) * dec!(0.30) + dec!(80) * dec!(0.25) + dec!(100) * dec!(0.20))
            / dec!(0.75);
        assert_eq!(score.overall, expected);
        // 3 of 5 dimensions complete
        assert_eq!(score.confidence, dec!(0.6));
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("Team dimension excluded")));
    }

    #[test]
    fn test_no_inputs_at_all_is_insufficient_data() {
        let engine = DealScoringEngine::with_defaults();
        let request = ScoringRequest {
            deal_name: "Ghost".into(),
            history: FinancialHistory::new(),
            strategic: StrategicAttributes::default(),
            risk: RiskFactors::default(),
            market: MarketAttributes::default(),
            team: TeamAttributes::default(),
            valuation_midpoint: None,
            asking_price: None,
        };
        let result = engine.score_deal(&request);
        assert!(matches!(result, Err(DealIntelError::InsufficientData(_))));
    }

    #[test]
    fn test_recommendation_boundaries() {
        let t = RecommendationThresholds::default();

        assert_eq!(recommend(dec!(80), RiskLevel::Low, &t), Recommendation::Proceed);
        assert_eq!(
            recommend(dec!(79.9), RiskLevel::Low, &t),
            Recommendation::ProceedWithCaution
        );
        assert_eq!(
            recommend(dec!(80), RiskLevel::Medium, &t),
            Recommendation::ProceedWithCaution
        );
        assert_eq!(
            recommend(dec!(65), RiskLevel::High, &t),
            Recommendation::ProceedWithCaution
        );
        assert_eq!(
            recommend(dec!(65), RiskLevel::Critical, &t),
            Recommendation::InvestigateFurther
        );
        assert_eq!(
            recommend(dec!(64.9), RiskLevel::Low, &t),
            Recommendation::InvestigateFurther
        );
        assert_eq!(
            recommend(dec!(50), RiskLevel::Critical, &t),
            Recommendation::InvestigateFurther
        );
        assert_eq!(
            recommend(dec!(49.9), RiskLevel::Low, &t),
            Recommendation::NegotiateTerms
        );
        assert_eq!(
            recommend(dec!(35), RiskLevel::Critical, &t),
            Recommendation::NegotiateTerms
        );
        assert_eq!(
            recommend(dec!(34.9), RiskLevel::Low, &t),
            Recommendation::Decline
        );
    }

    #[test]
    fn test_risk_level_boundaries() {
        let t = RiskLevelThresholds::default();
        assert_eq!(risk_level_for(dec!(75), &t), RiskLevel::Low);
        assert_eq!(risk_level_for(dec!(74.9), &t), RiskLevel::Medium);
        assert_eq!(risk_level_for(dec!(50), &t), RiskLevel::Medium);
        assert_eq!(risk_level_for(dec!(49.9), &t), RiskLevel::High);
        assert_eq!(risk_level_for(dec!(25), &t), RiskLevel::High);
        assert_eq!(risk_level_for(dec!(24.9), &t), RiskLevel::Critical);
    }

    #[test]
    fn test_value_gap_component() {
        let engine = DealScoringEngine::with_defaults();
        let mut request = full_request();
        // Valuation well above asking: full marks on the gap component.
        request.valuation_midpoint = Some(dec!(12_000_000));
        request.asking_price = Some(dec!(10_000_000));
        let with_gap = engine.score_deal(&request).unwrap();

        request.valuation_midpoint = Some(dec!(8_000_000));
        let below_ask = engine.score_deal(&request).unwrap();

        assert!(
            with_gap.result.sub_scores.financial.unwrap()
                > below_ask.result.sub_scores.financial.unwrap()
        );
    }

    #[test]
    fn test_stateless_recompute_is_identical() {
        let engine = DealScoringEngine::with_defaults();
        let request = full_request();
        let a = engine.score_deal(&request).unwrap();
        let b = engine.score_deal(&request).unwrap();
        assert_eq!(a.result.overall, b.result.overall);
        assert_eq!(a.result.recommendation, b.result.recommendation);
    }
}
