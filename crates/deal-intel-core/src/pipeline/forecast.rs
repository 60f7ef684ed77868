use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::metrics::{days_between, StageMetrics};
use super::model::{DealRecord, DealStage, DealStatus};

/// Close forecast for one active deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealForecast {
    pub deal_id: String,
    pub stage: DealStage,
    /// Historical stage-to-close conversion rate used as the base
    /// probability.
    pub conversion_rate: Decimal,
    /// Score-derived multiplier in [0.5, 1.5].
    pub score_multiplier: Decimal,
    /// Effective probability of close, in [0, 1].
    pub probability: Decimal,
    pub value: Money,
    pub expected_value: Money,
    /// Projected days until close, from historical mean dwell times.
    pub projected_days_to_close: Decimal,
}

/// Expected closings over a horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingForecast {
    pub horizon_days: u32,
    /// Sum of close probabilities over the in-horizon deals.
    pub expected_closings: Decimal,
    /// Probability-weighted revenue over the in-horizon deals.
    pub expected_revenue: Money,
    pub deals: Vec<DealForecast>,
}

/// Forecast closings over the horizon.
///
/// Per active deal: probability = historical conversion rate of its current
/// stage, scaled by a score multiplier in [0.5, 1.5] and clamped to [0, 1].
/// Conversion rates come from the supplied deal history; with no closed
/// deals there is no basis to extrapolate from, and the forecast stays
/// empty rather than inventing a rate.
pub(crate) fn forecast_closings(
    deals: &[DealRecord],
    metrics: &[StageMetrics],
    as_of: DateTime<Utc>,
    horizon_days: u32,
    warnings: &mut Vec<String>,
) -> ClosingForecast {
    let conversion = ConversionRates::from_history(deals);
    let horizon = Decimal::from(horizon_days);

    let mut forecasts: Vec<DealForecast> = Vec::new();
    let mut expected_closings = Decimal::ZERO;
    let mut expected_revenue = Decimal::ZERO;

    for deal in deals.iter().filter(|d| d.status == DealStatus::Active) {
        let stage = match deal.current_stage() {
            Some(s) => s,
            None => continue,
        };

        let rate = match conversion.for_stage(stage) {
            Some(r) => r,
            None => {
                warnings.push(format!(
                    "Forecast: deal '{}' excluded; no closed deals in history to derive a conversion rate",
                    deal.id
                ));
                continue;
            }
        };

        let multiplier = match deal.overall_score {
            Some(overall) => (dec!(0.5) + overall / dec!(100)).clamp(dec!(0.5), dec!(1.5)),
            None => {
                warnings.push(format!(
                    "Forecast: deal '{}' has no score; using a neutral multiplier",
                    deal.id
                ));
                Decimal::ONE
            }
        };

        let probability = (rate * multiplier).clamp(Decimal::ZERO, Decimal::ONE);
        let projected = projected_days_to_close(deal, stage, metrics, as_of);

        if projected > horizon {
            continue;
        }

        expected_closings += probability;
        expected_revenue += probability * deal.value;
        forecasts.push(DealForecast {
            deal_id: deal.id.clone(),
            stage,
            conversion_rate: rate,
            score_multiplier: multiplier,
            probability,
            value: deal.value,
            expected_value: probability * deal.value,
            projected_days_to_close: projected,
        });
    }

    ClosingForecast {
        horizon_days,
        expected_closings,
        expected_revenue,
        deals: forecasts,
    }
}

/// Remaining time in the current stage (historical mean less time already
/// spent) plus the mean dwell of every later stage.
fn projected_days_to_close(
    deal: &DealRecord,
    stage: DealStage,
    metrics: &[StageMetrics],
    as_of: DateTime<Utc>,
) -> Decimal {
    let mean_for = |s: DealStage| -> Decimal {
        metrics
            .iter()
            .find(|m| m.stage == s)
            .map(|m| m.mean_days)
            .unwrap_or(Decimal::ZERO)
    };

    let spent = deal
        .transitions
        .last()
        .map(|t| days_between(t.entered_at, as_of))
        .unwrap_or(Decimal::ZERO);
    let mut remaining = (mean_for(stage) - spent).max(Decimal::ZERO);

    for later in DealStage::ALL.iter().skip(stage.index() + 1) {
        remaining += mean_for(*later);
    }
    remaining
}

// ---------------------------------------------------------------------------
// Conversion rates
// ---------------------------------------------------------------------------

struct ConversionRates {
    /// Per-stage (won, closed) counts over deals that passed through the
    /// stage.
    per_stage: Vec<(DealStage, u64, u64)>,
    total_won: u64,
    total_closed: u64,
}

impl ConversionRates {
    fn from_history(deals: &[DealRecord]) -> Self {
        let mut per_stage: Vec<(DealStage, u64, u64)> = DealStage::ALL
            .iter()
            .map(|s| (*s, 0_u64, 0_u64))
            .collect();
        let mut total_won = 0_u64;
        let mut total_closed = 0_u64;

        for deal in deals {
            let won = match deal.status {
                DealStatus::Won => true,
                DealStatus::Lost => false,
                DealStatus::Active => continue,
            };
            total_closed += 1;
            if won {
                total_won += 1;
            }
            for (stage, won_count, closed_count) in per_stage.iter_mut() {
                if deal.passed_through(*stage) {
                    *closed_count += 1;
                    if won {
                        *won_count += 1;
                    }
                }
            }
        }

        Self {
            per_stage,
            total_won,
            total_closed,
        }
    }

    /// Stage-to-close conversion rate, falling back to the overall rate for
    /// stages no closed deal passed through. `None` when there is no close
    /// history at all.
    fn for_stage(&self, stage: DealStage) -> Option<Decimal> {
        if self.total_closed == 0 {
            return None;
        }
        let (_, won, closed) = self
            .per_stage
            .iter()
            .find(|(s, _, _)| *s == stage)
            .copied()
            .unwrap_or((stage, 0, 0));
        if closed > 0 {
            Some(Decimal::from(won) / Decimal::from(closed))
        } else {
            Some(Decimal::from(self.total_won) / Decimal::from(self.total_closed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metrics::stage_metrics;
    use crate::pipeline::model::{PipelineConfig, StageTransition};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, 0, 0, 0).unwrap()
    }

    fn deal(
        id: &str,
        status: DealStatus,
        stages: &[(DealStage, u32)],
        closed_day: Option<u32>,
        score: Option<Decimal>,
    ) -> DealRecord {
        DealRecord {
            id: id.into(),
            value: dec!(1_000_000),
            status,
            transitions: stages
                .iter()
                .map(|(stage, day)| StageTransition {
                    stage: *stage,
                    entered_at: ts(*day),
                })
                .collect(),
            closed_at: closed_day.map(ts),
            overall_score: score,
        }
    }

    fn sample_deals() -> Vec<DealRecord> {
        vec![
            // Two closed deals through Negotiation: one won, one lost
            deal(
                "W1",
                DealStatus::Won,
                &[(DealStage::DueDiligence, 1), (DealStage::Negotiation, 5)],
                Some(10),
                Some(dec!(80)),
            ),
            deal(
                "L1",
                DealStatus::Lost,
                &[(DealStage::DueDiligence, 1), (DealStage::Negotiation, 6)],
                Some(12),
                Some(dec!(40)),
            ),
            // Active deal in Negotiation
            deal(
                "A1",
                DealStatus::Active,
                &[(DealStage::Negotiation, 10)],
                None,
                Some(dec!(70)),
            ),
        ]
    }

    #[test]
    fn test_conversion_rates_from_history() {
        let deals = sample_deals();
        let rates = ConversionRates::from_history(&deals);
        // One of two closed deals that passed Negotiation won
        assert_eq!(rates.for_stage(DealStage::Negotiation), Some(dec!(0.5)));
        // No closed deal passed Sourcing: falls back to overall 1/2
        assert_eq!(rates.for_stage(DealStage::Sourcing), Some(dec!(0.5)));
    }

    #[test]
    fn test_forecast_applies_score_multiplier() {
        let deals = sample_deals();
        let metrics = stage_metrics(&deals, ts(14), &PipelineConfig::default());
        let mut warnings = Vec::new();
        let forecast = forecast_closings(&deals, &metrics, ts(14), 90, &mut warnings);

        assert_eq!(forecast.deals.len(), 1);
        let f = &forecast.deals[0];
        assert_eq!(f.deal_id, "A1");
        // multiplier = 0.5 + 70/100 = 1.2
        assert_eq!(f.score_multiplier, dec!(1.2));
        // probability = 0.5 * 1.2 = 0.6
        assert_eq!(f.probability, dec!(0.6));
        assert_eq!(f.expected_value, dec!(600_000));
        assert_eq!(forecast.expected_closings, dec!(0.6));
        assert_eq!(forecast.expected_revenue, dec!(600_000));
    }

    #[test]
    fn test_multiplier_bounds() {
        let mut deals = sample_deals();
        deals[2].overall_score = Some(dec!(100));
        let metrics = stage_metrics(&deals, ts(14), &PipelineConfig::default());
        let mut warnings = Vec::new();
        let forecast = forecast_closings(&deals, &metrics, ts(14), 90, &mut warnings);
        assert_eq!(forecast.deals[0].score_multiplier, dec!(1.5));

        deals[2].overall_score = Some(Decimal::ZERO);
        let forecast = forecast_closings(&deals, &metrics, ts(14), 90, &mut warnings);
        assert_eq!(forecast.deals[0].score_multiplier, dec!(0.5));
    }

    #[test]
    fn test_missing_score_uses_neutral_multiplier() {
        let mut deals = sample_deals();
        deals[2].overall_score = None;
        let metrics = stage_metrics(&deals, ts(14), &PipelineConfig::default());
        let mut warnings = Vec::new();
        let forecast = forecast_closings(&deals, &metrics, ts(14), 90, &mut warnings);

        assert_eq!(forecast.deals[0].score_multiplier, Decimal::ONE);
        assert!(warnings.iter().any(|w| w.contains("neutral multiplier")));
    }

    #[test]
    fn test_no_close_history_yields_empty_forecast() {
        let deals = vec![deal(
            "A1",
            DealStatus::Active,
            &[(DealStage::Sourcing, 1)],
            None,
            Some(dec!(75)),
        )];
        let metrics = stage_metrics(&deals, ts(10), &PipelineConfig::default());
        let mut warnings = Vec::new();
        let forecast = forecast_closings(&deals, &metrics, ts(10), 90, &mut warnings);

        assert!(forecast.deals.is_empty());
        assert_eq!(forecast.expected_closings, Decimal::ZERO);
        assert!(warnings.iter().any(|w| w.contains("conversion rate")));
    }

    #[test]
    fn test_horizon_excludes_distant_deals() {
        let mut deals = sample_deals();
        // A1 entered Negotiation on day 13: one day spent against a mean
        // dwell of four, so close is projected three days out.
        deals[2].transitions[0].entered_at = ts(13);
        let metrics = stage_metrics(&deals, ts(14), &PipelineConfig::default());
        let mut warnings = Vec::new();

        let forecast = forecast_closings(&deals, &metrics, ts(14), 1, &mut warnings);
        assert!(forecast.deals.is_empty());

        let forecast = forecast_closings(&deals, &metrics, ts(14), 30, &mut warnings);
        assert_eq!(forecast.deals.len(), 1);
    }
}
