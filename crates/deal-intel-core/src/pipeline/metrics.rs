use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::model::{DealRecord, DealStage, DealStatus, PipelineConfig};

const SECONDS_PER_DAY: Decimal = dec!(86400);

/// Dwell-time distribution for one pipeline stage, aggregated over every
/// current and historical occupancy of that stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: DealStage,
    /// Number of dwell observations (current and completed occupancies).
    pub observations: usize,
    /// Active deals currently sitting in this stage.
    pub active_count: usize,
    /// Active deals in this stage whose current dwell exceeds the stall
    /// threshold.
    pub stalled_count: usize,
    /// Combined value of the stalled deals.
    pub stalled_value: Money,
    pub median_days: Decimal,
    pub mean_days: Decimal,
    pub max_days: Decimal,
}

/// Dwell observations and occupancy counts for every stage seen in the
/// supplied deals.
pub(crate) fn stage_metrics(
    deals: &[DealRecord],
    as_of: DateTime<Utc>,
    config: &PipelineConfig,
) -> Vec<StageMetrics> {
    let mut metrics = Vec::new();

    for stage in DealStage::ALL {
        let mut dwells: Vec<Decimal> = Vec::new();
        let mut active_count = 0_usize;
        let mut stalled_count = 0_usize;
        let mut stalled_value = Decimal::ZERO;

        for deal in deals {
            for (idx, transition) in deal.transitions.iter().enumerate() {
                if transition.stage != stage {
                    continue;
                }
                let is_current = idx == deal.transitions.len() - 1;
                let end = if is_current {
                    match deal.status {
                        DealStatus::Active => as_of,
                        _ => deal.closed_at.unwrap_or(as_of),
                    }
                } else {
                    deal.transitions[idx + 1].entered_at
                };
                let dwell = days_between(transition.entered_at, end);
                dwells.push(dwell);

                if is_current && deal.status == DealStatus::Active {
                    active_count += 1;
                    if dwell > config.stall_threshold_days {
                        stalled_count += 1;
                        stalled_value += deal.value;
                    }
                }
            }
        }

        if dwells.is_empty() {
            continue;
        }
        dwells.sort();

        metrics.push(StageMetrics {
            stage,
            observations: dwells.len(),
            active_count,
            stalled_count,
            stalled_value,
            median_days: median_sorted(&dwells),
            mean_days: dwells.iter().copied().sum::<Decimal>()
                / Decimal::from(dwells.len() as u64),
            max_days: dwells[dwells.len() - 1],
        });
    }

    metrics
}

/// Elapsed days as a decimal. Clock skew between the snapshot timestamp and
/// a stage entry clamps to zero rather than going negative.
pub(crate) fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let seconds = (end - start).num_seconds().max(0);
    Decimal::from(seconds) / SECONDS_PER_DAY
}

/// Median of a **sorted** slice.
pub(crate) fn median_sorted(sorted: &[Decimal]) -> Decimal {
    let n = sorted.len();
    if n == 0 {
        return Decimal::ZERO;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / dec!(2)
    } else {
        sorted[n / 2]
    }
}
