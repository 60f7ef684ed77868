use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::metrics::{median_sorted, StageMetrics};
use super::model::{DealStage, PipelineConfig};

/// Why a stage was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BottleneckReason {
    /// Median dwell exceeds the configured multiple of the cross-stage
    /// median.
    MedianDwell,
    /// Too large a fraction of the stage's active deals are stalled.
    StalledDeals,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A flagged pipeline stage with its estimated revenue exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub stage: DealStage,
    pub reason: BottleneckReason,
    pub median_days: Decimal,
    pub cross_stage_median_days: Decimal,
    pub stalled_count: usize,
    /// Stalled deals as a fraction of the stage's active deals.
    pub stalled_fraction: Decimal,
    /// Combined value of stalled deals in this stage.
    pub revenue_at_risk: Money,
    pub severity: Severity,
}

/// Flag bottleneck stages.
///
/// A stage is flagged when its median dwell exceeds the configured multiple
/// of the cross-stage median, or when the stalled share of its active deals
/// exceeds the configured fraction. Severity is tiered by revenue-at-risk
/// relative to total active pipeline value.
pub(crate) fn detect_bottlenecks(
    metrics: &[StageMetrics],
    total_pipeline_value: Money,
    config: &PipelineConfig,
) -> Vec<Bottleneck> {
    if metrics.is_empty() {
        return Vec::new();
    }

    let mut medians: Vec<Decimal> = metrics.iter().map(|m| m.median_days).collect();
    medians.sort();
    let cross_median = median_sorted(&medians);

    let mut bottlenecks = Vec::new();
    for m in metrics {
        let dwell_flag =
            cross_median > Decimal::ZERO && m.median_days > config.bottleneck_multiplier * cross_median;

        let stalled_fraction = if m.active_count > 0 {
            Decimal::from(m.stalled_count as u64) / Decimal::from(m.active_count as u64)
        } else {
            Decimal::ZERO
        };
        let stall_flag = m.active_count > 0 && stalled_fraction > config.stall_fraction;

        let reason = match (dwell_flag, stall_flag) {
            (true, true) => BottleneckReason::Both,
            (true, false) => BottleneckReason::MedianDwell,
            (false, true) => BottleneckReason::StalledDeals,
            (false, false) => continue,
        };

        bottlenecks.push(Bottleneck {
            stage: m.stage,
            reason,
            median_days: m.median_days,
            cross_stage_median_days: cross_median,
            stalled_count: m.stalled_count,
            stalled_fraction,
            revenue_at_risk: m.stalled_value,
            severity: severity_for(m.stalled_value, total_pipeline_value, config),
        });
    }

    bottlenecks
}

fn severity_for(revenue_at_risk: Money, total_value: Money, config: &PipelineConfig) -> Severity {
    if total_value <= Decimal::ZERO {
        return Severity::Low;
    }
    let share = revenue_at_risk / total_value;
    if share >= config.severity_high_share {
        Severity::High
    } else if share >= config.severity_medium_share {
        Severity::Medium
    } else {
        Severity::Low
    }
}
