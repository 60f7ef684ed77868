//! Pipeline intelligence: stage velocity, bottleneck detection, and close
//! forecasting.
//!
//! The analyzer owns no persistent state. Every call rebuilds its aggregates
//! from the supplied deal records, so results can never go stale.

mod bottleneck;
mod forecast;
mod metrics;
mod model;

pub use bottleneck::{Bottleneck, BottleneckReason, Severity};
pub use forecast::{ClosingForecast, DealForecast};
pub use metrics::StageMetrics;
pub use model::{DealRecord, DealStage, DealStatus, PipelineConfig, StageTransition};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DealIntelError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::DealIntelResult;

use metrics::days_between;

/// Point-in-time pipeline analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineAnalysis {
    pub as_of: DateTime<Utc>,
    pub total_active_deals: usize,
    pub total_pipeline_value: Money,
    /// Mean days from first stage entry to close, across won deals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cycle_days: Option<Decimal>,
    pub stage_metrics: Vec<StageMetrics>,
    pub bottlenecks: Vec<Bottleneck>,
    pub forecast: ClosingForecast,
}

/// Analyze a pipeline snapshot.
///
/// `as_of` is the snapshot timestamp; current dwell times are measured
/// against it, which keeps the analysis a pure function of its inputs.
pub fn analyze_pipeline(
    deals: &[DealRecord],
    as_of: DateTime<Utc>,
    horizon_days: u32,
    config: &PipelineConfig,
) -> DealIntelResult<ComputationOutput<PipelineAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    if horizon_days == 0 {
        return Err(DealIntelError::InvalidInput {
            field: "horizon_days".into(),
            reason: "Forecast horizon must be at least one day".into(),
        });
    }
    if deals.is_empty() {
        return Err(DealIntelError::InsufficientData(
            "Pipeline analysis requires at least one deal record".into(),
        ));
    }
    for deal in deals {
        deal.validate()?;
    }

    let active: Vec<&DealRecord> = deals
        .iter()
        .filter(|d| d.status == DealStatus::Active)
        .collect();
    let total_pipeline_value: Money = active.iter().map(|d| d.value).sum();

    let stage_metrics = metrics::stage_metrics(deals, as_of, config);
    let bottlenecks = bottleneck::detect_bottlenecks(&stage_metrics, total_pipeline_value, config);
    let forecast =
        forecast::forecast_closings(deals, &stage_metrics, as_of, horizon_days, &mut warnings);

    let analysis = PipelineAnalysis {
        as_of,
        total_active_deals: active.len(),
        total_pipeline_value,
        average_cycle_days: average_cycle_days(deals),
        stage_metrics,
        bottlenecks,
        forecast,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pipeline Velocity & Bottleneck Analysis",
        &serde_json::json!({
            "as_of": as_of,
            "horizon_days": horizon_days,
            "deal_count": deals.len(),
            "config": config,
        }),
        warnings,
        elapsed,
        analysis,
    ))
}

/// Mean sourcing-to-close duration over won deals.
fn average_cycle_days(deals: &[DealRecord]) -> Option<Decimal> {
    let mut cycles: Vec<Decimal> = Vec::new();
    for deal in deals {
        if deal.status != DealStatus::Won {
            continue;
        }
        if let (Some(first), Some(closed)) = (deal.transitions.first(), deal.closed_at) {
            cycles.push(days_between(first.entered_at, closed));
        }
    }
    if cycles.is_empty() {
        return None;
    }
    let sum: Decimal = cycles.iter().copied().sum();
    Some(sum / Decimal::from(cycles.len() as u64))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
