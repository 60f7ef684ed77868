use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::types::{Money, Score};
use crate::DealIntelResult;

/// Pipeline stages in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DealStage {
    Sourcing,
    Screening,
    DueDiligence,
    Negotiation,
    Closing,
}

impl DealStage {
    pub const ALL: [DealStage; 5] = [
        DealStage::Sourcing,
        DealStage::Screening,
        DealStage::DueDiligence,
        DealStage::Negotiation,
        DealStage::Closing,
    ];

    /// Position in the lifecycle, 0-based.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealStage::Sourcing => write!(f, "Sourcing"),
            DealStage::Screening => write!(f, "Screening"),
            DealStage::DueDiligence => write!(f, "Due Diligence"),
            DealStage::Negotiation => write!(f, "Negotiation"),
            DealStage::Closing => write!(f, "Closing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    Active,
    Won,
    Lost,
}

/// Entry into a pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: DealStage,
    pub entered_at: DateTime<Utc>,
}

/// A deal as seen by the pipeline analyzer. The analyzer consumes these
/// records; it does not own or mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: String,
    pub value: Money,
    pub status: DealStatus,
    /// Stage entries in chronological order; at least one is required.
    pub transitions: Vec<StageTransition>,
    /// Timestamp the deal closed (required for Won/Lost deals).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Latest overall deal score, when one has been computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<Score>,
}

impl DealRecord {
    pub fn current_stage(&self) -> Option<DealStage> {
        self.transitions.last().map(|t| t.stage)
    }

    pub(crate) fn validate(&self) -> DealIntelResult<()> {
        if self.transitions.is_empty() {
            return Err(DealIntelError::InvalidInput {
                field: "transitions".into(),
                reason: format!("Deal '{}' has no stage transitions", self.id),
            });
        }
        for pair in self.transitions.windows(2) {
            if pair[1].entered_at < pair[0].entered_at {
                return Err(DealIntelError::InvalidInput {
                    field: "transitions".into(),
                    reason: format!("Deal '{}' has non-chronological transitions", self.id),
                });
            }
        }
        if self.status != DealStatus::Active && self.closed_at.is_none() {
            return Err(DealIntelError::InvalidInput {
                field: "closed_at".into(),
                reason: format!("Closed deal '{}' is missing its close timestamp", self.id),
            });
        }
        Ok(())
    }

    /// Whether this deal ever occupied the given stage.
    pub(crate) fn passed_through(&self, stage: DealStage) -> bool {
        self.transitions.iter().any(|t| t.stage == stage)
    }
}

/// Thresholds governing bottleneck detection and severity tiers. All values
/// are injectable; the defaults are the documented policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// A stage is a bottleneck when its median dwell exceeds this multiple
    /// of the cross-stage median.
    pub bottleneck_multiplier: Decimal,
    /// Days after which an active deal counts as stalled in its stage.
    pub stall_threshold_days: Decimal,
    /// A stage is a bottleneck when more than this fraction of its active
    /// deals are stalled.
    pub stall_fraction: Decimal,
    /// Revenue-at-risk as a share of total pipeline value at or above which
    /// a bottleneck is high severity.
    pub severity_high_share: Decimal,
    /// Share at or above which severity is medium; below is low.
    pub severity_medium_share: Decimal,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bottleneck_multiplier: dec!(1.5),
            stall_threshold_days: dec!(30),
            stall_fraction: dec!(0.20),
            severity_high_share: dec!(0.25),
            severity_medium_share: dec!(0.10),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> DealIntelResult<()> {
        if self.bottleneck_multiplier <= Decimal::ZERO {
            return Err(DealIntelError::InvalidInput {
                field: "bottleneck_multiplier".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.stall_threshold_days <= Decimal::ZERO {
            return Err(DealIntelError::InvalidInput {
                field: "stall_threshold_days".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.stall_fraction < Decimal::ZERO || self.stall_fraction > Decimal::ONE {
            return Err(DealIntelError::InvalidInput {
                field: "stall_fraction".into(),
                reason: "Must be within [0, 1]".into(),
            });
        }
        if self.severity_high_share < self.severity_medium_share {
            return Err(DealIntelError::InvalidInput {
                field: "severity_high_share".into(),
                reason: "High-severity share must not be below the medium share".into(),
            });
        }
        Ok(())
    }
}
