use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::DealIntelResult;

use super::engine::DealScore;

/// One historical scoring of a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub recorded_at: DateTime<Utc>,
    pub score: DealScore,
}

/// Append-only, time-ordered score history for a single deal. Prior scores
/// are retained for trend analysis and are never overwritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreHistory {
    records: Vec<ScoreRecord>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new score. Timestamps must be non-decreasing.
    pub fn record(&mut self, recorded_at: DateTime<Utc>, score: DealScore) -> DealIntelResult<()> {
        if let Some(last) = self.records.last() {
            if recorded_at < last.recorded_at {
                return Err(DealIntelError::InvalidInput {
                    field: "recorded_at".into(),
                    reason: format!(
                        "Score at {recorded_at} predates the latest recorded score at {}",
                        last.recorded_at
                    ),
                });
            }
        }
        self.records.push(ScoreRecord { recorded_at, score });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&ScoreRecord> {
        self.records.last()
    }

    /// Chronological iteration, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.iter()
    }

    /// Overall-score delta between the earliest record at or after `since`
    /// and the latest record. Positive means the deal has improved.
    pub fn trend_since(&self, since: DateTime<Utc>) -> Option<Decimal> {
        let baseline = self.records.iter().find(|r| r.recorded_at >= since)?;
        let latest = self.records.last()?;
        Some(latest.score.overall - baseline.score.overall)
    }
}
