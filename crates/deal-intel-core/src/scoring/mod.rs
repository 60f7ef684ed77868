//! Weighted multi-dimensional deal scoring.
//!
//! Five dimensions (financial, strategic, risk, market, team) combine into
//! an overall score, a risk level, and a discrete recommendation. Missing
//! optional inputs exclude a dimension and reduce confidence; they never
//! penalize the score itself.

mod config;
mod engine;
mod history;

pub use config::{
    DimensionWeights, FinancialBreakpoints, MarketBreakpoints, RecommendationThresholds,
    RiskDeductions, RiskLevelThresholds, ScoringConfig, TeamBreakpoints,
};
pub use engine::{
    recommend, risk_level_for, DealScore, DealScoringEngine, MarketAttributes, Recommendation,
    RiskFactors, RiskLevel, ScoringRequest, StrategicAttributes, SubScores, TeamAttributes,
};
pub use history::{ScoreHistory, ScoreRecord};
