use thiserror::Error;

#[derive(Debug, Error)]
pub enum DealIntelError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid assumption: {field} — {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Valuation failed: {0}")]
    Valuation(String),

    #[error("Computation cancelled: {0}")]
    Cancelled(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DealIntelError {
    fn from(e: serde_json::Error) -> Self {
        DealIntelError::Serialization(e.to_string())
    }
}
