pub mod annotate;
pub mod error;
pub mod normalizer;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scoring")]
pub mod scoring;

#[cfg(feature = "pipeline")]
pub mod pipeline;

pub use error::DealIntelError;
pub use types::*;

/// Standard result type for all deal-intel operations
pub type DealIntelResult<T> = Result<T, DealIntelError>;
