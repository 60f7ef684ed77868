//! Financial statement normalization.
//!
//! Derives a standardized ratio set from recorded financial statements.
//! Stateless: the ratio set is always recomputed from its inputs and is
//! never persisted as ground truth.

mod ratios;

pub use ratios::{
    derived_revenue_growth, normalize, NormalizedRatioSet, RATIO_COUNT,
};
