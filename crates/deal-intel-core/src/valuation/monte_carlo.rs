use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Normal, Triangular, Uniform};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::DealIntelError;
use crate::DealIntelResult;

/// Default number of simulation trials.
pub const DEFAULT_TRIALS: u32 = 1_000;

/// Minimum accepted number of trials.
pub const MIN_TRIALS: u32 = 100;

/// Trials per batch. Each batch owns an RNG seeded from (base seed, batch
/// index), so percentile results are bit-identical at any parallelism level.
const BATCH_SIZE: u32 = 128;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation handle for an in-flight simulation. Checked at
/// batch boundaries; a cancelled run discards all partial results.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

/// Probability distribution for a perturbed valuation assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssumptionDistribution {
    /// Normal, truncated to mean +/- 3 standard deviations to keep samples
    /// within a plausible range.
    Normal { mean: f64, std_dev: f64 },
    Uniform { min: f64, max: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
}

impl AssumptionDistribution {
    /// Default perturbation for a rate assumption: Normal around the point
    /// estimate with a standard deviation of 20% of its magnitude.
    pub fn around(mean: f64) -> Self {
        let std_dev = (mean.abs() * 0.20).max(0.002);
        AssumptionDistribution::Normal { mean, std_dev }
    }

    fn sample(&self, rng: &mut StdRng) -> DealIntelResult<f64> {
        match self {
            AssumptionDistribution::Normal { mean, std_dev } => {
                let n =
                    Normal::new(*mean, *std_dev).map_err(|e| DealIntelError::InvalidAssumption {
                        field: "distribution".into(),
                        reason: format!("Invalid Normal parameters: {e}"),
                    })?;
                let raw: f64 = rng.sample(n);
                Ok(raw.clamp(mean - 3.0 * std_dev, mean + 3.0 * std_dev))
            }
            AssumptionDistribution::Uniform { min, max } => {
                let u = Uniform::new(*min, *max).map_err(|e| DealIntelError::InvalidAssumption {
                    field: "distribution".into(),
                    reason: format!("Invalid Uniform parameters: {e}"),
                })?;
                Ok(rng.sample(u))
            }
            AssumptionDistribution::Triangular { min, mode, max } => {
                let t = Triangular::new(*min, *max, *mode).map_err(|e| {
                    DealIntelError::InvalidAssumption {
                        field: "distribution".into(),
                        reason: format!("Invalid Triangular parameters: {e}"),
                    }
                })?;
                Ok(rng.sample(t))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation input / output
// ---------------------------------------------------------------------------

/// Parameters for the stochastic DCF overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfTrialParams {
    /// Base-year free cash flow.
    pub base_fcf: f64,
    /// Explicit projection horizon in years.
    pub horizon_years: u32,
    /// Distribution for the annual cash flow growth rate.
    pub growth: AssumptionDistribution,
    /// Distribution for the discount rate.
    pub discount: AssumptionDistribution,
    /// Perpetuity growth rate for the terminal value (held fixed per run).
    pub terminal_growth: f64,
    /// Number of trials.
    pub trials: u32,
    /// Base seed; trial batches derive their own seeds from it.
    pub seed: u64,
}

/// Percentile summary of the simulated enterprise values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub p10: f64,
    pub median: f64,
    pub p90: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Trials that produced a usable valuation.
    pub trials_run: u32,
    /// Trials skipped as financially impossible (terminal growth >= sampled
    /// discount rate, or non-positive sampled discount rate).
    pub trials_skipped: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the batched DCF simulation.
///
/// Trials are partitioned into fixed-size batches executed in parallel.
/// Batch seeds depend only on the base seed and the batch index, and batch
/// outputs are concatenated in index order before sorting, so the percentile
/// triplet is identical for any thread count given the same seed.
pub fn simulate_dcf(
    params: &DcfTrialParams,
    cancel: Option<&CancelToken>,
) -> DealIntelResult<SimulationSummary> {
    if params.trials < MIN_TRIALS {
        return Err(DealIntelError::InvalidAssumption {
            field: "trials".into(),
            reason: format!("Must be at least {MIN_TRIALS}"),
        });
    }
    if params.horizon_years < 1 {
        return Err(DealIntelError::InvalidAssumption {
            field: "horizon_years".into(),
            reason: "Must be at least 1".into(),
        });
    }

    let num_batches = params.trials.div_ceil(BATCH_SIZE);

    let batches: Vec<Vec<Option<f64>>> = (0..num_batches)
        .into_par_iter()
        .map(|batch_idx| -> DealIntelResult<Vec<Option<f64>>> {
            if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                return Err(DealIntelError::Cancelled(
                    "Simulation cancelled before batch start; partial results discarded".into(),
                ));
            }
            run_batch(params, batch_idx)
        })
        .collect::<DealIntelResult<Vec<_>>>()?;

    let mut values: Vec<f64> = Vec::with_capacity(params.trials as usize);
    let mut skipped: u32 = 0;
    for batch in batches {
        for trial in batch {
            match trial {
                Some(v) => values.push(v),
                None => skipped += 1,
            }
        }
    }

    if values.is_empty() {
        return Err(DealIntelError::InsufficientData(
            "All simulation trials were skipped as financially impossible".into(),
        ));
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Ok(SimulationSummary {
        p10: percentile_sorted(&values, 10.0),
        median: percentile_sorted(&values, 50.0),
        p90: percentile_sorted(&values, 90.0),
        mean,
        std_dev: variance.sqrt(),
        trials_run: values.len() as u32,
        trials_skipped: skipped,
    })
}

/// Compute the percentile value from a **sorted** slice using linear
/// interpolation.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn run_batch(params: &DcfTrialParams, batch_idx: u32) -> DealIntelResult<Vec<Option<f64>>> {
    let first = batch_idx * BATCH_SIZE;
    let count = BATCH_SIZE.min(params.trials - first);
    let mut rng = StdRng::seed_from_u64(batch_seed(params.seed, batch_idx as u64));

    let mut trials = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let g = params.growth.sample(&mut rng)?;
        let r = params.discount.sample(&mut rng)?;
        trials.push(trial_enterprise_value(params, g, r));
    }
    Ok(trials)
}

/// Single-trial DCF: project cash flows at the sampled growth rate, discount
/// at the sampled rate, and add a perpetuity-growth terminal value. Returns
/// `None` for financially impossible samples.
fn trial_enterprise_value(params: &DcfTrialParams, growth: f64, discount: f64) -> Option<f64> {
    if discount <= 0.0 || params.terminal_growth >= discount {
        return None;
    }

    let mut npv = 0.0_f64;
    let mut discount_factor = 1.0_f64;
    let mut last_fcf = params.base_fcf;

    for _ in 1..=params.horizon_years {
        last_fcf *= 1.0 + growth;
        discount_factor /= 1.0 + discount;
        npv += last_fcf * discount_factor;
    }

    let terminal_fcf = last_fcf * (1.0 + params.terminal_growth);
    let terminal_value = terminal_fcf / (discount - params.terminal_growth);
    npv += terminal_value * discount_factor;

    if npv.is_finite() {
        Some(npv)
    } else {
        None
    }
}

/// SplitMix64-style seed derivation: batch seeds are a pure function of the
/// base seed and the batch index.
fn batch_seed(seed: u64, batch: u64) -> u64 {
    let mut z = seed.wrapping_add(batch.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
