//! Multi-methodology valuation with stochastic uncertainty propagation.
//!
//! Three independent methodologies (DCF with a Monte Carlo overlay, trading
//! comparables, precedent transactions) are reconciled into a blended range.
//! Methodologies that cannot run are excluded from the blend; a valuation is
//! only an error when every methodology is unavailable.

mod comps;
mod dcf;
mod monte_carlo;
mod precedent;

pub use comps::{
    MultipleBasis, MultiplesMethodResult, PeerMultiple, MIN_PEERS_FOR_FULL_CONFIDENCE,
};
pub use dcf::{default_discount_rate, DcfAssumptions, DcfMethodResult, DEFAULT_HORIZON_YEARS};
pub use monte_carlo::{
    AssumptionDistribution, CancelToken, SimulationSummary, DEFAULT_TRIALS, MIN_TRIALS,
};
pub use precedent::{default_control_premium, PrecedentDeal};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DealIntelError;
use crate::types::{
    with_metadata, ComputationOutput, Currency, FinancialHistory, Money, PeriodFinancials, Rate,
};
use crate::DealIntelResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationMethodology {
    Dcf,
    ComparableCompanies,
    PrecedentTransactions,
}

impl std::fmt::Display for ValuationMethodology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuationMethodology::Dcf => write!(f, "DCF"),
            ValuationMethodology::ComparableCompanies => write!(f, "Comparable Companies"),
            ValuationMethodology::PrecedentTransactions => write!(f, "Precedent Transactions"),
        }
    }
}

/// One methodology's contribution to the blend. The range invariant
/// (low <= point <= high) and the confidence bounds are enforced at
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodologyEstimate {
    pub methodology: ValuationMethodology,
    pub low: Money,
    pub point: Money,
    pub high: Money,
    /// Blend weight in [0, 1].
    pub confidence: Decimal,
}

impl MethodologyEstimate {
    pub fn new(
        methodology: ValuationMethodology,
        low: Money,
        point: Money,
        high: Money,
        confidence: Decimal,
    ) -> DealIntelResult<Self> {
        if !(low <= point && point <= high) {
            return Err(DealIntelError::InvalidInput {
                field: "estimate".into(),
                reason: format!(
                    "{methodology}: range must satisfy low <= point <= high (got {low} / {point} / {high})"
                ),
            });
        }
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(DealIntelError::InvalidInput {
                field: "confidence".into(),
                reason: format!("{methodology}: confidence {confidence} outside [0, 1]"),
            });
        }
        Ok(Self {
            methodology,
            low,
            point,
            high,
            confidence,
        })
    }
}

/// Valuation request. Each request produces a fresh, immutable result;
/// prior results are never mutated, so callers can keep them for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub target_name: String,
    pub history: FinancialHistory,
    pub currency: Currency,
    /// Supplying assumptions (even empty) opts the DCF methodology in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcf: Option<DcfAssumptions>,
    /// Trading comparables; empty means the methodology was not supplied.
    #[serde(default)]
    pub peers: Vec<PeerMultiple>,
    /// Precedent transactions; empty means the methodology was not supplied.
    #[serde(default)]
    pub precedents: Vec<PrecedentDeal>,
    /// Control-premium adjustment for precedents (default +15%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_premium: Option<Rate>,
    /// Monte Carlo trial count (default 1,000).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trials: Option<u32>,
    /// Fixed seed for reproducible simulation; random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Reconciled valuation across the available methodologies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    pub target_name: String,
    pub currency: Currency,
    /// Methodologies included in the blend.
    pub methodologies: Vec<MethodologyEstimate>,
    pub blended_low: Money,
    pub blended_point: Money,
    pub blended_high: Money,
    /// Per-methodology detail for explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcf: Option<DcfMethodResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparables: Option<MultiplesMethodResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precedents: Option<MultiplesMethodResult>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a full valuation.
pub fn valuate(request: &ValuationRequest) -> DealIntelResult<ComputationOutput<ValuationResult>> {
    valuate_with_cancel(request, None)
}

/// Run a full valuation with a cooperative cancellation handle for the
/// Monte Carlo overlay.
pub fn valuate_with_cancel(
    request: &ValuationRequest,
    cancel: Option<&CancelToken>,
) -> DealIntelResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let trials = request.trials.unwrap_or(DEFAULT_TRIALS);
    let seed = request.seed.unwrap_or_else(rand::random);
    let empty_target = PeriodFinancials::default();
    let target = request
        .history
        .latest()
        .map(|s| &s.items)
        .unwrap_or(&empty_target);

    let mut estimates: Vec<MethodologyEstimate> = Vec::new();

    // --- DCF ---
    let dcf_detail = match &request.dcf {
        Some(assumptions) => {
            match dcf::run_dcf(&request.history, assumptions, trials, seed, cancel, &mut warnings)
            {
                Ok(detail) => {
                    estimates.push(MethodologyEstimate::new(
                        ValuationMethodology::Dcf,
                        detail.low,
                        detail.point,
                        detail.high,
                        detail.confidence,
                    )?);
                    Some(detail)
                }
                Err(DealIntelError::InsufficientData(reason)) => {
                    warnings.push(format!("DCF excluded: {reason}"));
                    None
                }
                Err(e) => return Err(e),
            }
        }
        None => {
            warnings.push("DCF excluded: no assumptions supplied".into());
            None
        }
    };

    // --- Comparable companies ---
    let comps_detail = if request.peers.is_empty() {
        warnings.push("Comparables excluded: no peer multiples supplied".into());
        None
    } else {
        match comps::run_comps(&request.peers, target, &mut warnings) {
            Ok(detail) => {
                estimates.push(MethodologyEstimate::new(
                    ValuationMethodology::ComparableCompanies,
                    detail.low,
                    detail.point,
                    detail.high,
                    detail.confidence,
                )?);
                Some(detail)
            }
            Err(DealIntelError::InsufficientData(reason)) => {
                warnings.push(format!("Comparables excluded: {reason}"));
                None
            }
            Err(e) => return Err(e),
        }
    };

    // --- Precedent transactions ---
    let precedent_detail = if request.precedents.is_empty() {
        warnings.push("Precedents excluded: no transaction multiples supplied".into());
        None
    } else {
        let premium = request.control_premium.unwrap_or_else(default_control_premium);
        match precedent::run_precedent(&request.precedents, target, premium, &mut warnings) {
            Ok(detail) => {
                estimates.push(MethodologyEstimate::new(
                    ValuationMethodology::PrecedentTransactions,
                    detail.low,
                    detail.point,
                    detail.high,
                    detail.confidence,
                )?);
                Some(detail)
            }
            Err(DealIntelError::InsufficientData(reason)) => {
                warnings.push(format!("Precedents excluded: {reason}"));
                None
            }
            Err(e) => return Err(e),
        }
    };

    // --- Reconcile ---
    // Zero-confidence methodologies are dropped entirely rather than carried
    // as zero weights.
    estimates.retain(|e| e.confidence > Decimal::ZERO);
    if estimates.is_empty() {
        return Err(DealIntelError::Valuation(format!(
            "All valuation methodologies were unavailable for '{}'; refusing to fabricate a value",
            request.target_name
        )));
    }

    let (blended_low, blended_point, blended_high) = blend(&estimates);

    let result = ValuationResult {
        target_name: request.target_name.clone(),
        currency: request.currency.clone(),
        methodologies: estimates,
        blended_low,
        blended_point,
        blended_high,
        dcf: dcf_detail,
        comparables: comps_detail,
        precedents: precedent_detail,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Blended Multi-Methodology Valuation",
        &serde_json::json!({
            "target": request.target_name,
            "trials": trials,
            "seed": request.seed,
            "peers": request.peers.len(),
            "precedents": request.precedents.len(),
            "dcf_supplied": request.dcf.is_some(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Confidence-weighted blend. The point is the weighted average of the
/// methodology points; the range is the union of methodology ranges trimmed
/// to the weighted average of the lows and highs (which always lies inside
/// the union). Callers must pass a non-empty slice of positive-confidence
/// estimates.
fn blend(estimates: &[MethodologyEstimate]) -> (Money, Money, Money) {
    let total_weight: Decimal = estimates.iter().map(|e| e.confidence).sum();

    let weighted = |f: fn(&MethodologyEstimate) -> Money| -> Money {
        estimates
            .iter()
            .map(|e| f(e) * e.confidence)
            .sum::<Decimal>()
            / total_weight
    };

    (
        weighted(|e| e.low),
        weighted(|e| e.point),
        weighted(|e| e.high),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
