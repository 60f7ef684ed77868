use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::types::{Money, Multiple, PeriodFinancials};
use crate::DealIntelResult;

/// Peer count below which methodology confidence is capped, regardless of
/// how tight the multiple dispersion looks.
pub const MIN_PEERS_FOR_FULL_CONFIDENCE: usize = 3;

/// Confidence ceiling applied to undersized samples.
pub fn small_sample_confidence_cap() -> Decimal {
    dec!(0.4)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Trading multiples observed for one comparable company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMultiple {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_revenue: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_ebitda: Option<Multiple>,
}

/// Which target metric a multiples-based estimate was anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleBasis {
    EvEbitda,
    EvRevenue,
}

impl std::fmt::Display for MultipleBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleBasis::EvEbitda => write!(f, "EV/EBITDA"),
            MultipleBasis::EvRevenue => write!(f, "EV/Revenue"),
        }
    }
}

/// Result of a multiples-based methodology (comparables or precedents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplesMethodResult {
    pub low: Money,
    pub point: Money,
    pub high: Money,
    pub confidence: Decimal,
    pub basis: MultipleBasis,
    pub median_multiple: Multiple,
    pub sample_size: usize,
}

// ---------------------------------------------------------------------------
// Methodology entry point
// ---------------------------------------------------------------------------

/// Comparable company analysis: apply the peer-median multiple to the
/// target's corresponding metric. EBITDA multiples are preferred; revenue
/// multiples are the fallback when EBITDA is unusable.
pub(crate) fn run_comps(
    peers: &[PeerMultiple],
    target: &PeriodFinancials,
    warnings: &mut Vec<String>,
) -> DealIntelResult<MultiplesMethodResult> {
    let (basis, metric, multiples) = select_basis(peers, target)?;
    estimate_from_multiples(basis, metric, multiples, "Comparables", warnings)
}

// ---------------------------------------------------------------------------
// Shared mechanics (also used by precedent transactions)
// ---------------------------------------------------------------------------

pub(crate) fn select_basis(
    peers: &[PeerMultiple],
    target: &PeriodFinancials,
) -> DealIntelResult<(MultipleBasis, Money, Vec<Multiple>)> {
    let ebitda_multiples: Vec<Multiple> = peers
        .iter()
        .filter_map(|p| p.ev_ebitda)
        .filter(|m| *m > Decimal::ZERO)
        .collect();
    if let Some(ebitda) = target.ebitda {
        if ebitda > Decimal::ZERO && !ebitda_multiples.is_empty() {
            return Ok((MultipleBasis::EvEbitda, ebitda, ebitda_multiples));
        }
    }

    let revenue_multiples: Vec<Multiple> = peers
        .iter()
        .filter_map(|p| p.ev_revenue)
        .filter(|m| *m > Decimal::ZERO)
        .collect();
    if let Some(revenue) = target.revenue {
        if revenue > Decimal::ZERO && !revenue_multiples.is_empty() {
            return Ok((MultipleBasis::EvRevenue, revenue, revenue_multiples));
        }
    }

    Err(DealIntelError::InsufficientData(
        "No usable multiple basis: target metric and peer multiples never overlap".into(),
    ))
}

pub(crate) fn estimate_from_multiples(
    basis: MultipleBasis,
    metric: Money,
    mut multiples: Vec<Multiple>,
    label: &str,
    warnings: &mut Vec<String>,
) -> DealIntelResult<MultiplesMethodResult> {
    multiples.sort();
    let (mean, median, std_dev) = decimal_stats(&multiples);
    let sample_size = multiples.len();

    // Dispersion-based confidence: tight multiple clusters are trusted more.
    let cv = if mean == Decimal::ZERO {
        Decimal::ONE
    } else {
        std_dev / mean
    };
    let mut confidence = (Decimal::ONE - cv).clamp(dec!(0.1), dec!(0.9));

    if sample_size < MIN_PEERS_FOR_FULL_CONFIDENCE {
        confidence = confidence.min(small_sample_confidence_cap());
        warnings.push(format!(
            "{label}: only {sample_size} usable {basis} multiple(s); confidence capped at {}",
            small_sample_confidence_cap()
        ));
    }

    Ok(MultiplesMethodResult {
        low: multiples[0] * metric,
        point: median * metric,
        high: multiples[sample_size - 1] * metric,
        confidence,
        basis,
        median_multiple: median,
        sample_size,
    })
}

/// Mean, median, and sample standard deviation of a **sorted** slice.
pub(crate) fn decimal_stats(sorted: &[Decimal]) -> (Decimal, Decimal, Decimal) {
    let count = sorted.len();
    let sum: Decimal = sorted.iter().copied().sum();
    let mean = sum / Decimal::from(count as u64);

    let median = if count % 2 == 0 {
        let mid = count / 2;
        (sorted[mid - 1] + sorted[mid]) / dec!(2)
    } else {
        sorted[count / 2]
    };

    let std_dev = if count > 1 {
        let variance: Decimal = sorted
            .iter()
            .map(|v| {
                let diff = *v - mean;
                diff * diff
            })
            .sum::<Decimal>()
            / Decimal::from((count - 1) as u64);
        variance.sqrt().unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    (mean, median, std_dev)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
