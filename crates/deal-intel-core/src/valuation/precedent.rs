use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::types::{Multiple, PeriodFinancials, Rate};
use crate::DealIntelResult;

use super::comps::{estimate_from_multiples, select_basis, MultiplesMethodResult, PeerMultiple};

/// Default control premium embedded in precedent transaction multiples.
pub fn default_control_premium() -> Rate {
    dec!(0.15)
}

/// Multiples observed in one historical transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedentDeal {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_revenue: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_ebitda: Option<Multiple>,
}

/// Precedent transaction analysis: same median-multiple mechanics as trading
/// comparables, then a control-premium uplift. Precedent multiples embed a
/// control premium absent from trading multiples, so the adjustment is
/// applied to the point and both bounds.
pub(crate) fn run_precedent(
    deals: &[PrecedentDeal],
    target: &PeriodFinancials,
    control_premium: Rate,
    warnings: &mut Vec<String>,
) -> DealIntelResult<MultiplesMethodResult> {
    if control_premium <= dec!(-1) {
        return Err(DealIntelError::InvalidAssumption {
            field: "control_premium".into(),
            reason: "Premium must be greater than -100%".into(),
        });
    }
    if control_premium.abs() > dec!(0.5) {
        warnings.push(format!(
            "Precedents: control premium of {control_premium} is outside the typical range"
        ));
    }

    let as_multiples: Vec<PeerMultiple> = deals
        .iter()
        .map(|d| PeerMultiple {
            name: d.name.clone(),
            ev_revenue: d.ev_revenue,
            ev_ebitda: d.ev_ebitda,
        })
        .collect();

    let (basis, metric, multiples) = select_basis(&as_multiples, target)?;
    let base = estimate_from_multiples(basis, metric, multiples, "Precedents", warnings)?;

    let uplift = Decimal::ONE + control_premium;
    Ok(MultiplesMethodResult {
        low: base.low * uplift,
        point: base.point * uplift,
        high: base.high * uplift,
        ..base
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn deal(name: &str, ev_ebitda: Decimal) -> PrecedentDeal {
        PrecedentDeal {
            name: name.into(),
            ev_revenue: None,
            ev_ebitda: Some(ev_ebitda),
        }
    }

    fn target() -> PeriodFinancials {
        PeriodFinancials {
            ebitda: Some(dec!(1_000_000)),
            ..Default::default()
        }
    }

    #[test]
    fn test_control_premium_applied() {
        let deals = vec![deal("T1", dec!(8)), deal("T2", dec!(10)), deal("T3", dec!(12))];
        let mut warnings = Vec::new();
        let result =
            run_precedent(&deals, &target(), default_control_premium(), &mut warnings).unwrap();

        // Median 10x * 1M * 1.15
        assert_eq!(result.point, dec!(11_500_000));
        assert_eq!(result.low, dec!(9_200_000));
        assert_eq!(result.high, dec!(13_800_000));
    }

    #[test]
    fn test_zero_premium_matches_comps_mechanics() {
        let deals = vec![deal("T1", dec!(8)), deal("T2", dec!(10)), deal("T3", dec!(12))];
        let mut warnings = Vec::new();
        let result = run_precedent(&deals, &target(), Decimal::ZERO, &mut warnings).unwrap();
        assert_eq!(result.point, dec!(10_000_000));
    }

    #[test]
    fn test_small_sample_cap_applies() {
        let deals = vec![deal("T1", dec!(10))];
        let mut warnings = Vec::new();
        let result =
            run_precedent(&deals, &target(), default_control_premium(), &mut warnings).unwrap();
        assert!(result.confidence <= dec!(0.4));
        assert!(warnings.iter().any(|w| w.contains("Precedents")));
    }

    #[test]
    fn test_premium_below_negative_one_rejected() {
        let deals = vec![deal("T1", dec!(10))];
        let mut warnings = Vec::new();
        let result = run_precedent(&deals, &target(), dec!(-1.2), &mut warnings);
        assert!(matches!(
            result,
            Err(DealIntelError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_atypical_premium_warns() {
        let deals = vec![deal("T1", dec!(8)), deal("T2", dec!(10)), deal("T3", dec!(12))];
        let mut warnings = Vec::new();
        run_precedent(&deals, &target(), dec!(0.60), &mut warnings).unwrap();
        assert!(warnings.iter().any(|w| w.contains("typical range")));
    }
}
