#![cfg(feature = "valuation")]

use chrono::NaiveDate;
use deal_intel_core::types::{
    Currency, FinancialHistory, FinancialStatement, FiscalPeriod, PeriodFinancials,
};
use deal_intel_core::valuation::{
    valuate, DcfAssumptions, PeerMultiple, PrecedentDeal, ValuationMethodology, ValuationRequest,
};
use deal_intel_core::DealIntelError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn statement(label: &str, year: i32, revenue: Decimal, ebitda: Decimal) -> FinancialStatement {
    FinancialStatement {
        period: FiscalPeriod {
            label: label.into(),
            end_date: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        },
        items: PeriodFinancials {
            revenue: Some(revenue),
            ebitda: Some(ebitda),
            cash_flow_from_operations: Some(ebitda * dec!(0.8)),
            capital_expenditure: Some(revenue * dec!(0.03)),
            ..Default::default()
        },
    }
}

fn target_history() -> FinancialHistory {
    FinancialHistory::from_statements(vec![
        statement("FY2023", 2023, dec!(9_000_000), dec!(1_800_000)),
        statement("FY2024", 2024, dec!(10_000_000), dec!(2_000_000)),
    ])
    .unwrap()
}

fn peers_8_9_10() -> Vec<PeerMultiple> {
    vec![
        PeerMultiple {
            name: "PeerA".into(),
            ev_revenue: None,
            ev_ebitda: Some(dec!(8)),
        },
        PeerMultiple {
            name: "PeerB".into(),
            ev_revenue: None,
            ev_ebitda: Some(dec!(9)),
        },
        PeerMultiple {
            name: "PeerC".into(),
            ev_revenue: None,
            ev_ebitda: Some(dec!(10)),
        },
    ]
}

fn base_request() -> ValuationRequest {
    ValuationRequest {
        target_name: "TargetCo".into(),
        history: target_history(),
        currency: Currency::GBP,
        dcf: None,
        peers: vec![],
        precedents: vec![],
        control_premium: None,
        trials: None,
        seed: Some(42),
    }
}

// ===========================================================================
// Comparables-only scenario
// ===========================================================================

#[test]
fn test_comps_only_median_nine_times_two_million() {
    let mut request = base_request();
    request.peers = peers_8_9_10();

    let output = valuate(&request).unwrap();
    let result = &output.result;

    assert_eq!(result.blended_point, dec!(18_000_000));
    assert_eq!(result.blended_low, dec!(16_000_000));
    assert_eq!(result.blended_high, dec!(20_000_000));
    assert_eq!(result.methodologies.len(), 1);

    // Three peers: the small-sample confidence cap does not apply.
    assert!(result.methodologies[0].confidence > dec!(0.4));
}

#[test]
fn test_two_peers_confidence_capped() {
    let mut request = base_request();
    request.peers = peers_8_9_10();
    request.peers.truncate(2);

    let output = valuate(&request).unwrap();
    assert!(output.result.methodologies[0].confidence <= dec!(0.4));
    assert!(output.warnings.iter().any(|w| w.contains("capped")));
}

// ===========================================================================
// Reconciliation
// ===========================================================================

#[test]
fn test_all_methodologies_unavailable_raises_valuation_error() {
    let request = base_request();
    let result = valuate(&request);
    assert!(matches!(result, Err(DealIntelError::Valuation(_))));
}

#[test]
fn test_never_returns_zero_valuation() {
    let mut request = base_request();
    request.history = FinancialHistory::new();
    request.peers = peers_8_9_10(); // no target metric to anchor to

    match valuate(&request) {
        Err(DealIntelError::Valuation(_)) => {}
        Ok(output) => panic!(
            "Expected a valuation error, got a blended point of {}",
            output.result.blended_point
        ),
        Err(e) => panic!("Expected a valuation error, got {e}"),
    }
}

#[test]
fn test_three_methodology_blend() {
    let mut request = base_request();
    request.dcf = Some(DcfAssumptions {
        growth_rate: Some(dec!(0.06)),
        discount_rate: Some(dec!(0.11)),
        terminal_growth: Some(dec!(0.02)),
        ..Default::default()
    });
    request.peers = peers_8_9_10();
    request.precedents = vec![
        PrecedentDeal {
            name: "Deal1".into(),
            ev_revenue: None,
            ev_ebitda: Some(dec!(9)),
        },
        PrecedentDeal {
            name: "Deal2".into(),
            ev_revenue: None,
            ev_ebitda: Some(dec!(10)),
        },
        PrecedentDeal {
            name: "Deal3".into(),
            ev_revenue: None,
            ev_ebitda: Some(dec!(11)),
        },
    ];

    let output = valuate(&request).unwrap();
    let result = &output.result;

    assert_eq!(result.methodologies.len(), 3);
    assert!(result.blended_low <= result.blended_point);
    assert!(result.blended_point <= result.blended_high);

    // The blend must sit inside the union of the methodology ranges.
    let union_low = result.methodologies.iter().map(|m| m.low).min().unwrap();
    let union_high = result.methodologies.iter().map(|m| m.high).max().unwrap();
    assert!(result.blended_point >= union_low && result.blended_point <= union_high);

    // Precedents carry the +15% control premium over the trading comps.
    let comps = result
        .methodologies
        .iter()
        .find(|m| m.methodology == ValuationMethodology::ComparableCompanies)
        .unwrap();
    let precedents = result
        .methodologies
        .iter()
        .find(|m| m.methodology == ValuationMethodology::PrecedentTransactions)
        .unwrap();
    // Comps median 9x vs precedent median 10x * 1.15
    assert_eq!(comps.point, dec!(18_000_000));
    assert_eq!(precedents.point, dec!(23_000_000));
}

#[test]
fn test_failed_methodology_excluded_not_fatal() {
    let mut request = base_request();
    request.peers = peers_8_9_10();
    // DCF assumptions supplied but underivable: no FCF basis anywhere.
    let mut bare = FinancialHistory::new();
    bare.append(FinancialStatement {
        period: FiscalPeriod {
            label: "FY2024".into(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        },
        items: PeriodFinancials {
            ebitda: Some(dec!(2_000_000)),
            ..Default::default()
        },
    })
    .unwrap();
    request.history = bare;
    request.dcf = Some(DcfAssumptions::default());

    let output = valuate(&request).unwrap();
    assert_eq!(output.result.methodologies.len(), 1);
    assert!(output.warnings.iter().any(|w| w.contains("DCF excluded")));
}

// ===========================================================================
// Determinism & assumption validation
// ===========================================================================

#[test]
fn test_seeded_valuation_is_reproducible() {
    let mut request = base_request();
    request.dcf = Some(DcfAssumptions {
        growth_rate: Some(dec!(0.05)),
        discount_rate: Some(dec!(0.10)),
        ..Default::default()
    });
    request.peers = peers_8_9_10();

    let first = valuate(&request).unwrap();
    let second = valuate(&request).unwrap();

    assert_eq!(first.result.blended_low, second.result.blended_low);
    assert_eq!(first.result.blended_point, second.result.blended_point);
    assert_eq!(first.result.blended_high, second.result.blended_high);
}

#[test]
fn test_growth_at_discount_rejected_before_simulation() {
    let mut request = base_request();
    request.dcf = Some(DcfAssumptions {
        growth_rate: Some(dec!(0.10)),
        discount_rate: Some(dec!(0.10)),
        ..Default::default()
    });
    request.peers = peers_8_9_10();

    let result = valuate(&request);
    assert!(matches!(
        result,
        Err(DealIntelError::InvalidAssumption { .. })
    ));
}

#[test]
fn test_dcf_range_uses_percentiles_not_extremes() {
    let mut request = base_request();
    request.dcf = Some(DcfAssumptions {
        growth_rate: Some(dec!(0.05)),
        discount_rate: Some(dec!(0.10)),
        ..Default::default()
    });
    request.trials = Some(2_000);

    let output = valuate(&request).unwrap();
    let dcf = output.result.dcf.as_ref().unwrap();

    // P10/P90 bracket the median strictly inside the simulated extremes:
    // with 2,000 trials the distribution has tails beyond both bounds.
    assert!(dcf.low < dcf.point);
    assert!(dcf.point < dcf.high);
    assert!(dcf.low <= dcf.mean && dcf.mean <= dcf.high);
}
