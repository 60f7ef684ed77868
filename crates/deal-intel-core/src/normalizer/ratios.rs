use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DealIntelError;
use crate::types::{with_metadata, ComputationOutput, FinancialHistory, Money, Rate};
use crate::DealIntelResult;

/// Number of ratios in a full set; the denominator for completeness.
pub const RATIO_COUNT: usize = 14;

/// Standardized ratio set derived from a financial history.
///
/// Every ratio is optional: `None` means "undefined" (zero or absent
/// denominator, or not enough periods). Undefined ratios are excluded from
/// downstream weighted calculations; they never count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRatioSet {
    // Profitability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_on_assets: Option<Rate>,

    // Liquidity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_coverage: Option<Decimal>,

    // Leverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_assets: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<Rate>,

    // Efficiency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_turnover: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_intensity: Option<Rate>,

    // Growth (require at least two chronologically ordered periods)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda_growth: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfo_growth: Option<Rate>,

    /// Number of periods the set was derived from.
    pub periods_used: usize,
}

impl NormalizedRatioSet {
    fn defined_count(&self) -> usize {
        [
            self.gross_margin,
            self.operating_margin,
            self.ebitda_margin,
            self.net_margin,
            self.return_on_assets,
            self.current_ratio,
            self.cash_flow_coverage,
            self.debt_to_assets,
            self.debt_to_equity,
            self.asset_turnover,
            self.capex_intensity,
            self.revenue_growth,
            self.ebitda_growth,
            self.cfo_growth,
        ]
        .iter()
        .filter(|r| r.is_some())
        .count()
    }

    /// Fraction of ratios that could be computed, in [0, 1].
    pub fn completeness(&self) -> Decimal {
        Decimal::from(self.defined_count() as u32) / Decimal::from(RATIO_COUNT as u32)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive a standardized ratio set from a financial history.
///
/// Pure function: identical input produces identical output, and
/// recomputation is idempotent. Requires at least one recorded period;
/// growth ratios additionally require two.
pub fn normalize(
    history: &FinancialHistory,
) -> DealIntelResult<ComputationOutput<NormalizedRatioSet>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let latest = history.latest().ok_or_else(|| {
        DealIntelError::InsufficientData(
            "At least one financial period is required for normalization".into(),
        )
    })?;
    let items = &latest.items;

    let gross_profit = match (items.revenue, items.cogs) {
        (Some(rev), Some(cogs)) => Some(rev - cogs),
        _ => None,
    };
    let operating_income = match (gross_profit, items.operating_expenses) {
        (Some(gp), Some(opex)) => Some(gp - opex),
        _ => None,
    };
    let equity = match (items.total_assets, items.total_liabilities) {
        (Some(ta), Some(tl)) => Some(ta - tl),
        _ => None,
    };

    let mut set = NormalizedRatioSet {
        gross_margin: safe_ratio(gross_profit, items.revenue, "gross_margin", &mut warnings),
        operating_margin: safe_ratio(
            operating_income,
            items.revenue,
            "operating_margin",
            &mut warnings,
        ),
        ebitda_margin: safe_ratio(items.ebitda, items.revenue, "ebitda_margin", &mut warnings),
        net_margin: safe_ratio(items.net_income, items.revenue, "net_margin", &mut warnings),
        return_on_assets: safe_ratio(
            items.net_income,
            items.total_assets,
            "return_on_assets",
            &mut warnings,
        ),
        current_ratio: safe_ratio(
            items.current_assets,
            items.current_liabilities,
            "current_ratio",
            &mut warnings,
        ),
        cash_flow_coverage: safe_ratio(
            items.cash_flow_from_operations,
            items.current_liabilities,
            "cash_flow_coverage",
            &mut warnings,
        ),
        debt_to_assets: safe_ratio(
            items.total_liabilities,
            items.total_assets,
            "debt_to_assets",
            &mut warnings,
        ),
        debt_to_equity: None,
        asset_turnover: safe_ratio(
            items.revenue,
            items.total_assets,
            "asset_turnover",
            &mut warnings,
        ),
        capex_intensity: safe_ratio(
            items.capital_expenditure,
            items.revenue,
            "capex_intensity",
            &mut warnings,
        ),
        revenue_growth: None,
        ebitda_growth: None,
        cfo_growth: None,
        periods_used: history.len(),
    };

    // Debt-to-equity is undefined for zero or negative book equity
    set.debt_to_equity = match (items.total_liabilities, equity) {
        (Some(tl), Some(eq)) if eq > Decimal::ZERO => Some(tl / eq),
        (Some(_), Some(_)) => {
            warnings.push("debt_to_equity undefined: book equity is not positive".into());
            None
        }
        _ => {
            warnings.push("debt_to_equity undefined: missing balance sheet items".into());
            None
        }
    };

    // Growth ratios: latest period against the one before it
    match history.prior() {
        Some(prior) => {
            set.revenue_growth = growth(
                prior.items.revenue,
                items.revenue,
                "revenue_growth",
                &mut warnings,
            );
            set.ebitda_growth = growth(
                prior.items.ebitda,
                items.ebitda,
                "ebitda_growth",
                &mut warnings,
            );
            set.cfo_growth = growth(
                prior.items.cash_flow_from_operations,
                items.cash_flow_from_operations,
                "cfo_growth",
                &mut warnings,
            );
        }
        None => {
            warnings.push(
                "Growth ratios undefined: at least two periods are required".into(),
            );
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Standardized Ratio Normalization",
        &serde_json::json!({
            "periods": history.len(),
            "latest_period": latest.period.label,
        }),
        warnings,
        elapsed,
        set,
    ))
}

/// Average period-over-period revenue growth across the full history.
/// Used to derive a DCF growth assumption when the caller supplies none.
/// Returns `None` with fewer than two periods or no computable pairs.
pub fn derived_revenue_growth(history: &FinancialHistory) -> Option<Rate> {
    let statements: Vec<_> = history.periods().collect();
    if statements.len() < 2 {
        return None;
    }

    let mut rates: Vec<Rate> = Vec::new();
    for pair in statements.windows(2) {
        if let (Some(prev), Some(curr)) = (pair[0].items.revenue, pair[1].items.revenue) {
            if prev != Decimal::ZERO {
                rates.push((curr - prev) / prev.abs());
            }
        }
    }

    if rates.is_empty() {
        return None;
    }
    let sum: Decimal = rates.iter().copied().sum();
    Some(sum / Decimal::from(rates.len() as u32))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Safe division: undefined (None) when either operand is absent or the
/// denominator is zero. Undefined ratios never raise.
fn safe_ratio(
    numerator: Option<Money>,
    denominator: Option<Money>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Option<Decimal> {
    match (numerator, denominator) {
        (Some(num), Some(den)) if den != Decimal::ZERO => Some(num / den),
        (Some(_), Some(_)) => {
            warnings.push(format!("{name} undefined: denominator is zero"));
            None
        }
        _ => {
            warnings.push(format!("{name} undefined: missing line items"));
            None
        }
    }
}

fn growth(
    prior: Option<Money>,
    current: Option<Money>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Option<Rate> {
    match (prior, current) {
        (Some(prev), Some(curr)) if prev != Decimal::ZERO => Some((curr - prev) / prev.abs()),
        (Some(_), Some(_)) => {
            warnings.push(format!("{name} undefined: prior value is zero"));
            None
        }
        _ => {
            warnings.push(format!("{name} undefined: missing line items"));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
