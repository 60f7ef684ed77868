use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DealIntelError;
use crate::DealIntelResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 8.5x EV/EBITDA)
pub type Multiple = Decimal;

/// Scores on a 0-100 scale
pub type Score = Decimal;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    GBP,
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    Other(String),
}

/// Identifier for a reporting period. Periods order chronologically by
/// their end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Human-readable label, e.g. "FY2024" or "Q3 2025"
    pub label: String,
    /// Last day of the period; the ordering key
    pub end_date: NaiveDate,
}

/// The fixed line-item schema for one reporting period. Every item is
/// optional: an absent item is a first-class "unknown" state, never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodFinancials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cogs: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_expenses: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_income: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_assets: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_liabilities: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_assets: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_liabilities: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_from_operations: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_expenditure: Option<Money>,
}

/// One recorded reporting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub period: FiscalPeriod,
    pub items: PeriodFinancials,
}

/// Append-only, chronologically ordered collection of financial statements.
/// Periods are immutable once recorded; a new period may only be appended
/// after the latest recorded end date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialHistory {
    statements: Vec<FinancialStatement>,
}

impl FinancialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from unordered statements. Statements are sorted by
    /// period end date; duplicate end dates are rejected.
    pub fn from_statements(mut statements: Vec<FinancialStatement>) -> DealIntelResult<Self> {
        statements.sort_by_key(|s| s.period.end_date);
        for pair in statements.windows(2) {
            if pair[0].period.end_date == pair[1].period.end_date {
                return Err(DealIntelError::InvalidInput {
                    field: "statements".into(),
                    reason: format!(
                        "Duplicate period end date {}",
                        pair[0].period.end_date
                    ),
                });
            }
        }
        Ok(Self { statements })
    }

    /// Append a new period. The end date must be strictly after the latest
    /// recorded period.
    pub fn append(&mut self, statement: FinancialStatement) -> DealIntelResult<()> {
        if let Some(last) = self.statements.last() {
            if statement.period.end_date <= last.period.end_date {
                return Err(DealIntelError::InvalidInput {
                    field: "period.end_date".into(),
                    reason: format!(
                        "Period ending {} does not follow latest recorded period ending {}",
                        statement.period.end_date, last.period.end_date
                    ),
                });
            }
        }
        self.statements.push(statement);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Most recent period, if any.
    pub fn latest(&self) -> Option<&FinancialStatement> {
        self.statements.last()
    }

    /// Period immediately before the latest, if any.
    pub fn prior(&self) -> Option<&FinancialStatement> {
        let n = self.statements.len();
        if n >= 2 {
            self.statements.get(n - 2)
        } else {
            None
        }
    }

    /// Chronological iteration, oldest first.
    pub fn periods(&self) -> impl Iterator<Item = &FinancialStatement> {
        self.statements.iter()
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stmt(label: &str, y: i32, m: u32, d: u32, revenue: Money) -> FinancialStatement {
        FinancialStatement {
            period: FiscalPeriod {
                label: label.into(),
                end_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            },
            items: PeriodFinancials {
                revenue: Some(revenue),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_from_statements_sorts_chronologically() {
        let history = FinancialHistory::from_statements(vec![
            stmt("FY2024", 2024, 12, 31, dec!(1200)),
            stmt("FY2022", 2022, 12, 31, dec!(900)),
            stmt("FY2023", 2023, 12, 31, dec!(1000)),
        ])
        .unwrap();

        let labels: Vec<&str> = history
            .periods()
            .map(|s| s.period.label.as_str())
            .collect();
        assert_eq!(labels, vec!["FY2022", "FY2023", "FY2024"]);
        assert_eq!(history.latest().unwrap().period.label, "FY2024");
        assert_eq!(history.prior().unwrap().period.label, "FY2023");
    }

    #[test]
    fn test_duplicate_period_rejected() {
        let result = FinancialHistory::from_statements(vec![
            stmt("FY2023", 2023, 12, 31, dec!(1000)),
            stmt("FY2023-restated", 2023, 12, 31, dec!(1100)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_append_requires_later_period() {
        let mut history =
            FinancialHistory::from_statements(vec![stmt("FY2023", 2023, 12, 31, dec!(1000))])
                .unwrap();

        // Same end date is rejected
        assert!(history.append(stmt("FY2023b", 2023, 12, 31, dec!(1000))).is_err());
        // Earlier end date is rejected
        assert!(history.append(stmt("FY2022", 2022, 12, 31, dec!(900))).is_err());
        // Later end date is accepted
        assert!(history.append(stmt("FY2024", 2024, 12, 31, dec!(1200))).is_ok());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_history() {
        let history = FinancialHistory::new();
        assert!(history.is_empty());
        assert!(history.latest().is_none());
        assert!(history.prior().is_none());
    }
}
