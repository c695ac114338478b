use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::period::Period;

/// Outcome of a statistical operation that needs a minimum sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis<T> {
    Ready(T),
    InsufficientData { required: usize, available: usize },
}

impl<T> Analysis<T> {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Analysis::InsufficientData { .. })
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Analysis::Ready(value) => Some(value),
            Analysis::InsufficientData { .. } => None,
        }
    }
}

/// Aggregate payroll cost of one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostObservation {
    pub period: Period,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ForecastPoint {
    /// First day of the projected month
    #[schema(example = "2026-07-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "412500.00", value_type = String)]
    pub predicted_cost: Decimal,
    #[schema(example = "398000.00", value_type = String)]
    pub lower_bound: Decimal,
    #[schema(example = "427000.00", value_type = String)]
    pub upper_bound: Decimal,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnomalyFlag {
    #[schema(example = "EMP-007")]
    pub employee_id: String,
    #[schema(example = "Jane Roe")]
    pub employee_name: String,
    #[serde(flatten)]
    pub period: Period,
    #[schema(example = "150000.00", value_type = String)]
    pub net_salary: Decimal,
    #[schema(example = 104.5)]
    pub anomaly_score: f64,
    #[schema(example = 212.37)]
    pub deviation_percent: f64,
    #[schema(example = "Net salary is unusually high relative to 12 peer records (+212.37% from the mean)")]
    pub reason: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_employees: u64,
    pub total_payroll_records: u64,
    #[schema(value_type = String)]
    pub monthly_payroll_cost: Decimal,
    #[schema(value_type = String)]
    pub total_overtime_pay: Decimal,
    pub department_distribution: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_from_its_display_name() {
        for severity in [Severity::Low, Severity::Medium, Severity::High] {
            assert_eq!(severity.to_string().parse::<Severity>(), Ok(severity));
        }
        assert!(matches!("Critical".parse::<Severity>(), Err(strum::ParseError::VariantNotFound)));
    }
}
