use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::period::Period;

pub const STATUS_PROCESSED: &str = "processed";

/// Manual adjustments supplied with a processing request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Adjustments {
    #[schema(example = "2000.00", value_type = String)]
    pub bonuses: Decimal,
    #[schema(example = "500.00", value_type = String)]
    pub deductions: Decimal,
}

/// The money side of a payroll record, all figures rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SalaryBreakdown {
    #[schema(value_type = String)]
    pub base_salary: Decimal,
    #[schema(value_type = String)]
    pub overtime_hours: Decimal,
    #[schema(value_type = String)]
    pub overtime_pay: Decimal,
    #[schema(value_type = String)]
    pub bonuses: Decimal,
    #[schema(value_type = String)]
    pub deductions: Decimal,
    #[schema(value_type = String)]
    pub gross: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub net_salary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "5b0c7c4e-2f3e-4a53-9a0e-6f5f0a9f4c11",
        "employee_id": "EMP-001",
        "employee_name": "John Doe",
        "month": 1,
        "year": 2026,
        "base_salary": "50000.00",
        "overtime_hours": "10.00",
        "overtime_pay": "4687.50",
        "bonuses": "2000.00",
        "deductions": "500.00",
        "gross": "56187.50",
        "tax": "8428.13",
        "net_salary": "47759.37",
        "status": "processed",
        "created_at": "2026-02-01T09:00:00Z"
    })
)]
pub struct PayrollRecord {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub employee_id: String,
    pub employee_name: String,
    #[serde(flatten)]
    pub period: Period,
    #[schema(value_type = String)]
    pub base_salary: Decimal,
    #[schema(value_type = String)]
    pub overtime_hours: Decimal,
    #[schema(value_type = String)]
    pub overtime_pay: Decimal,
    #[schema(value_type = String)]
    pub bonuses: Decimal,
    #[schema(value_type = String)]
    pub deductions: Decimal,
    #[schema(value_type = String)]
    pub gross: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub net_salary: Decimal,
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl PayrollRecord {
    pub fn new(
        employee_id: impl Into<String>,
        employee_name: impl Into<String>,
        period: Period,
        breakdown: SalaryBreakdown,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            period,
            base_salary: breakdown.base_salary,
            overtime_hours: breakdown.overtime_hours,
            overtime_pay: breakdown.overtime_pay,
            bonuses: breakdown.bonuses,
            deductions: breakdown.deductions,
            gross: breakdown.gross,
            tax: breakdown.tax,
            net_salary: breakdown.net_salary,
            status: STATUS_PROCESSED.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Human readable key used in conflict messages and logs.
    pub fn key(&self) -> String {
        format!("{}@{}", self.employee_id, self.period)
    }
}

/// Audit trail row written after a record is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub employee_id: String,
    pub performed_by: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn payroll_processed(record: &PayrollRecord, performed_by: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: "payroll_processed".to_string(),
            employee_id: record.employee_id.clone(),
            performed_by: performed_by.to_string(),
            details: serde_json::json!({
                "month": record.period.month,
                "year": record.period.year,
                "net_salary": record.net_salary,
            }),
            timestamp: Utc::now(),
        }
    }
}
