use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One day of attendance for one employee. Unique per (employee, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEntry {
    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = "2026-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "8.00", value_type = String)]
    pub hours_worked: Decimal,

    #[schema(example = "2.00", value_type = String)]
    pub overtime_hours: Decimal,

    #[schema(example = 0)]
    pub leaves: u32,
}

/// Totals for one employee over one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(value_type = String)]
    pub total_hours_worked: Decimal,
    #[schema(value_type = String)]
    pub total_overtime_hours: Decimal,
    pub total_leaves: u32,
}
