use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "employee_id": "EMP-001",
        "name": "John Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "designation": "Backend Engineer",
        "base_salary": "50000.00",
        "joining_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "Backend Engineer")]
    pub designation: String,

    /// Monthly base salary
    #[schema(example = "50000.00", value_type = String)]
    pub base_salary: Decimal,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub joining_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }
}
