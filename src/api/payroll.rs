use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::PayrollError;
use crate::model::payroll::Adjustments;
use crate::model::period::Period;
use crate::services::payroll_calculator::PayrollCalculator;
use crate::store::PayrollStore;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessPayroll {
    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    #[serde(default)]
    #[schema(example = "2000.00", value_type = String)]
    pub bonuses: Decimal,

    #[serde(default)]
    #[schema(example = "500.00", value_type = String)]
    pub deductions: Decimal,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PayrollQuery {
    /// Restrict the listing to one employee
    #[schema(example = "EMP-001")]
    pub employee_id: Option<String>,
}

/// Process payroll for one employee and month
#[utoipa::path(
    post,
    path = "/api/payroll/process",
    request_body = ProcessPayroll,
    responses(
        (status = 201, description = "Payroll processed", body = crate::model::payroll::PayrollRecord),
        (status = 400, description = "Invalid period, amounts or inactive employee", body = Object, example = json!({
            "error": "validation_error",
            "message": "invalid month: 13 is not between 1 and 12",
            "field": "month"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payroll already processed for the period", body = Object, example = json!({
            "error": "conflict",
            "message": "payroll for 2026-01 already exists for employee EMP-001"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn process_payroll(
    auth: AuthUser,
    calculator: web::Data<PayrollCalculator>,
    payload: web::Json<ProcessPayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let payload = payload.into_inner();
    let employee_id = payload.employee_id.trim();
    if employee_id.is_empty() {
        return Err(PayrollError::validation("employee_id", "must not be empty").into());
    }
    let period = Period::new(payload.month, payload.year)?;
    let adjustments = Adjustments {
        bonuses: payload.bonuses,
        deductions: payload.deductions,
    };

    let record = calculator
        .process(employee_id, period, adjustments, &auth.username)
        .await?;

    Ok(HttpResponse::Created().json(record))
}

/// List processed payroll records
///
/// Employees only ever see their own records.
#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = [crate::model::payroll::PayrollRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to view these records")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payroll(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    let filter = if auth.role.manages_payroll() {
        query.into_inner().employee_id
    } else if auth.is_employee() {
        let own = auth.own_employee_id()?;
        match query.employee_id.as_deref() {
            Some(requested) if requested != own => {
                return Err(actix_web::error::ErrorForbidden("Employees can only view their own payroll"));
            }
            _ => Some(own.to_string()),
        }
    } else {
        return Err(actix_web::error::ErrorForbidden("Not allowed to view payroll"));
    };

    let records = store.list_payroll(filter.as_deref()).await?;

    Ok(HttpResponse::Ok().json(records))
}
