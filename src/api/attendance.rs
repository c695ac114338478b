use crate::auth::auth::AuthUser;
use crate::error::PayrollError;
use crate::model::attendance::{AttendanceEntry, AttendanceSummary};
use crate::model::period::Period;
use crate::services::attendance_aggregator;
use crate::store::PayrollStore;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub employee_id: String,
    /// 1-12
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceSummaryResponse {
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[serde(flatten)]
    pub period: Period,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

/// Record one day of attendance
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = AttendanceEntry,
    responses(
        (status = 201, description = "Attendance recorded", body = AttendanceEntry),
        (status = 400, description = "Hours out of range", body = Object, example = json!({
            "error": "validation_error",
            "message": "invalid hours_worked: 25 on 2026-01-15 is not between 0 and 24",
            "field": "hours_worked"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Attendance already recorded for the date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    payload: web::Json<AttendanceEntry>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let entry = payload.into_inner();
    attendance_aggregator::validate_entry(&entry)?;

    if store.find_employee(&entry.employee_id).await?.is_none() {
        return Err(PayrollError::not_found("employee", entry.employee_id).into());
    }

    store.insert_attendance(&entry).await?;

    info!(
        employee_id = %entry.employee_id,
        date = %entry.date,
        recorded_by = %auth.username,
        "Attendance recorded"
    );

    Ok(HttpResponse::Created().json(entry))
}

/// Attendance totals of one employee for one month
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, body = AttendanceSummaryResponse),
        (status = 400, description = "Invalid period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let query = query.into_inner();
    let period = Period::new(query.month, query.year)?;

    if store.find_employee(&query.employee_id).await?.is_none() {
        return Err(PayrollError::not_found("employee", query.employee_id).into());
    }

    let entries = store.attendance_for_period(&query.employee_id, period).await?;
    let summary = attendance_aggregator::aggregate(&query.employee_id, period, &entries)?;

    Ok(HttpResponse::Ok().json(AttendanceSummaryResponse {
        employee_id: query.employee_id,
        period,
        summary,
    }))
}
