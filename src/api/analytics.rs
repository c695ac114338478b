use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::model::analytics::{Analysis, AnomalyFlag, ForecastPoint};
use crate::services::analytics::{AnalyticsFacade, DashboardScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ready,
    InsufficientData,
}

/// Envelope fields shared by the forecast and anomaly responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisMeta {
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 5)]
    pub required: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 3)]
    pub available: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastResponse {
    #[serde(flatten)]
    pub meta: AnalysisMeta,
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnomalyResponse {
    #[serde(flatten)]
    pub meta: AnalysisMeta,
    pub anomalies: Vec<AnomalyFlag>,
}

/// Splits an analysis into its envelope and items; too little data is an
/// ordinary answer with an empty list.
fn envelope<T>(analysis: Analysis<Vec<T>>, needs: &str) -> (AnalysisMeta, Vec<T>) {
    match analysis {
        Analysis::Ready(items) => (
            AnalysisMeta {
                status: AnalysisStatus::Ready,
                required: None,
                available: None,
                message: None,
            },
            items,
        ),
        Analysis::InsufficientData {
            required,
            available,
        } => (
            AnalysisMeta {
                status: AnalysisStatus::InsufficientData,
                required: Some(required),
                available: Some(available),
                message: Some(format!(
                    "At least {required} {needs}, only {available} available"
                )),
            },
            Vec::new(),
        ),
    }
}

/// Dashboard summary
///
/// HR and admins get the organisation view, employees their own figures.
#[utoipa::path(
    get,
    path = "/api/analytics/dashboard",
    responses(
        (status = 200, body = crate::model::analytics::DashboardSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No dashboard for this role"),
        (status = 404, description = "Linked employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn dashboard(
    auth: AuthUser,
    analytics: web::Data<AnalyticsFacade>,
) -> actix_web::Result<impl Responder> {
    let scope = if auth.role.manages_payroll() {
        DashboardScope::Organization
    } else if auth.is_employee() {
        DashboardScope::Employee(auth.own_employee_id()?.to_string())
    } else {
        return Err(actix_web::error::ErrorForbidden("No dashboard for this role"));
    };

    let summary = analytics
        .dashboard_summary(scope, Utc::now().date_naive())
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// Payroll cost forecast for the coming months
#[utoipa::path(
    get,
    path = "/api/analytics/forecast",
    responses(
        (status = 200, body = ForecastResponse, example = json!({
            "status": "insufficient_data",
            "required": 5,
            "available": 3,
            "message": "At least 5 months of payroll history are needed for a forecast, only 3 available",
            "forecast": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 504, description = "Forecast exceeded its time budget")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn forecast(
    auth: AuthUser,
    analytics: web::Data<AnalyticsFacade>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (meta, forecast) = envelope(
        analytics.forecast().await?,
        "months of payroll history are needed for a forecast",
    );

    Ok(HttpResponse::Ok().json(ForecastResponse { meta, forecast }))
}

/// Payroll records that stand out from their peers
#[utoipa::path(
    get,
    path = "/api/analytics/anomalies",
    responses(
        (status = 200, body = AnomalyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 504, description = "Detection exceeded its time budget")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn anomalies(
    auth: AuthUser,
    analytics: web::Data<AnalyticsFacade>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (meta, anomalies) = envelope(
        analytics.anomalies().await?,
        "payroll records are needed for anomaly detection",
    );

    Ok(HttpResponse::Ok().json(AnomalyResponse { meta, anomalies }))
}
