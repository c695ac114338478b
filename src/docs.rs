use crate::api::analytics::{AnalysisMeta, AnalysisStatus, AnomalyResponse, ForecastResponse};
use crate::api::attendance::AttendanceSummaryResponse;
use crate::api::payroll::{PayrollQuery, ProcessPayroll};
use crate::model::analytics::{AnomalyFlag, DashboardSummary, ForecastPoint, Severity};
use crate::model::attendance::{AttendanceEntry, AttendanceSummary};
use crate::model::payroll::PayrollRecord;
use crate::model::period::Period;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll Analytics API",
        version = "1.0.0",
        description = r#"
## Payroll computation and analytics

Turns attendance and compensation data into monthly payroll records and
answers analytical questions over the accumulated history.

### Key Features
- **Payroll Processing**
  - One record per employee and month, overtime and tax computed server side
- **Attendance**
  - Daily entries and monthly totals
- **Analytics**
  - Dashboard summary, six month cost forecast and anomaly flags

### Security
All endpoints require a **JWT Bearer** access token.
Processing, attendance and organisation-wide analytics need the **Admin** or
**HR** role; employees may read their own payroll and dashboard.

### Response Format
- Monetary amounts are decimal strings with two places
- Forecast and anomaly endpoints answer `insufficient_data` with an empty list
  when there is not enough history
"#,
    ),
    paths(
        crate::api::payroll::process_payroll,
        crate::api::payroll::list_payroll,

        crate::api::attendance::record_attendance,
        crate::api::attendance::attendance_summary,

        crate::api::analytics::dashboard,
        crate::api::analytics::forecast,
        crate::api::analytics::anomalies
    ),
    components(
        schemas(
            ProcessPayroll,
            PayrollQuery,
            PayrollRecord,
            Period,
            AttendanceEntry,
            AttendanceSummary,
            AttendanceSummaryResponse,
            DashboardSummary,
            ForecastPoint,
            AnomalyFlag,
            Severity,
            AnalysisStatus,
            AnalysisMeta,
            ForecastResponse,
            AnomalyResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payroll", description = "Payroll processing APIs"),
        (name = "Attendance", description = "Attendance recording APIs"),
        (name = "Analytics", description = "Dashboard, forecast and anomaly APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/payroll/process",
            "/api/payroll",
            "/api/attendance",
            "/api/attendance/summary",
            "/api/analytics/dashboard",
            "/api/analytics/forecast",
            "/api/analytics/anomalies",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
