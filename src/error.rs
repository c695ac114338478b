use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Failure taxonomy shared by the pipeline and the HTTP layer.
///
/// "Not enough data" is deliberately absent: forecast and anomaly detection
/// report it through [`crate::model::analytics::Analysis`] as a normal outcome.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum PayrollError {
    #[display(fmt = "invalid {}: {}", field, message)]
    Validation {
        field: &'static str,
        message: String,
    },

    #[display(fmt = "{} not found: {}", entity, key)]
    NotFound { entity: &'static str, key: String },

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{} exceeded its {} ms budget", operation, budget_ms)]
    Timeout {
        operation: &'static str,
        budget_ms: u64,
    },

    #[display(fmt = "upstream failure: {}", _0)]
    Upstream(String),
}

impl std::error::Error for PayrollError {}

impl PayrollError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        PayrollError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        PayrollError::NotFound {
            entity,
            key: key.into(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PayrollError::Validation { .. } => "validation_error",
            PayrollError::NotFound { .. } => "not_found",
            PayrollError::Conflict(_) => "conflict",
            PayrollError::Timeout { .. } => "timeout",
            PayrollError::Upstream(_) => "upstream_error",
        }
    }
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Validation { .. } => StatusCode::BAD_REQUEST,
            PayrollError::NotFound { .. } => StatusCode::NOT_FOUND,
            PayrollError::Conflict(_) => StatusCode::CONFLICT,
            PayrollError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PayrollError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });

        match self {
            PayrollError::Validation { field, .. } => body["field"] = json!(field),
            PayrollError::NotFound { key, .. } => body["key"] = json!(key),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
