use crate::config::ConfigError;
use crate::enrollment::router::status_for;
use crate::enrollment::EnrollmentError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Enrollment(err) => status_for(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::{StoreError, SubjectIdentifier};

    #[test]
    fn enrollment_errors_keep_their_http_status() {
        let response = AppError::from(EnrollmentError::NotEnrolled(SubjectIdentifier(
            "S-100".to_string(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::from(EnrollmentError::Store(StoreError::Unavailable(
            "offline".to_string(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn config_errors_map_to_internal_error() {
        let response = AppError::from(ConfigError::InvalidPort).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
