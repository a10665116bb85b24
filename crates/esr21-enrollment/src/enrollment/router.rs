use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ConsentRecorded, IllnessReported, ScheduleName, SubjectIdentifier};
use super::repository::{EnrollmentStore, StoreError};
use super::schedule::ScheduleDefinitionProvider;
use super::service::{EnrollmentError, EnrollmentService};

/// Off-schedule notification posted by the episode resolution collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct OffScheduleRequest {
    pub subject_identifier: SubjectIdentifier,
    pub schedule_name: ScheduleName,
    pub offschedule_datetime: DateTime<Utc>,
}

/// Router builder exposing the enrollment event handlers over HTTP.
pub fn enrollment_router<P, S>(service: Arc<EnrollmentService<P, S>>) -> Router
where
    P: ScheduleDefinitionProvider + 'static,
    S: EnrollmentStore + 'static,
{
    Router::new()
        .route("/api/v1/consents", post(consent_handler::<P, S>))
        .route("/api/v1/illness-reports", post(illness_handler::<P, S>))
        .route("/api/v1/off-schedule", post(off_schedule_handler::<P, S>))
        .route(
            "/api/v1/subjects/:subject_identifier",
            get(subject_handler::<P, S>),
        )
        .with_state(service)
}

pub(crate) async fn consent_handler<P, S>(
    State(service): State<Arc<EnrollmentService<P, S>>>,
    axum::Json(event): axum::Json<ConsentRecorded>,
) -> Response
where
    P: ScheduleDefinitionProvider + 'static,
    S: EnrollmentStore + 'static,
{
    match service.on_consent_recorded(&event) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn illness_handler<P, S>(
    State(service): State<Arc<EnrollmentService<P, S>>>,
    axum::Json(event): axum::Json<IllnessReported>,
) -> Response
where
    P: ScheduleDefinitionProvider + 'static,
    S: EnrollmentStore + 'static,
{
    match service.on_illness_reported(&event) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn off_schedule_handler<P, S>(
    State(service): State<Arc<EnrollmentService<P, S>>>,
    axum::Json(request): axum::Json<OffScheduleRequest>,
) -> Response
where
    P: ScheduleDefinitionProvider + 'static,
    S: EnrollmentStore + 'static,
{
    match service.take_off_schedule(
        &request.subject_identifier,
        &request.schedule_name,
        request.offschedule_datetime,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn subject_handler<P, S>(
    State(service): State<Arc<EnrollmentService<P, S>>>,
    Path(subject_identifier): Path<String>,
) -> Response
where
    P: ScheduleDefinitionProvider + 'static,
    S: EnrollmentStore + 'static,
{
    let subject = SubjectIdentifier(subject_identifier);
    match service.subject_status(&subject) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) fn status_for(error: &EnrollmentError) -> StatusCode {
    match error {
        EnrollmentError::UnknownSchedule(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EnrollmentError::NotEnrolled(_)
        | EnrollmentError::Store(StoreError::DuplicateActive { .. }) => StatusCode::CONFLICT,
        EnrollmentError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        EnrollmentError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: &EnrollmentError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(error), axum::Json(payload)).into_response()
}
