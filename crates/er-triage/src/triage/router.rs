use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::HospitalId;
use super::lifecycle::{CallOutcome, SessionId};
use super::providers::{HospitalDirectoryProvider, LiveBedFeedProvider};
use super::repository::SessionRepository;
use super::rules::{FacilityChecklist, SymptomCategory};
use super::service::{TriageRequest, TriageService};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct SymptomView {
    pub category: SymptomCategory,
    pub label: String,
    pub summary: String,
    pub checklist: FacilityChecklist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeRequest {
    pub outcome: CallOutcome,
}

/// Router builder exposing symptom, session and candidate endpoints.
pub fn triage_router<D, F, S>(service: Arc<TriageService<D, F, S>>) -> Router
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/triage/symptoms", get(symptoms_handler::<D, F, S>))
        .route("/api/v1/triage/sessions", post(open_session_handler::<D, F, S>))
        .route(
            "/api/v1/triage/sessions/:session_id",
            get(session_handler::<D, F, S>),
        )
        .route(
            "/api/v1/triage/sessions/:session_id/recommendations",
            post(recommend_handler::<D, F, S>),
        )
        .route(
            "/api/v1/triage/sessions/:session_id/candidates/:hospital_id/call",
            post(call_handler::<D, F, S>),
        )
        .route(
            "/api/v1/triage/sessions/:session_id/candidates/:hospital_id/outcome",
            post(outcome_handler::<D, F, S>),
        )
        .with_state(service)
}

pub(crate) async fn symptoms_handler<D, F, S>(
    State(service): State<Arc<TriageService<D, F, S>>>,
) -> Json<Vec<SymptomView>>
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    let views = service
        .rules()
        .rules()
        .iter()
        .map(|rule| SymptomView {
            category: rule.category.clone(),
            label: rule.label.clone(),
            summary: rule.summary.clone(),
            checklist: rule.checklist(),
        })
        .collect();
    Json(views)
}

pub(crate) async fn open_session_handler<D, F, S>(
    State(service): State<Arc<TriageService<D, F, S>>>,
) -> Response
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    match service.open_session() {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn session_handler<D, F, S>(
    State(service): State<Arc<TriageService<D, F, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    match service.session(&SessionId(session_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn recommend_handler<D, F, S>(
    State(service): State<Arc<TriageService<D, F, S>>>,
    Path(session_id): Path<String>,
    Json(request): Json<TriageRequest>,
) -> Response
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    match service.recommend(&SessionId(session_id), &request) {
        Ok(recommendation) => (StatusCode::OK, Json(recommendation)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn call_handler<D, F, S>(
    State(service): State<Arc<TriageService<D, F, S>>>,
    Path((session_id, hospital_id)): Path<(String, String)>,
) -> Response
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    match service.begin_call(&SessionId(session_id), &HospitalId(hospital_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn outcome_handler<D, F, S>(
    State(service): State<Arc<TriageService<D, F, S>>>,
    Path((session_id, hospital_id)): Path<(String, String)>,
    Json(request): Json<OutcomeRequest>,
) -> Response
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    match service.record_outcome(
        &SessionId(session_id),
        &HospitalId(hospital_id),
        request.outcome,
    ) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
