use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::triage::lifecycle::LifecycleError;
use crate::triage::repository::RepositoryError;
use crate::triage::rules::RuleTableError;
use crate::triage::service::TriageServiceError;
use crate::triage::snapshot::SnapshotImportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Rules(RuleTableError),
    Snapshot(SnapshotImportError),
    Triage(TriageServiceError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Triage(err) => triage_status(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Rules(_)
            | AppError::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn triage_status(err: &TriageServiceError) -> StatusCode {
    match err {
        TriageServiceError::InvalidLocation
        | TriageServiceError::RegionUnresolved
        | TriageServiceError::Rules(_) => StatusCode::BAD_REQUEST,
        TriageServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
        TriageServiceError::Lifecycle(LifecycleError::UnknownHospital(_)) => StatusCode::NOT_FOUND,
        TriageServiceError::Lifecycle(_) => StatusCode::CONFLICT,
        TriageServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        TriageServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TriageServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Rules(err) => write!(f, "rule table error: {}", err),
            AppError::Snapshot(err) => write!(f, "snapshot error: {}", err),
            AppError::Triage(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Rules(err) => Some(err),
            AppError::Snapshot(err) => Some(err),
            AppError::Triage(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RuleTableError> for AppError {
    fn from(value: RuleTableError) -> Self {
        Self::Rules(value)
    }
}

impl From<SnapshotImportError> for AppError {
    fn from(value: SnapshotImportError) -> Self {
        Self::Snapshot(value)
    }
}

impl From<TriageServiceError> for AppError {
    fn from(value: TriageServiceError) -> Self {
        Self::Triage(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::domain::HospitalId;
    use crate::triage::lifecycle::{CandidateStatus, SessionId};
    use crate::triage::providers::ProviderError;
    use crate::triage::rules::SymptomCategory;

    #[test]
    fn maps_triage_errors_to_http_statuses() {
        let cases = [
            (
                TriageServiceError::Rules(RuleTableError::UnknownSymptom(SymptomCategory::new("x"))),
                StatusCode::BAD_REQUEST,
            ),
            (TriageServiceError::RegionUnresolved, StatusCode::BAD_REQUEST),
            (TriageServiceError::InvalidLocation, StatusCode::BAD_REQUEST),
            (
                TriageServiceError::Repository(RepositoryError::NotFound(SessionId::new("s"))),
                StatusCode::NOT_FOUND,
            ),
            (
                TriageServiceError::Lifecycle(LifecycleError::InvalidTransition {
                    hospital_id: HospitalId::new("H1"),
                    from: CandidateStatus::Pending,
                    to: CandidateStatus::Approved,
                }),
                StatusCode::CONFLICT,
            ),
            (
                TriageServiceError::Provider(ProviderError::Unavailable {
                    provider: "directory",
                    reason: "timeout".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let err = AppError::from(ConfigError::InvalidTopN);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("configuration error"));
    }
}
