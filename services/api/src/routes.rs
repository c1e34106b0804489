use crate::infra::{AppState, DataSourceSummary};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use er_triage::triage::{
    triage_router, HospitalDirectoryProvider, LiveBedFeedProvider, SessionRepository,
    TriageService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_triage_routes<D, F, S>(service: Arc<TriageService<D, F, S>>) -> axum::Router
where
    D: HospitalDirectoryProvider + 'static,
    F: LiveBedFeedProvider + 'static,
    S: SessionRepository + 'static,
{
    triage_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/triage/data-source",
            axum::routing::get(data_source_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Which hospital data the rankings are computed from.
pub(crate) async fn data_source_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<DataSourceSummary> {
    Json(state.data.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{demo_snapshot, DataSource};
    use er_triage::triage::RankingConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn state(ready: bool) -> AppState {
        let snapshot = demo_snapshot().expect("demo data parses");
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            data: Arc::new(DataSourceSummary::describe(
                &snapshot,
                DataSource::Demo,
                RankingConfig::default(),
            )),
        }
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let pending = state(false);
        let response = readiness_endpoint(Extension(pending.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        pending.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(pending)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn data_source_reports_demo_district() {
        let Json(summary) = data_source_endpoint(Extension(state(true))).await;

        assert_eq!(summary.source, DataSource::Demo);
        assert_eq!(summary.hospitals, 7);
        assert_eq!(summary.ranking.top_n, 3);
        assert!(summary.regions.iter().any(|region| region.contains("Buk-gu")));
    }

    #[tokio::test]
    async fn healthcheck_is_static() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }
}
