use crate::cli::ServeArgs;
use crate::infra::{load_snapshot, AppState, DataSourceSummary, InMemorySessionRepository};
use crate::routes::with_triage_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use er_triage::config::AppConfig;
use er_triage::error::AppError;
use er_triage::telemetry;
use er_triage::triage::TriageService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let rules = config.triage.load_rules()?;
    let (snapshot, source) = load_snapshot(&config.triage)?;
    let ranking = config.triage.ranking;
    let summary = DataSourceSummary::describe(&snapshot, source, ranking);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        data: Arc::new(summary),
    };

    let snapshot = Arc::new(snapshot);
    let sessions = Arc::new(InMemorySessionRepository::default());
    let triage_service = Arc::new(TriageService::new(
        snapshot.clone(),
        snapshot,
        sessions,
        rules,
        ranking,
    ));

    let app = with_triage_routes(triage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, ?source, "emergency room triage service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
