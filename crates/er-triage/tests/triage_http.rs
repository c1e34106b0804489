//! HTTP contract for the triage router: session creation, ranking requests,
//! call tracking and error status mapping.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use er_triage::triage::{
        triage_router, HospitalSnapshot, RankingConfig, RepositoryError, SessionId,
        SessionRepository, SymptomRuleTable, TriageService, TriageSession,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub(super) const DIRECTORY: &str = "\
id,name,address,phone,latitude,longitude,region_primary,region_secondary
H1,Riverside Medical Center,Gwangju Buk-gu 1,062-111-1111,35.027,127.0,Gwangju,Buk-gu
H2,Hilltop Clinic,Gwangju Buk-gu 2,062-222-2222,35.009,127.0,Gwangju,Buk-gu
";

    pub(super) const FEED: &str = "\
hpid,hvidate,hvctayn,hvicc,hvec
H1,20240305101500,Y,2,4
H2,20240305101500,N,0,1
";

    #[derive(Default)]
    struct MemorySessions {
        sessions: Mutex<HashMap<SessionId, TriageSession>>,
    }

    impl SessionRepository for MemorySessions {
        fn insert(&self, session: TriageSession) -> Result<TriageSession, RepositoryError> {
            let mut guard = self.sessions.lock().expect("session mutex poisoned");
            if guard.contains_key(session.id()) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(session.id().clone(), session.clone());
            Ok(session)
        }

        fn modify<R>(
            &self,
            id: &SessionId,
            apply: impl FnOnce(&mut TriageSession) -> R,
        ) -> Result<R, RepositoryError> {
            let mut guard = self.sessions.lock().expect("session mutex poisoned");
            let session = guard
                .get_mut(id)
                .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
            Ok(apply(session))
        }

        fn fetch(&self, id: &SessionId) -> Result<Option<TriageSession>, RepositoryError> {
            let guard = self.sessions.lock().expect("session mutex poisoned");
            Ok(guard.get(id).cloned())
        }
    }

    pub(super) fn app() -> Router {
        let snapshot = HospitalSnapshot::from_readers(DIRECTORY.as_bytes(), Some(FEED.as_bytes()))
            .expect("fixture snapshot parses");
        let snapshot = Arc::new(snapshot);
        let service = TriageService::new(
            snapshot.clone(),
            snapshot,
            Arc::new(MemorySessions::default()),
            SymptomRuleTable::standard(),
            RankingConfig::default(),
        );
        triage_router(Arc::new(service))
    }

    pub(super) async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = app.clone().oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub(super) async fn open_session(app: &Router) -> String {
        let (status, body) = send(app, Method::POST, "/api/v1/triage/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"]
            .as_str()
            .expect("session id is a string")
            .to_string()
    }

    pub(super) fn stroke_body() -> Value {
        serde_json::json!({
            "symptom": "stroke",
            "location": { "latitude": 35.0, "longitude": 127.0 },
            "region": { "primary": "Gwangju", "secondary": "Buk-gu" }
        })
    }
}

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn lists_symptom_checklists() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/triage/symptoms", None).await;

    assert_eq!(status, StatusCode::OK);
    let symptoms = body.as_array().expect("array of symptoms");
    assert_eq!(symptoms.len(), 6);
    assert_eq!(symptoms[0]["category"], "stroke");
    assert_eq!(symptoms[0]["checklist"]["required_equipment"], json!(["CT"]));
    assert_eq!(symptoms[0]["checklist"]["required_beds"], json!(["General ICU"]));
}

#[tokio::test]
async fn recommendation_then_refusal_reports_exhausted_pool() {
    let app = app();
    let session = open_session(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/recommendations"),
        Some(stroke_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ordered = body["outcome"]["ordered"].as_array().expect("ordered list");
    assert_eq!(ordered.len(), 2);
    assert_eq!(ordered[0]["record"]["id"], "H1");
    assert_eq!(ordered[1]["placement"], "padding");
    assert!(body["handoff"]
        .as_str()
        .expect("handoff text")
        .contains("Riverside Medical Center"));

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/candidates/H1/call"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/candidates/H1/outcome"),
        Some(json!({ "outcome": "refused" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "rejected");
    assert_eq!(report["backfill"]["kind"], "pool_exhausted");
    assert_eq!(report["backfill"]["slot"], 0);

    let (status, snapshot) = send(
        &app,
        Method::GET,
        &format!("/api/v1/triage/sessions/{session}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["rejected"], json!(["H1"]));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/triage/sessions/triage-does-not-exist",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn outcome_without_call_conflicts() {
    let app = app();
    let session = open_session(&app).await;
    send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/recommendations"),
        Some(stroke_body()),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/candidates/H1/outcome"),
        Some(json!({ "outcome": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/candidates/H9/call"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_symptom_is_bad_request() {
    let app = app();
    let session = open_session(&app).await;
    let mut body = stroke_body();
    body["symptom"] = json!("hiccups");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/recommendations"),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_location_is_bad_request() {
    let app = app();
    let session = open_session(&app).await;
    let mut body = stroke_body();
    body["location"] = json!({ "latitude": 999.0, "longitude": 127.0 });

    let (status, error) = send(
        &app,
        Method::POST,
        &format!("/api/v1/triage/sessions/{session}/recommendations"),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]
        .as_str()
        .expect("error message")
        .contains("latitude/longitude"));
}
