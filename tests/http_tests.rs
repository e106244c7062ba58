//! HTTP boundary tests
//!
//! Drive the axum router directly with `tower::ServiceExt::oneshot`; the
//! event log lives in a temp directory and balances in the in-memory store.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use revenue_ledger::cli::StrategyType;
use revenue_ledger::config::LogConfig;
use revenue_ledger::core::{BalanceStore, IngestionService, ReconciliationEngine, Reconciler};
use revenue_ledger::http::{router, AppState};
use revenue_ledger::store::MemoryBalanceStore;
use revenue_ledger::strategy::create_strategy;
use revenue_ledger::types::{Balance, BatchId, PersistenceError, UpsertOutcome};
use revenue_ledger::EventLog;
use rstest::rstest;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "secret";

struct TestApp {
    dir: TempDir,
    log_path: PathBuf,
    store: Arc<MemoryBalanceStore>,
    app: Router,
}

async fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("event_log.jsonl");
    let log = EventLog::open(&LogConfig {
        path: log_path.clone(),
        sync_on_append: false,
    })
    .await
    .unwrap();
    let store = Arc::new(MemoryBalanceStore::new());
    let app = router(AppState::new(
        IngestionService::new(Arc::new(log)),
        store.clone(),
        SECRET,
    ));

    TestApp {
        dir,
        log_path,
        store,
        app,
    }
}

fn post_event(body: &str, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/liveEvent")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("authorization", secret);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn log_contents(test: &TestApp) -> String {
    std::fs::read_to_string(&test.log_path).unwrap()
}

#[tokio::test]
async fn test_liveness() {
    let test = test_app().await;
    let (status, body) = send(&test.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello world");
}

#[tokio::test]
async fn test_valid_event_is_saved_verbatim() {
    let test = test_app().await;
    let payload = r#"{"userId": "bob", "name": "add_revenue", "value": 100}"#;

    let (status, body) = send(&test.app, post_event(payload, Some(SECRET))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Event saved.");
    assert_eq!(log_contents(&test), format!("{payload}\n"));
}

#[rstest]
#[case::missing(None)]
#[case::wrong(Some("not-the-secret"))]
#[case::bearer(Some("Bearer secret"))]
#[tokio::test]
async fn test_unauthorized(#[case] secret: Option<&str>) {
    let test = test_app().await;
    let payload = r#"{"userId":"bob","name":"add_revenue","value":1}"#;

    let (status, body) = send(&test.app, post_event(payload, secret)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Unauthorized");
    assert_eq!(log_contents(&test), "");
}

#[rstest]
#[case::invalid_name(
    r#"{"userId":"bob","name":"refund","value":1}"#,
    "Invalid event data: Invalid 'name': refund. Must be 'add_revenue' or 'subtract_revenue'."
)]
#[case::negative_value(
    r#"{"userId":"x","name":"add_revenue","value":-5}"#,
    "Invalid event data: 'value' must be non-negative, got -5."
)]
#[case::empty_user(
    r#"{"userId":" ","name":"add_revenue","value":1}"#,
    "Invalid event data: Missing or empty 'userId'."
)]
#[tokio::test]
async fn test_invalid_event_is_rejected(#[case] payload: &str, #[case] expected: &str) {
    let test = test_app().await;

    let (status, body) = send(&test.app, post_event(payload, Some(SECRET))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);
    assert_eq!(log_contents(&test), "");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let test = test_app().await;

    let (status, body) = send(&test.app, post_event("{not json", Some(SECRET))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Invalid event data: Malformed payload:"), "{body}");
    assert_eq!(log_contents(&test), "");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let test = test_app().await;
    let (status, body) = send(&test.app, get("/userEvents/nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "User not found.");
}

#[tokio::test]
async fn test_balance_lookup_is_case_insensitive() {
    let test = test_app().await;
    test.store
        .apply_delta(&BatchId::new(Uuid::nil(), 0, 1), "bob", 70)
        .await
        .unwrap();

    let (status, body) = send(&test.app, get("/userEvents/Bob")).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, serde_json::json!({"userId": "Bob", "revenue": 70}));
}

#[tokio::test]
async fn test_ingest_reconcile_query_flow() {
    let test = test_app().await;
    for payload in [
        r#"{"userId":"bob","name":"add_revenue","value":100}"#,
        r#"{"userId":"bob","name":"subtract_revenue","value":30}"#,
        r#"{"userId":"x","name":"add_revenue","value":-5}"#,
    ] {
        send(&test.app, post_event(payload, Some(SECRET))).await;
    }

    let engine = ReconciliationEngine::new(
        create_strategy(StrategyType::Sequential, None),
        Reconciler::new(test.store.clone(), 2),
        test.log_path.clone(),
        test.dir.path().join("checkpoint"),
    );
    engine.run().await.unwrap();

    let (status, body) = send(&test.app, get("/userEvents/bob")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"userId":"bob","revenue":70}"#);

    let (status, _) = send(&test.app, get("/userEvents/x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_produce_complete_lines() {
    let test = test_app().await;

    let mut tasks = Vec::new();
    for i in 0..100 {
        let app = test.app.clone();
        tasks.push(tokio::spawn(async move {
            let payload = format!(r#"{{"userId":"user-{i}","name":"add_revenue","value":{i}}}"#);
            send(&app, post_event(&payload, Some(SECRET))).await
        }));
    }
    for task in tasks {
        let (status, _) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let contents = log_contents(&test);
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 100);
    for line in lines {
        assert!(revenue_ledger::core::validate(line).is_ok(), "torn line: {line}");
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_append_failure_is_a_generic_server_error() {
    // Every write to /dev/full fails with ENOSPC
    let log = EventLog::open(&LogConfig {
        path: PathBuf::from("/dev/full"),
        sync_on_append: false,
    })
    .await
    .unwrap();
    let app = router(AppState::new(
        IngestionService::new(Arc::new(log)),
        Arc::new(MemoryBalanceStore::new()),
        SECRET,
    ));
    let payload = r#"{"userId":"bob","name":"add_revenue","value":1}"#;

    let (status, body) = send(&app, post_event(payload, Some(SECRET))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "An unexpected error occurred. Please try again later.");
}

/// Store whose reads always fail
struct UnavailableStore;

#[async_trait]
impl BalanceStore for UnavailableStore {
    async fn apply_delta(
        &self,
        _batch: &BatchId,
        _user_id: &str,
        _delta: i64,
    ) -> Result<UpsertOutcome, PersistenceError> {
        Err(PersistenceError::Database {
            message: "connection refused".to_string(),
        })
    }

    async fn get_balance(&self, _user_id: &str) -> Result<Option<Balance>, PersistenceError> {
        Err(PersistenceError::Database {
            message: "connection refused".to_string(),
        })
    }
}

#[tokio::test]
async fn test_store_failure_is_a_generic_server_error() {
    let test = test_app().await;
    let log = EventLog::open(&LogConfig {
        path: test.log_path.clone(),
        sync_on_append: false,
    })
    .await
    .unwrap();
    let app = router(AppState::new(
        IngestionService::new(Arc::new(log)),
        Arc::new(UnavailableStore),
        SECRET,
    ));

    let (status, body) = send(&app, get("/userEvents/bob")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "An unexpected error occurred. Please try again later.");
}
