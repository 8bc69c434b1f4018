#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use lead_capture_api::{
    app_router,
    config::AppConfig,
    db,
    repositories::{LeadRepository, LeadStore},
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Helper harness for spinning up the full router over a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as [`TestApp::new`], with a hook to adjust the config first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let mut cfg = AppConfig::new("test".to_string(), None);
        cfg.db_file = dir.path().join("leads.db").display().to_string();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        let repository = LeadRepository::new(Arc::new(pool));
        repository
            .initialize()
            .await
            .expect("failed to initialize leads table");

        let state = AppState::new(Arc::new(repository), cfg);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    /// Send a request against the router, JSON-encoding `body` when present.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Send a POST with a raw (possibly malformed) body.
    pub async fn post_raw(&self, uri: &str, content_type: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a lead through the API and returns its public id.
    pub async fn create_lead(&self, body: Value) -> String {
        let response = self.request(Method::POST, "/api/leads", Some(body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let payload = response_json(response).await;
        payload["id"]
            .as_str()
            .expect("create response carries an id")
            .to_string()
    }

    pub async fn lead_count(&self) -> u64 {
        self.state.store.count().await.expect("count failed")
    }
}

/// Reads the whole body as JSON; `Value::Null` when it is not JSON.
pub async fn response_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

pub async fn response_text(response: Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(body.to_vec()).expect("body is not utf-8")
}
