//! Lead Capture API Library
//!
//! HTTP service that stores sales leads in SQLite or Postgres and exposes
//! them for review.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod ids;
pub mod middleware_helpers;
pub mod openapi;
pub mod repositories;
pub mod tracing;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};

use crate::errors::ServiceError;
use crate::repositories::LeadStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LeadStore>,
    pub config: config::AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn LeadStore>, config: config::AppConfig) -> Self {
        Self { store, config }
    }
}

/// Explicit origins when configured, otherwise any origin
fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        ::tracing::debug!("No CORS origins configured; allowing any origin");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn route_not_found() -> ServiceError {
    ServiceError::NotFound("Route not found".to_string())
}

/// Lead routes, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    use crate::handlers::leads;

    Router::new()
        .route("/leads", get(leads::list_leads).post(leads::create_lead))
        .route("/leads/:id", get(leads::get_lead).delete(leads::delete_lead))
        .route("/stats", get(leads::lead_stats))
}

/// Full application router with probes, API, docs and middleware stack
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.max_body_size;

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api", api_routes())
        .fallback(route_not_found)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(body_limit))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
