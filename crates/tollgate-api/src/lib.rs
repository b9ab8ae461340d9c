//! Tollgate API - HTTP surface of the quota engine
//!
//! JSON over axum:
//!
//! ```text
//!   POST /v1/subscribers/:id/features/:feature/attempt   admit one use
//!   GET  /v1/subscribers/:id/features/:feature/status    one feature
//!   GET  /v1/subscribers/:id/status                      whole catalog
//!   GET  /v1/events/exceeded                             recent rejections
//!   POST /v1/admin/policy/reload                         hot-swap policy
//!   GET  /v1/admin/metrics                               engine counters
//!   GET  /health
//! ```
//!
//! A rejected attempt is a 200 with `allowed = false`; only configuration
//! and storage faults become error statuses.

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tollgate_engine::AdmissionEngine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod events;
pub mod routes;

pub use config::{ServiceConfig, SubscriberSeed};
pub use error::ApiError;
pub use events::{spawn_event_collector, EventLog};

/// Shared service state
#[derive(Clone)]
pub struct AppState {
    /// The admission engine
    pub engine: Arc<AdmissionEngine>,
    /// Recent quota-exceeded events for polling UIs
    pub events: Arc<EventLog>,
    /// Policy file re-read by the reload endpoint
    pub policy_path: PathBuf,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(routes::health))
        // Admission
        .route(
            "/v1/subscribers/:id/features/:feature/attempt",
            post(routes::attempt),
        )
        .route(
            "/v1/subscribers/:id/features/:feature/status",
            get(routes::feature_status),
        )
        .route("/v1/subscribers/:id/status", get(routes::subscriber_status))
        // Events
        .route("/v1/events/exceeded", get(routes::exceeded_events))
        // Admin
        .route("/v1/admin/policy/reload", post(routes::reload_policy))
        .route("/v1/admin/metrics", get(routes::metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
