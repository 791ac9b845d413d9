//! GMod Scan API
//!
//! Ingests scanner uploads, serves stored reports to the dashboard and
//! pushes completion events to dashboards waiting on a live scan.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use gmscan_core::{ReportStore, SessionTable};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub use config::AppConfig;
pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    pub store: ReportStore,
    pub sessions: SessionTable,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            store: ReportStore::new(),
            sessions: SessionTable::new(config.session_ttl),
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        // Health check
        .route("/health", get(routes::health_check))

        // Ingestion
        .route("/api/analyze", post(routes::analyze::submit_scan))
        .route("/api/analyze/issues", post(routes::analyze::upload_issues))
        .route("/api/analyze/complete", post(routes::analyze::complete_scan))

        // Reports
        .route("/api/reports", get(routes::reports::list_reports))
        .route("/api/reports/:id", get(routes::reports::get_report))
        .route("/api/reports/:id/issues", get(routes::reports::get_issues))
        .route("/api/reports/:id/files", get(routes::reports::get_files))
        .route("/api/reports/:id/addons", get(routes::reports::get_addons))
        .route("/api/reports/:id/convars", get(routes::reports::get_convars))
        .route("/api/reports/:id/export", get(routes::reports::export_report))

        // Scanner distribution
        .route("/api/console-command", get(routes::scanner::console_command))
        .route("/api/scanner-code", get(routes::scanner::scanner_code))

        // Live sessions
        .route("/ws", get(routes::ws::ws_handler))

        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))

        // CORS
        .layer(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any))

        // Tracing
        .layer(TraceLayer::new_for_http())

        // State
        .with_state(state)
}

/// Periodically drop expired live sessions, closing their sockets
pub fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.sweep_interval.max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let expired = state.sessions.sweep();
            if !expired.is_empty() {
                debug!(count = expired.len(), ?expired, "Expired scan sessions dropped");
            }
        }
    })
}
