//! GMod Scan API Server

use gmscan_api::{build_router, spawn_session_sweeper, AppConfig, AppState};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "gmscan_api=debug,gmscan_core=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting GMod Scan API Server");

    let config = AppConfig::from_env();
    if let Some(base_url) = &config.base_url {
        if let Err(err) = config.public_endpoint(None) {
            error!(base_url = %base_url, error = %err, "BASE_URL is not usable in scanner URLs");
            std::process::exit(1);
        }
    }
    let addr = config.bind_addr.clone();

    // Create shared state
    let state = Arc::new(AppState::new(config));
    spawn_session_sweeper(Arc::clone(&state));

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %addr, error = %err, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}
