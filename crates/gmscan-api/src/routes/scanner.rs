//! Scanner distribution routes

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use gmscan_core::scanner::{self, PublicEndpoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct ConsoleCommandQuery {
    #[serde(rename = "serverIp")]
    pub server_ip: Option<String>,
}

#[derive(Deserialize)]
pub struct ScannerCodeQuery {
    pub scan: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleCommandResponse {
    pub command: String,
    pub scan_id: String,
}

fn endpoint(state: &AppState, headers: &HeaderMap) -> Result<PublicEndpoint, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    state
        .config
        .public_endpoint(host)
        .map_err(|err| ApiError::bad_request("Invalid base URL", err.to_string()))
}

pub async fn console_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ConsoleCommandQuery>,
) -> Result<Json<ConsoleCommandResponse>, ApiError> {
    let endpoint = endpoint(&state, &headers)?;
    let scan_id = scanner::new_scan_id();
    let command = scanner::console_command(&endpoint, &scan_id)
        .map_err(|err| ApiError::bad_request("Invalid scan id", err.to_string()))?;

    info!(
        scan_id = %scan_id,
        server_ip = query.server_ip.as_deref().unwrap_or("-"),
        "Console command issued"
    );

    Ok(Json(ConsoleCommandResponse { command, scan_id }))
}

pub async fn scanner_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ScannerCodeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let endpoint = endpoint(&state, &headers)?;
    let scan_id = query
        .scan
        .filter(|scan| !scan.is_empty())
        .unwrap_or_else(scanner::new_scan_id);
    let code = scanner::render_scanner_code(&endpoint, &scan_id)
        .map_err(|err| ApiError::bad_request("Invalid scan id", err.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], code))
}
