//! Scan ingestion routes

use crate::error::ApiError;
use crate::extract::ScanBody;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use gmscan_core::ingest::{parse_complete_request, parse_issue_chunk, parse_scan_payload};
use gmscan_core::{aggregate, ScanCompleted};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Deserialize)]
pub struct AnalyzeQuery {
    /// Live session waiting on this submission
    pub scan: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCreatedResponse {
    pub message: String,
    pub report_id: String,
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub message: String,
    pub scan_id: String,
    pub current_chunk: u64,
    pub total_chunks: u64,
    /// Issues accumulated for the scan so far
    pub received: usize,
}

fn created(report_id: &str, url: String) -> (StatusCode, Json<ReportCreatedResponse>) {
    (
        StatusCode::CREATED,
        Json(ReportCreatedResponse {
            message: "Report created successfully".to_string(),
            report_id: report_id.to_string(),
            url,
        }),
    )
}

/// Full submission in a single request
pub async fn submit_scan(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyzeQuery>,
    ScanBody(body): ScanBody,
) -> Result<(StatusCode, Json<ReportCreatedResponse>), ApiError> {
    let payload = parse_scan_payload(&body)?;
    let report = aggregate(&state.store, payload)?;

    if let Some(scan_id) = query.scan.filter(|scan| !scan.is_empty()) {
        let delivery = state.sessions.publish(ScanCompleted {
            scan_id: scan_id.clone(),
            report_id: report.report_id.clone(),
        });
        debug!(scan_id = %scan_id, report_id = %report.report_id, ?delivery, "Completion published");
    }

    Ok(created(&report.report_id, report.url()))
}

/// One chunk of a chunked issue upload
pub async fn upload_issues(
    State(state): State<Arc<AppState>>,
    ScanBody(body): ScanBody,
) -> Result<Json<ChunkResponse>, ApiError> {
    let chunk = parse_issue_chunk(&body)?;
    let received = state.sessions.append_chunk(&chunk.scan_id, chunk.issues);

    info!(
        scan_id = %chunk.scan_id,
        current = chunk.current_chunk,
        total = chunk.total_chunks,
        received,
        "Received issue chunk"
    );

    Ok(Json(ChunkResponse {
        message: "Chunk received".to_string(),
        scan_id: chunk.scan_id,
        current_chunk: chunk.current_chunk,
        total_chunks: chunk.total_chunks,
        received,
    }))
}

/// Finish a chunked upload and build its report
pub async fn complete_scan(
    State(state): State<Arc<AppState>>,
    ScanBody(body): ScanBody,
) -> Result<(StatusCode, Json<ReportCreatedResponse>), ApiError> {
    let request = parse_complete_request(&body)?;
    let mut pending = state
        .sessions
        .take(&request.scan_id)
        .ok_or_else(|| ApiError::NotFound("Scan not found".to_string()))?;

    let issues = std::mem::take(&mut pending.issues);
    let report = aggregate(&state.store, request.into_payload(issues)).map_err(|err| {
        warn!(
            scan_id = %pending.scan_id,
            chunks = pending.chunks,
            error = %err,
            "Scan session dropped, report could not be created"
        );
        err
    })?;

    let scan_id = pending.scan_id.clone();
    let delivery = pending.notify(&report.report_id);
    debug!(scan_id = %scan_id, report_id = %report.report_id, ?delivery, "Completion published");

    Ok(created(&report.report_id, report.url()))
}
