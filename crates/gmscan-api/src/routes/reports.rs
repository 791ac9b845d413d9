//! Report read routes used by the dashboard

use crate::error::ApiError;
use crate::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use gmscan_core::dashboard::{
    convar_issues, filter_issues, search_addons, search_files, AddonListing,
};
use gmscan_core::model::{Issue, Report, ScannedFile};
use gmscan_core::{generate_report, IssueFilter, Listing, ReportFormat, ReportView};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
}

#[derive(Deserialize)]
pub struct IssueQuery {
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

fn find_report(state: &AppState, id: &str) -> Result<Arc<Report>, ApiError> {
    match ReportView::resolve(state.store.get(id)) {
        ReportView::Ready(report) => Ok(report),
        ReportView::NotFound | ReportView::Loading => Err(ApiError::report_not_found()),
    }
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Arc<Report>>, ApiError> {
    find_report(&state, &id).map(Json)
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Arc<Report>>>, ApiError> {
    let requested = match query.limit.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            ApiError::bad_request(
                "Invalid limit",
                format!("expected a non-negative integer, got {:?}", raw),
            )
        })?),
    };
    let limit = state.config.report_limit(requested);
    Ok(Json(state.store.list(limit)))
}

pub async fn get_issues(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<IssueQuery>,
) -> Result<Json<Listing<Issue>>, ApiError> {
    let filter: IssueFilter = query
        .filter
        .as_deref()
        .unwrap_or("all")
        .parse()
        .map_err(|err: String| ApiError::bad_request("Invalid filter", err))?;
    let report = find_report(&state, &id)?;
    Ok(Json(filter_issues(&report.issues, filter)))
}

pub async fn get_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Listing<ScannedFile>>, ApiError> {
    let report = find_report(&state, &id)?;
    let search = query.search.unwrap_or_default();
    Ok(Json(search_files(&report.files, &search)))
}

pub async fn get_addons(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AddonListing>, ApiError> {
    let report = find_report(&state, &id)?;
    let search = query.search.unwrap_or_default();
    Ok(Json(search_addons(&report.addons, &search)))
}

pub async fn get_convars(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    let report = find_report(&state, &id)?;
    Ok(Json(convar_issues(&report.issues)))
}

pub async fn export_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format: ReportFormat = match query.format.as_deref() {
        Some(raw) => raw
            .parse()
            .map_err(|err: String| ApiError::bad_request("Invalid format", err))?,
        None => ReportFormat::default(),
    };
    let report = find_report(&state, &id)?;
    let content = generate_report(&report, format)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name(&report.report_id)),
        )
        .body(Body::from(content))
        .map_err(|err| {
            tracing::error!(error = %err, "Failed to build export response");
            ApiError::Internal("Failed to export report".to_string())
        })
}
