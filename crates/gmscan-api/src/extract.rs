//! Scan body extractor
//!
//! Lua's `http.Post` sends form-encoded string parameters while other
//! clients send JSON. Both arrive here as one JSON value.

use crate::error::ApiError;
use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use axum::{Form, Json};
use gmscan_core::ingest::lift_form;
use serde_json::Value;

pub struct ScanBody(pub Value);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for ScanBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request("Invalid scan data", rejection.body_text()))?;
            Ok(ScanBody(lift_form(pairs)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request("Invalid scan data", rejection.body_text()))?;
            Ok(ScanBody(value))
        }
    }
}
