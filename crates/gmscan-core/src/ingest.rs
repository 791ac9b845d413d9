//! Request bodies accepted by the ingestion endpoints
//!
//! The scanner posts with Lua's `http.Post`, which sends form-encoded string
//! parameters, while other clients send JSON. Both are lifted into a JSON
//! object before the same validation runs.

use crate::model::{Issue, ScanPayload};
use crate::scanner::is_valid_token;
use crate::validation::{
    parse_addon, parse_exploit, parse_file, parse_issue, parse_profile, Fields, ValidationError,
    ValidationResult,
};
use serde_json::{Map, Value};

/// Lift form-encoded pairs into a JSON object of strings. A repeated key
/// keeps its last value.
pub fn lift_form<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let obj: Map<String, Value> = pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Value::Object(obj)
}

/// Validate a full scan submission
pub fn parse_scan_payload(body: &Value) -> ValidationResult<ScanPayload> {
    let f = Fields::new(body, "")?;
    Ok(ScanPayload {
        server_ip: f.string("serverIp")?,
        gmod_version: f.string("gmodVersion")?,
        issues: f.list("issues", false, parse_issue)?,
        exploits: f.list("exploits", false, parse_exploit)?,
        files: f.list("files", false, parse_file)?,
        addons: f.list("addons", false, parse_addon)?,
        performance: f.optional_object("performance", parse_profile)?,
    })
}

/// One slice of a chunked issue upload
#[derive(Debug, Clone, PartialEq)]
pub struct IssueChunk {
    pub scan_id: String,
    pub total_chunks: u64,
    /// 1-based
    pub current_chunk: u64,
    pub issues: Vec<Issue>,
}

pub fn parse_issue_chunk(body: &Value) -> ValidationResult<IssueChunk> {
    let f = Fields::new(body, "")?;
    let scan_id = parse_scan_id(&f)?;
    let total_chunks = f.unsigned_text("totalChunks", 1)?;
    let current_chunk = f.unsigned_text("currentChunk", 1)?;
    if current_chunk > total_chunks {
        return Err(ValidationError::new(
            "currentChunk",
            format!("must not exceed totalChunks ({}), got {}", total_chunks, current_chunk),
        ));
    }
    let issues = f.list("data", true, parse_issue)?;

    Ok(IssueChunk {
        scan_id,
        total_chunks,
        current_chunk,
        issues,
    })
}

/// Finalisation of a chunked upload. Files, addons and exploits are optional
/// and default to empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteRequest {
    pub scan_id: String,
    pub payload: ScanPayload,
}

impl CompleteRequest {
    /// Payload with the accumulated chunk issues in arrival order
    pub fn into_payload(self, issues: Vec<Issue>) -> ScanPayload {
        ScanPayload {
            issues,
            ..self.payload
        }
    }
}

pub fn parse_complete_request(body: &Value) -> ValidationResult<CompleteRequest> {
    let f = Fields::new(body, "")?;
    let scan_id = parse_scan_id(&f)?;
    let payload = ScanPayload {
        server_ip: f.string("serverIp")?,
        gmod_version: f.string("gmodVersion")?,
        issues: Vec::new(),
        exploits: f.list("exploits", false, parse_exploit)?,
        files: f.list("files", false, parse_file)?,
        addons: f.list("addons", false, parse_addon)?,
        performance: f.optional_object("performance", parse_profile)?,
    };
    Ok(CompleteRequest { scan_id, payload })
}

fn parse_scan_id(f: &Fields<'_>) -> ValidationResult<String> {
    let scan_id = f.string("scanId")?;
    if !is_valid_token(&scan_id) {
        return Err(ValidationError::new(
            f.path("scanId"),
            "must be 1-64 characters of A-Z, a-z, 0-9, '_' or '-'",
        ));
    }
    Ok(scan_id)
}
