//! JSON report generation

use crate::model::Report;
use crate::CoreResult;

pub fn generate(report: &Report) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
