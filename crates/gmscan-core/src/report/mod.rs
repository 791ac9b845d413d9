//! Report exports

pub mod json;
pub mod markdown;
pub mod text;

use crate::model::Report;
use crate::CoreResult;
use std::str::FromStr;

/// Report export format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text/plain; charset=utf-8",
            ReportFormat::Markdown => "text/markdown; charset=utf-8",
            ReportFormat::Json => "application/json",
        }
    }

    /// Download name used by the dashboard export button
    pub fn file_name(&self, report_id: &str) -> String {
        format!("gmod-scan-report-{}.{}", report_id, self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "unknown format {:?}, expected text, markdown or json",
                other
            )),
        }
    }
}

/// Generate report in specified format
pub fn generate_report(report: &Report, format: ReportFormat) -> CoreResult<String> {
    match format {
        ReportFormat::Json => json::generate(report),
        ReportFormat::Markdown => Ok(markdown::generate(report)),
        ReportFormat::Text => Ok(text::generate(report)),
    }
}
