//! GMod Scan Core
//!
//! Turns scan payloads uploaded by the in-game scanner script into stored
//! reports, and correlates live dashboard sessions with the reports their
//! scans eventually produce.

pub mod aggregate;
pub mod dashboard;
pub mod ingest;
pub mod model;
pub mod report;
pub mod scanner;
pub mod session;
pub mod store;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub use aggregate::{aggregate, categorize, ReportSummary};
pub use dashboard::{IssueFilter, Listing, ReportView};
pub use ingest::{CompleteRequest, IssueChunk};
pub use model::{
    Addon, CategoryCounts, Exploit, Issue, IssueCategory, PerformanceProfile, ProfileEntry,
    Report, ScanPayload, ScannedFile,
};
pub use report::{generate_report, ReportFormat};
pub use session::{Delivery, PendingScan, ScanCompleted, SessionEvent, SessionTable};
pub use store::ReportStore;
pub use validation::ValidationError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Severity assigned to an issue or exploit by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Performance,
    Warning,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Performance,
        Severity::Warning,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Performance => "performance",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or_else(|| {
                format!("expected one of critical, performance, warning, info, got {:?}", s)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert!("Critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::Performance).unwrap();
        assert_eq!(json, "\"performance\"");
    }

    #[test]
    fn test_validation_error_converts() {
        let err: CoreError = ValidationError::new("serverIp", "is required").into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: serverIp: is required");
    }
}
