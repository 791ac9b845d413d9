//! Scan payload and report types
//!
//! Field names follow the camelCase JSON produced by the scanner script and
//! consumed by the dashboard.

use crate::aggregate::ReportSummary;
use crate::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One deduplicated finding from the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Matches sharing `(file_path, line_number, title)`, counted by the scanner
    pub occurrences: u32,
    pub file_path: String,
    pub line_number: u32,
    pub code: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

/// A security finding. Older scanners send `name`/`path` instead of
/// `title`/`filePath`; the validator maps those onto this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exploit {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    pub code: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: String,
    /// Owning addon directory, "unknown" when unresolved
    pub addon: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub issues: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addon {
    pub name: String,
    pub files: u32,
    pub issues: u32,
}

/// One row of the in-game profiler capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub func: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: String,
    pub total_called: u64,
    pub total_time: f64,
    pub average_time: f64,
    pub line_defined: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_last: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_c_func: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub most_time: Vec<ProfileEntry>,
    pub most_called: Vec<ProfileEntry>,
    pub most_avg_time: Vec<ProfileEntry>,
    pub scan_duration: f64,
    pub timestamp: String,
}

/// A validated scan submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    pub server_ip: String,
    pub gmod_version: String,
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub exploits: Vec<Exploit>,
    pub files: Vec<ScannedFile>,
    pub addons: Vec<Addon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceProfile>,
}

impl ScanPayload {
    pub fn new(server_ip: impl Into<String>, gmod_version: impl Into<String>) -> Self {
        Self {
            server_ip: server_ip.into(),
            gmod_version: gmod_version.into(),
            issues: Vec::new(),
            exploits: Vec::new(),
            files: Vec::new(),
            addons: Vec::new(),
            performance: None,
        }
    }
}

/// Category buckets shown in the dashboard chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Performance,
    Memory,
    Security,
    Networking,
    Hooks,
    Rendering,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::Performance => write!(f, "performance"),
            IssueCategory::Memory => write!(f, "memory"),
            IssueCategory::Security => write!(f, "security"),
            IssueCategory::Networking => write!(f, "networking"),
            IssueCategory::Hooks => write!(f, "hooks"),
            IssueCategory::Rendering => write!(f, "rendering"),
        }
    }
}

/// Per-category counters; every key is always present in the JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub performance: u32,
    pub memory: u32,
    pub security: u32,
    pub networking: u32,
    pub hooks: u32,
    pub rendering: u32,
}

impl CategoryCounts {
    pub fn increment(&mut self, category: IssueCategory) {
        *self.slot(category) += 1;
    }

    pub fn get(&self, category: IssueCategory) -> u32 {
        match category {
            IssueCategory::Performance => self.performance,
            IssueCategory::Memory => self.memory,
            IssueCategory::Security => self.security,
            IssueCategory::Networking => self.networking,
            IssueCategory::Hooks => self.hooks,
            IssueCategory::Rendering => self.rendering,
        }
    }

    pub fn total(&self) -> u32 {
        self.performance + self.memory + self.security + self.networking + self.hooks + self.rendering
    }

    fn slot(&mut self, category: IssueCategory) -> &mut u32 {
        match category {
            IssueCategory::Performance => &mut self.performance,
            IssueCategory::Memory => &mut self.memory,
            IssueCategory::Security => &mut self.security,
            IssueCategory::Networking => &mut self.networking,
            IssueCategory::Hooks => &mut self.hooks,
            IssueCategory::Rendering => &mut self.rendering,
        }
    }
}

/// Stored result of one scan submission. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: String,
    pub server_ip: String,
    pub gmod_version: String,
    pub scan_date: DateTime<Utc>,
    #[serde(flatten)]
    pub summary: ReportSummary,
    pub issues: Vec<Issue>,
    pub exploits: Vec<Exploit>,
    pub files: Vec<ScannedFile>,
    pub addons: Vec<Addon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_profile: Option<PerformanceProfile>,
}

impl Report {
    /// Dashboard route for this report
    pub fn url(&self) -> String {
        format!("/report/{}", self.report_id)
    }
}
