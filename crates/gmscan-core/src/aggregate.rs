//! Report aggregation
//!
//! Summary counters are computed once, when the report is created.

use crate::model::{CategoryCounts, IssueCategory, Report, ScanPayload};
use crate::store::ReportStore;
use crate::{CoreResult, Severity};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Title keywords in match order. The first keyword found decides the category.
const CATEGORY_KEYWORDS: &[(&str, IssueCategory)] = &[
    ("performance", IssueCategory::Performance),
    ("memory", IssueCategory::Memory),
    ("hook", IssueCategory::Hooks),
    ("net", IssueCategory::Networking),
    ("http", IssueCategory::Networking),
    ("render", IssueCategory::Rendering),
    ("draw", IssueCategory::Rendering),
];

/// Derived counters stored on every report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Critical issues plus critical exploits
    pub critical: u32,
    pub performance: u32,
    pub scanned_files: u32,
    pub addons_analyzed: u32,
    pub issues_by_category: CategoryCounts,
}

impl ReportSummary {
    pub fn from_payload(payload: &ScanPayload) -> Self {
        let mut critical = 0;
        let mut performance = 0;
        let mut issues_by_category = CategoryCounts::default();

        for issue in &payload.issues {
            match issue.severity {
                Severity::Critical => critical += 1,
                Severity::Performance => performance += 1,
                Severity::Warning | Severity::Info => {}
            }
            if let Some(category) = categorize(&issue.title) {
                issues_by_category.increment(category);
            }
        }

        for exploit in &payload.exploits {
            if exploit.severity == Severity::Critical {
                critical += 1;
            }
            issues_by_category.increment(IssueCategory::Security);
        }

        Self {
            critical,
            performance,
            scanned_files: saturating_len(payload.files.len()),
            addons_analyzed: saturating_len(payload.addons.len()),
            issues_by_category,
        }
    }
}

fn saturating_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Category of an issue title, by case-insensitive keyword match
pub fn categorize(title: &str) -> Option<IssueCategory> {
    let title = title.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| title.contains(keyword))
        .map(|(_, category)| *category)
}

/// Build a report from a validated payload and store it.
///
/// The id is assigned under the store's write lock, so either a complete
/// report is stored or nothing is.
pub fn aggregate(store: &ReportStore, payload: ScanPayload) -> CoreResult<Arc<Report>> {
    let summary = ReportSummary::from_payload(&payload);
    let ScanPayload {
        server_ip,
        gmod_version,
        issues,
        exploits,
        files,
        addons,
        performance,
    } = payload;

    let report = store.create(|report_id| Report {
        report_id,
        server_ip,
        gmod_version,
        scan_date: Utc::now(),
        summary,
        issues,
        exploits,
        files,
        addons,
        performance_profile: performance,
    })?;

    info!(
        report_id = %report.report_id,
        server_ip = %report.server_ip,
        critical = report.summary.critical,
        performance = report.summary.performance,
        issues = report.issues.len(),
        "Report created"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Addon, Exploit, Issue, ScannedFile};

    fn issue(title: &str, severity: Severity) -> Issue {
        Issue {
            id: format!("ISSUE_{}", title.len()),
            title: title.to_string(),
            description: String::new(),
            severity,
            occurrences: 1,
            file_path: "lua/autorun/a.lua".to_string(),
            line_number: 1,
            code: String::new(),
            recommendation: String::new(),
            documentation_url: None,
        }
    }

    fn exploit(severity: Severity) -> Exploit {
        Exploit {
            id: "EXP".to_string(),
            title: "RunString on net message".to_string(),
            description: String::new(),
            severity,
            file_path: "lua/autorun/b.lua".to_string(),
            line_number: Some(3),
            code: String::new(),
            recommendation: String::new(),
        }
    }

    #[test]
    fn test_categorize_first_match_wins() {
        assert_eq!(categorize("Heavy Performance hit"), Some(IssueCategory::Performance));
        assert_eq!(categorize("Memory leak in HOOK"), Some(IssueCategory::Memory));
        assert_eq!(categorize("Object creation in HUDPaint hook"), Some(IssueCategory::Hooks));
        assert_eq!(categorize("hook with surface draw"), Some(IssueCategory::Hooks));
        assert_eq!(categorize("http.Fetch() in Think"), Some(IssueCategory::Networking));
        assert_eq!(categorize("Unbounded net.Receive"), Some(IssueCategory::Networking));
        assert_eq!(categorize("Render target per frame"), Some(IssueCategory::Rendering));
        assert_eq!(categorize("DrawText misuse"), Some(IssueCategory::Rendering));
        assert_eq!(categorize("Empty function"), None);
    }

    #[test]
    fn test_summary_counts() {
        let mut payload = ScanPayload::new("1.2.3.4:27015", "2024.1");
        payload.issues = vec![
            issue("ents.GetAll() in Think hook", Severity::Critical),
            issue("Performance: timer spam", Severity::Performance),
            issue("Memory churn", Severity::Warning),
            issue("Plain title", Severity::Info),
        ];
        payload.exploits = vec![exploit(Severity::Critical), exploit(Severity::Warning)];
        payload.files = vec![ScannedFile {
            path: "addons/a/lua/a.lua".to_string(),
            addon: "a".to_string(),
            file_type: "lua".to_string(),
            size: 10,
            issues: 1,
        }];
        payload.addons = vec![
            Addon { name: "a".to_string(), files: 1, issues: 1 },
            Addon { name: "b".to_string(), files: 2, issues: 3 },
        ];

        let summary = ReportSummary::from_payload(&payload);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.performance, 1);
        assert_eq!(summary.scanned_files, 1);
        assert_eq!(summary.addons_analyzed, 2);
        assert_eq!(summary.issues_by_category.hooks, 1);
        assert_eq!(summary.issues_by_category.performance, 1);
        assert_eq!(summary.issues_by_category.memory, 1);
        assert_eq!(summary.issues_by_category.security, 2);
        assert!(
            summary.issues_by_category.total() as usize
                <= payload.issues.len() + payload.exploits.len()
        );
    }

    #[test]
    fn test_aggregate_stores_verbatim() {
        let store = ReportStore::new();
        let mut payload = ScanPayload::new("10.0.0.1:27015", "230.1");
        payload.issues = vec![issue("Object creation in HUDPaint", Severity::Warning)];
        let expected_issues = payload.issues.clone();

        let report = aggregate(&store, payload).unwrap();
        assert_eq!(report.issues, expected_issues);
        assert_eq!(report.url(), format!("/report/{}", report.report_id));

        let fetched = store.get(&report.report_id).unwrap();
        assert_eq!(fetched.issues, expected_issues);
        assert_eq!(fetched.summary.critical, 0);
    }

    #[test]
    fn test_empty_payload() {
        let store = ReportStore::new();
        let report = aggregate(&store, ScanPayload::new("ip", "v")).unwrap();
        assert_eq!(report.summary.critical, 0);
        assert_eq!(report.summary.issues_by_category, CategoryCounts::default());
        assert_eq!(store.len(), 1);
    }
}
