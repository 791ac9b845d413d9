//! Read-side queries behind the report dashboard

use crate::model::{Addon, Issue, Report, ScannedFile};
use crate::Severity;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// State of the report page. A missing report is its own state, never an
/// endless spinner.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReportView {
    #[default]
    Loading,
    NotFound,
    Ready(Arc<Report>),
}

impl ReportView {
    pub fn resolve(lookup: Option<Arc<Report>>) -> Self {
        match lookup {
            Some(report) => ReportView::Ready(report),
            None => ReportView::NotFound,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ReportView::Loading)
    }
}

/// Issue list filter offered by the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IssueFilter {
    #[default]
    All,
    Critical,
    Performance,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        match self {
            IssueFilter::All => true,
            IssueFilter::Critical => issue.severity == Severity::Critical,
            IssueFilter::Performance => issue.severity == Severity::Performance,
        }
    }
}

impl FromStr for IssueFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(IssueFilter::All),
            "critical" => Ok(IssueFilter::Critical),
            "performance" => Ok(IssueFilter::Performance),
            other => Err(format!(
                "unknown filter {:?}, expected all, critical or performance",
                other
            )),
        }
    }
}

/// A filtered slice of a report table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub shown: usize,
}

impl<T> Listing<T> {
    fn new(items: Vec<T>, total: usize) -> Self {
        let shown = items.len();
        Self { items, total, shown }
    }
}

/// Addon table plus the scale for its issue bars
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonListing {
    #[serde(flatten)]
    pub listing: Listing<Addon>,
    /// Largest issue count over all addons, at least 1
    pub max_issues: u32,
}

pub fn filter_issues(issues: &[Issue], filter: IssueFilter) -> Listing<Issue> {
    let items = issues
        .iter()
        .filter(|issue| filter.matches(issue))
        .cloned()
        .collect();
    Listing::new(items, issues.len())
}

fn matches_query(haystack: &str, query: &str) -> bool {
    query.is_empty() || haystack.to_lowercase().contains(query)
}

/// Files whose path contains `query`, case-insensitively
pub fn search_files(files: &[ScannedFile], query: &str) -> Listing<ScannedFile> {
    let query = query.trim().to_lowercase();
    let items = files
        .iter()
        .filter(|file| matches_query(&file.path, &query))
        .cloned()
        .collect();
    Listing::new(items, files.len())
}

/// Addons whose name contains `query`, case-insensitively
pub fn search_addons(addons: &[Addon], query: &str) -> AddonListing {
    let query = query.trim().to_lowercase();
    let items = addons
        .iter()
        .filter(|addon| matches_query(&addon.name, &query))
        .cloned()
        .collect();
    let max_issues = addons
        .iter()
        .map(|addon| addon.issues)
        .max()
        .unwrap_or(0)
        .max(1);

    AddonListing {
        listing: Listing::new(items, addons.len()),
        max_issues,
    }
}

/// Findings about server ConVars, which the scanner tags with a `convar_` id
pub fn convar_issues(issues: &[Issue]) -> Vec<Issue> {
    issues
        .iter()
        .filter(|issue| issue.id.starts_with("convar_"))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: &str, severity: Severity) -> Issue {
        Issue {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            severity,
            occurrences: 1,
            file_path: "lua/x.lua".to_string(),
            line_number: 1,
            code: String::new(),
            recommendation: String::new(),
            documentation_url: None,
        }
    }

    fn addon(name: &str, issues: u32) -> Addon {
        Addon {
            name: name.to_string(),
            files: 1,
            issues,
        }
    }

    #[test]
    fn test_report_view_resolve() {
        assert!(ReportView::default().is_loading());
        assert_eq!(ReportView::resolve(None), ReportView::NotFound);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("".parse::<IssueFilter>().unwrap(), IssueFilter::All);
        assert_eq!("Critical".parse::<IssueFilter>().unwrap(), IssueFilter::Critical);
        assert!("warning".parse::<IssueFilter>().is_err());
    }

    #[test]
    fn test_filter_issues() {
        let issues = vec![
            issue("a", Severity::Critical),
            issue("b", Severity::Performance),
            issue("c", Severity::Warning),
        ];
        let critical = filter_issues(&issues, IssueFilter::Critical);
        assert_eq!(critical.shown, 1);
        assert_eq!(critical.total, 3);
        assert_eq!(critical.items[0].id, "a");
        assert_eq!(filter_issues(&issues, IssueFilter::All).shown, 3);
        assert_eq!(filter_issues(&issues, IssueFilter::Performance).items[0].id, "b");
    }

    #[test]
    fn test_search_files() {
        let file = |path: &str| ScannedFile {
            path: path.to_string(),
            addon: "a".to_string(),
            file_type: "lua".to_string(),
            size: 1,
            issues: 1,
        };
        let files = vec![file("addons/DarkRP/lua/hud.lua"), file("lua/autorun/admin.lua")];
        let found = search_files(&files, "darkrp");
        assert_eq!(found.shown, 1);
        assert_eq!(found.items[0].path, "addons/DarkRP/lua/hud.lua");
        assert_eq!(search_files(&files, "  ").shown, 2);
    }

    #[test]
    fn test_search_addons_max_issues() {
        let addons = vec![addon("wiremod", 7), addon("ulx", 2)];
        let listing = search_addons(&addons, "ULX");
        assert_eq!(listing.listing.shown, 1);
        assert_eq!(listing.max_issues, 7);

        let empty = search_addons(&[], "");
        assert_eq!(empty.max_issues, 1);
        assert_eq!(empty.listing.total, 0);
    }

    #[test]
    fn test_convar_issues() {
        let issues = vec![
            issue("convar_sv_cheats", Severity::Critical),
            issue("ISSUE_0001", Severity::Warning),
        ];
        let convars = convar_issues(&issues);
        assert_eq!(convars.len(), 1);
        assert_eq!(convars[0].id, "convar_sv_cheats");
    }

    #[test]
    fn test_addon_listing_json() {
        let listing = search_addons(&[addon("a", 3)], "");
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["maxIssues"], 3);
        assert_eq!(json["total"], 1);
        assert_eq!(json["items"][0]["name"], "a");
    }
}
