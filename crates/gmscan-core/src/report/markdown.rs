//! Markdown report generation

use crate::model::{IssueCategory, Report};

const CATEGORIES: [IssueCategory; 6] = [
    IssueCategory::Performance,
    IssueCategory::Memory,
    IssueCategory::Security,
    IssueCategory::Networking,
    IssueCategory::Hooks,
    IssueCategory::Rendering,
];

pub fn generate(report: &Report) -> String {
    let mut md = String::new();
    let summary = &report.summary;

    md.push_str(&format!("# GMod Scan Report `{}`\n\n", report.report_id));
    md.push_str(&format!("- **Server:** {}\n", report.server_ip));
    md.push_str(&format!("- **GMod version:** {}\n", report.gmod_version));
    md.push_str(&format!("- **Scanned:** {}\n\n", report.scan_date.to_rfc3339()));

    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Count |\n|---|---|\n");
    md.push_str(&format!("| Critical issues | {} |\n", summary.critical));
    md.push_str(&format!("| Performance issues | {} |\n", summary.performance));
    md.push_str(&format!("| Files scanned | {} |\n", summary.scanned_files));
    md.push_str(&format!("| Addons analyzed | {} |\n\n", summary.addons_analyzed));

    md.push_str("### Issues by category\n\n");
    for category in CATEGORIES {
        md.push_str(&format!(
            "- {}: {}\n",
            category,
            summary.issues_by_category.get(category)
        ));
    }
    md.push('\n');

    md.push_str("## Issues\n\n");
    if report.issues.is_empty() {
        md.push_str("No issues found.\n\n");
    }
    for issue in &report.issues {
        md.push_str(&format!("### {} `{}`\n\n", issue.title, issue.severity));
        md.push_str(&format!("`{}:{}`", issue.file_path, issue.line_number));
        if issue.occurrences > 1 {
            md.push_str(&format!(" ({} occurrences)", issue.occurrences));
        }
        md.push_str(&format!("\n\n{}\n\n", issue.description));
        if !issue.code.is_empty() {
            md.push_str(&format!("```lua\n{}\n```\n\n", issue.code));
        }
        md.push_str(&format!("**Recommendation:** {}\n\n", issue.recommendation));
    }

    if !report.exploits.is_empty() {
        md.push_str("## Exploits\n\n");
        for exploit in &report.exploits {
            let location = match exploit.line_number {
                Some(line) => format!("{}:{}", exploit.file_path, line),
                None => exploit.file_path.clone(),
            };
            md.push_str(&format!(
                "- **{}** `{}` in `{}`: {}\n",
                exploit.title, exploit.severity, location, exploit.description
            ));
        }
        md.push('\n');
    }

    if !report.addons.is_empty() {
        md.push_str("## Addons\n\n| Addon | Files | Issues |\n|---|---|---|\n");
        for addon in &report.addons {
            md.push_str(&format!("| {} | {} | {} |\n", addon.name, addon.files, addon.issues));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;

    #[test]
    fn test_markdown_sections() {
        let md = generate(&sample_report());
        assert!(md.starts_with("# GMod Scan Report `a1b2c3d4e5f6`"));
        assert!(md.contains("| Critical issues | 2 |"));
        assert!(md.contains("- security: 1"));
        assert!(md.contains("(2 occurrences)"));
        assert!(md.contains("## Exploits"));
        assert!(md.contains("addons/backdoor/lua/autorun/x.lua:3"));
        assert!(md.contains("| darkrp | 1 | 1 |"));
    }

    #[test]
    fn test_markdown_empty_report() {
        let mut report = sample_report();
        report.issues.clear();
        report.exploits.clear();
        report.addons.clear();
        let md = generate(&report);
        assert!(md.contains("No issues found."));
        assert!(!md.contains("## Exploits"));
        assert!(!md.contains("## Addons"));
    }
}
