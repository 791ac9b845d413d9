//! Plain-text export, the format of the dashboard's "Export" button

use crate::model::Report;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub fn generate(report: &Report) -> String {
    let mut output = String::new();
    let summary = &report.summary;

    output.push_str("GMOD CODE ANALYSIS REPORT\n");
    output.push_str("=======================\n\n");
    output.push_str(&format!("Server IP: {}\n", report.server_ip));
    output.push_str(&format!("GMod Version: {}\n", report.gmod_version));
    output.push_str(&format!("Scan Date: {}\n\n", report.scan_date.format(DATE_FORMAT)));

    output.push_str("SUMMARY\n");
    output.push_str("-------\n");
    output.push_str(&format!("Critical Issues: {}\n", summary.critical));
    output.push_str(&format!("Performance Issues: {}\n", summary.performance));
    output.push_str(&format!("Files Scanned: {}\n", summary.scanned_files));
    output.push_str(&format!("Addons Analyzed: {}\n\n", summary.addons_analyzed));

    output.push_str("BAD CODE ISSUES\n");
    output.push_str("--------------\n");
    for (index, issue) in report.issues.iter().enumerate() {
        output.push_str(&format!("{}. {} ({})\n", index + 1, issue.title, issue.severity));
        output.push_str(&format!("   File: {}:{}\n", issue.file_path, issue.line_number));
        output.push_str(&format!("   Description: {}\n", issue.description));
        output.push_str(&format!("   Recommendation: {}\n\n", issue.recommendation));
    }

    output
}
