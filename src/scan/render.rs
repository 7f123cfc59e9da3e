use super::orchestrator::{PartitionStatus, ScanResult};
use crate::types::Finding;
use std::collections::BTreeMap;
use std::path::Path;

const RULE_WIDTH: usize = 80;

/// Checks applied to every annotation line, in order
pub const CHECKS: [&str; 7] = [
    "Each line has exactly 5 values (class_id center_x center_y width height)",
    "class_id is a non-negative integer",
    "center_x, center_y, width, height are finite numbers (not NaN/Infinity)",
    "width > 0 and height > 0 (no zero-width/height boxes)",
    "center_x and center_y are within [0, 1]",
    "Bounding boxes do not exceed image bounds",
    "File encoding is valid UTF-8",
];

const IMPACT_ANALYSIS: &str = "\
CRITICAL: Even ONE corrupt label can cause training to fail.

Training pipelines validate labels strictly while loading the dataset:
- Invalid labels cause \"division by zero\" or \"index out of range\" errors
- All labels are checked before training starts
- A single corrupt label file can prevent the entire dataset from loading

RECOMMENDATION:
1. Fix or remove all corrupt label files listed above
2. Re-run validation to confirm all labels are valid
3. Only then proceed with training

Common fixes:
- Remove lines with invalid coordinates
- Fix out-of-range values (clamp to [0, 1])
- Remove zero-width or zero-height boxes
- Fix malformed lines (ensure exactly 5 values)";

/// Group findings by file, files sorted by name, findings in original order
pub fn group_by_file(findings: &[Finding]) -> BTreeMap<&str, Vec<&Finding>> {
    let mut grouped: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for finding in findings {
        grouped.entry(finding.file.as_str()).or_default().push(finding);
    }
    grouped
}

fn describe_status(status: &PartitionStatus) -> String {
    match status {
        PartitionStatus::Missing => "not found, skipped".to_string(),
        PartitionStatus::Scanned { files } => format!("{} label file(s)", files),
        PartitionStatus::Unreadable => "could not be listed".to_string(),
    }
}

/// Human-readable report
pub fn format_report(root: &Path, result: &ScanResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut output = String::new();

    output.push_str(&format!("{}\nLabel Validation Report\n{}\n", rule, rule));
    output.push_str(&format!("Dataset: {}\n\n", root.display()));

    output.push_str("Partitions:\n");
    for partition in &result.partitions {
        let status = describe_status(&partition.status);
        output.push_str(&format!(
            "  - {} ({}): {}\n",
            partition.name,
            partition.dir.display(),
            status
        ));
    }

    output.push_str(&format!("\n{}\nVALIDATION RESULTS\n{}\n", rule, rule));
    output.push_str(&format!(
        "Total label files scanned: {}\n",
        result.files_scanned
    ));
    output.push_str(&format!(
        "Total annotation lines: {}\n",
        result.lines_scanned
    ));
    output.push_str(&format!(
        "Total errors found: {}\n",
        result.findings.len()
    ));
    if !result.objects_per_class.is_empty() {
        let counts: Vec<String> = result
            .objects_per_class
            .iter()
            .map(|(class_id, count)| format!("{}: {}", class_id, count))
            .collect();
        output.push_str(&format!("Valid boxes per class: {}\n", counts.join(", ")));
    }
    output.push('\n');

    output.push_str("Validation checks performed:\n");
    for check in CHECKS {
        output.push_str(&format!("  - {}\n", check));
    }
    output.push('\n');

    if result.passed() {
        output.push_str("SUCCESS: ALL LABELS ARE VALID\n\n");
        output.push_str("All label files passed validation.\n");
        output.push_str("No corrupt or invalid annotations detected.\n");
    } else {
        output.push_str("ERROR: CORRUPT LABELS DETECTED\n\n");
        output.push_str("The following label files contain invalid annotations:\n");
        output.push_str(&format_findings(&result.findings));
        output.push_str(&format!("\n{}\nIMPACT ANALYSIS\n{}\n\n", rule, rule));
        output.push_str(IMPACT_ANALYSIS);
        output.push('\n');
    }

    output.push_str(&rule);
    output.push('\n');
    output
}

/// Markdown report for `.md` output files
pub fn format_markdown(root: &Path, result: &ScanResult) -> String {
    let mut output = String::new();

    output.push_str("# Label Validation Report\n\n");
    output.push_str(&format!("Dataset: `{}`\n\n", root.display()));

    output.push_str("## Partitions\n\n");
    for partition in &result.partitions {
        let status = describe_status(&partition.status);
        output.push_str(&format!(
            "- **{}** (`{}`): {}\n",
            partition.name,
            partition.dir.display(),
            status
        ));
    }
    output.push('\n');

    output.push_str("## Results\n\n");
    output.push_str(&format!(
        "- Total label files scanned: {}\n",
        result.files_scanned
    ));
    output.push_str(&format!(
        "- Total annotation lines: {}\n",
        result.lines_scanned
    ));
    output.push_str(&format!("- Total errors found: {}\n", result.findings.len()));
    for (class_id, count) in &result.objects_per_class {
        output.push_str(&format!("- Valid boxes of class {}: {}\n", class_id, count));
    }
    output.push('\n');

    output.push_str("## Checks\n\n");
    for check in CHECKS {
        output.push_str(&format!("- {}\n", check));
    }
    output.push('\n');

    if result.passed() {
        output.push_str("**SUCCESS: ALL LABELS ARE VALID**\n");
        return output;
    }

    output.push_str("**ERROR: CORRUPT LABELS DETECTED**\n\n");
    for (file, findings) in group_by_file(&result.findings) {
        output.push_str(&format!("## Violations in {}\n\n", file));
        for finding in findings {
            if finding.is_file_level() {
                output.push_str(&format!("- {}\n", finding.reason));
            } else {
                output.push_str(&format!(
                    "- Line {}: `{}`\n  - {}\n",
                    finding.line, finding.text, finding.reason
                ));
            }
        }
        output.push('\n');
    }

    output.push_str("## Impact Analysis\n\n```text\n");
    output.push_str(IMPACT_ANALYSIS);
    output.push_str("\n```\n");
    output
}

/// Grouped listing. File-level findings show only their reason.
pub fn format_findings(findings: &[Finding]) -> String {
    let mut output = String::new();
    for (file, findings) in group_by_file(findings) {
        output.push_str(&format!("\nFile: {}:\n", file));
        for finding in findings {
            if !finding.is_file_level() {
                output.push_str(&format!("   Line {}: '{}'\n", finding.line, finding.text));
            }
            output.push_str(&format!("   -> {}\n", finding.reason));
        }
    }
    output
}

/// Machine-readable report
pub fn format_json(root: &Path, result: &ScanResult) -> serde_json::Result<String> {
    let output = serde_json::json!({
        "root": root.display().to_string(),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "passed": result.passed(),
        "files_scanned": result.files_scanned,
        "lines_scanned": result.lines_scanned,
        "finding_count": result.findings.len(),
        "objects_per_class": result.objects_per_class,
        "partitions": serde_json::to_value(&result.partitions)?,
        "findings_by_file": group_by_file(&result.findings),
    });
    serde_json::to_string_pretty(&output)
}
