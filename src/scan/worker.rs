use crate::rule::line::LineValidator;
use crate::types::Finding;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Outcome of validating one annotation file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileReport {
    /// Findings in line order
    pub findings: Vec<Finding>,
    /// Non-blank lines read (0 when the file could not be read)
    pub lines: usize,
    /// Valid boxes per class id
    pub objects: BTreeMap<u64, usize>,
}

/// Validate every line of the file at `path`, reporting findings under `file_id`.
///
/// Read and decode failures become a single file-level finding; they never
/// abort the caller.
pub fn validate_file(path: &Path, file_id: &str, validator: &LineValidator) -> FileReport {
    trace!("Reading {}", path.display());

    // The handle is closed before any line is checked
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return FileReport {
                findings: vec![Finding::file_level(
                    file_id,
                    format!("File read error: {}", e),
                )],
                ..FileReport::default()
            };
        }
    };

    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            warn!("{} is not valid UTF-8: {}", path.display(), e);
            return FileReport {
                findings: vec![Finding::file_level(
                    file_id,
                    "File encoding error: invalid encoding (not valid UTF-8)",
                )],
                ..FileReport::default()
            };
        }
    };

    let report = validate_content(&content, file_id, validator);
    debug!(
        "{}: {} lines, {} findings",
        file_id,
        report.lines,
        report.findings.len()
    );
    report
}

/// Validate already-decoded file content
pub fn validate_content(content: &str, file_id: &str, validator: &LineValidator) -> FileReport {
    let mut report = FileReport::default();
    for (i, line) in split_lines(content).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        report.lines += 1;
        match validator.check(file_id, i + 1, line) {
            Ok(Some(bbox)) => *report.objects.entry(bbox.class_id).or_default() += 1,
            Ok(None) => {}
            Err(finding) => {
                trace!("{}", finding);
                report.findings.push(finding);
            }
        }
    }
    report
}

/// Split on `\n`, `\r\n` and lone `\r`
fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(content);
    std::iter::from_fn(move || {
        let current = rest?;
        if current.is_empty() {
            rest = None;
            return None;
        }
        match current.find(['\n', '\r']) {
            Some(idx) => {
                let skip = if current[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[idx + skip..]);
                Some(&current[..idx])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}
