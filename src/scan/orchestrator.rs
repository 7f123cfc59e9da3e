use super::{render, worker};
use crate::config::{Config, DatasetConfig};
use crate::rule::line::LineValidator;
use crate::types::Finding;
use anyhow::{Context, bail};
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Conditions that abort a scan before or during file discovery
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Dataset root does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Invalid annotation extension '{extension}': {source}")]
    InvalidExtension {
        extension: String,
        source: globset::Error,
    },
}

/// Discovery outcome for one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionStatus {
    /// Directory does not exist; skipped with a warning
    Missing,
    /// Directory exists; number of annotation files found
    Scanned { files: usize },
    /// Directory exists but could not be listed; recorded as a finding
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSummary {
    pub name: String,
    pub dir: PathBuf,
    #[serde(flatten)]
    pub status: PartitionStatus,
}

/// Aggregated result of a dataset scan
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanResult {
    /// Findings ordered by file discovery order, then line number
    pub findings: Vec<Finding>,
    pub files_scanned: usize,
    /// Non-blank annotation lines across successfully read files
    pub lines_scanned: usize,
    /// Valid boxes per class id
    pub objects_per_class: BTreeMap<u64, usize>,
    pub partitions: Vec<PartitionSummary>,
}

impl ScanResult {
    /// Pass iff no findings were recorded
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Walks the configured partitions of a dataset and validates every
/// annotation file it finds
pub struct Scanner {
    dataset: DatasetConfig,
    validator: LineValidator,
}

impl Scanner {
    pub fn new(dataset: DatasetConfig, validator: LineValidator) -> Self {
        Self { dataset, validator }
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.dataset.root.join(&self.dataset.labels_dir)
    }

    /// Scan all partitions in order
    ///
    /// Missing partitions are skipped with a warning. Unreadable files and
    /// unlistable partitions are recorded as findings; only a missing root
    /// or an unusable extension pattern is an error.
    pub fn scan(&self) -> Result<ScanResult, ScanError> {
        if !self.dataset.root.exists() {
            return Err(ScanError::RootNotFound(self.dataset.root.clone()));
        }

        let matcher = self.matcher()?;
        let labels_dir = self.labels_dir();
        let mut result = ScanResult::default();

        for partition in &self.dataset.partitions {
            let dir = labels_dir.join(partition);
            if !dir.is_dir() {
                warn!("Directory not found: {}", dir.display());
                result.partitions.push(PartitionSummary {
                    name: partition.clone(),
                    dir,
                    status: PartitionStatus::Missing,
                });
                continue;
            }

            info!("Scanning: {}", dir.display());
            let listing = discover_files(&dir, &matcher);
            self.scan_partition(&mut result, partition, dir, listing);
        }

        debug!(
            "Scan complete: {} files, {} lines, {} findings",
            result.files_scanned,
            result.lines_scanned,
            result.findings.len()
        );
        if result.files_scanned == 0 {
            warn!(
                "No annotation files found under {}, nothing to validate",
                labels_dir.display()
            );
        }

        Ok(result)
    }

    /// Validate the listed files of one partition. A listing failure becomes
    /// a partition-level finding and the scan moves on.
    fn scan_partition(
        &self,
        result: &mut ScanResult,
        partition: &str,
        dir: PathBuf,
        listing: std::io::Result<Vec<PathBuf>>,
    ) {
        let files = match listing {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list {}: {}", dir.display(), e);
                result.findings.push(Finding::file_level(
                    &format!("{}/", partition),
                    format!("Directory read error: {}", e),
                ));
                result.partitions.push(PartitionSummary {
                    name: partition.to_string(),
                    dir,
                    status: PartitionStatus::Unreadable,
                });
                return;
            }
        };

        if files.is_empty() {
            info!(
                "No .{} files found in {}/",
                self.dataset.extension, partition
            );
        } else {
            info!("Found {} label file(s)", files.len());
        }

        for path in &files {
            let file_id = file_id(partition, path);
            let report = worker::validate_file(path, &file_id, &self.validator);
            result.files_scanned += 1;
            result.lines_scanned += report.lines;
            result.findings.extend(report.findings);
            for (class_id, count) in report.objects {
                *result.objects_per_class.entry(class_id).or_default() += count;
            }
        }

        result.partitions.push(PartitionSummary {
            name: partition.to_string(),
            dir,
            status: PartitionStatus::Scanned { files: files.len() },
        });
    }

    fn matcher(&self) -> Result<GlobMatcher, ScanError> {
        let pattern = format!("*.{}", self.dataset.extension);
        Glob::new(&pattern)
            .map(|glob| glob.compile_matcher())
            .map_err(|source| ScanError::InvalidExtension {
                extension: self.dataset.extension.clone(),
                source,
            })
    }
}

/// Scan the configured dataset, print the report and optionally write it to
/// `output`
///
/// Returns the verdict: `true` when no findings were recorded.
pub fn run(config: &Config, output: Option<&str>) -> anyhow::Result<bool> {
    let root = &config.dataset.root;
    info!("Dataset: {}", root.display());

    let scanner = Scanner::new(
        config.dataset.clone(),
        LineValidator::new(config.rules.tolerance),
    );
    let result = scanner.scan()?;

    print!("{}", render::format_report(root, &result));

    if let Some(output_path) = output {
        write_output(output_path, root, &result)?;
    }

    if result.passed() {
        info!(
            "All {} label file(s) passed validation",
            result.files_scanned
        );
    } else {
        error!(
            "{} finding(s) in {} file(s)",
            result.findings.len(),
            render::group_by_file(&result.findings).len()
        );
    }
    Ok(result.passed())
}

fn write_output(path: &str, root: &Path, result: &ScanResult) -> anyhow::Result<()> {
    let content = if path.ends_with(".json") {
        render::format_json(root, result)?
    } else if path.ends_with(".md") {
        render::format_markdown(root, result)
    } else {
        bail!("Output file must end with .md or .json");
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output file {}", path))?;
    info!("Results written to {}", path);
    Ok(())
}

/// List regular files in `dir` (non-recursive) whose name matches, sorted by name
fn discover_files(dir: &Path, matcher: &GlobMatcher) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if matcher.is_match(Path::new(name)) {
            files.push(path);
        } else {
            trace!("Skipping {}", path.display());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Identifier used in findings: `<partition>/<file name>`
fn file_id(partition: &str, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", partition, name)
}
