//! Run report and text rendering of the aggregated counts.
//!
//! The JSON report carries the configuration that produced a run, the scan
//! statistics, the skipped files and the full result set.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::scan::{Census, FileStats, ScanConfig, ScanOutput, SkipReason, SkippedFile};
use crate::tally::ResultSet;

/// Complete report of a scan run, serialized to JSON.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    /// Tool version
    pub version: String,
    /// Timestamp of the run (RFC 3339)
    pub timestamp: String,
    pub selection: SelectionInfo,
    pub file_groups: Vec<FileGroupInfo>,
    pub statistics: Statistics,
    pub census: &'a Census,
    pub files: &'a [FileStats],
    pub skipped: Vec<&'a SkippedFile>,
    pub results: &'a ResultSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionInfo {
    pub directory: String,
    pub variant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromosomes: Option<Vec<String>>,
    pub chromosome_start: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromosome_end: Option<u8>,
    pub position_start: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_end: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileGroupInfo {
    pub label: String,
    pub priority: i64,
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub files_scanned: usize,
    pub files_excluded: usize,
    pub files_skipped: usize,
    pub lines_read: u64,
    pub lines_processed: u64,
    pub parse_errors: u64,
    pub results: usize,
}

impl<'a> RunReport<'a> {
    pub fn new(config: &ScanConfig, output: &'a ScanOutput) -> Self {
        let now = time::OffsetDateTime::now_utc();
        let timestamp = now
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        let selection = &config.selection;
        let summary = &output.summary;
        let excluded = summary
            .skipped
            .iter()
            .filter(|s| s.reason == SkipReason::Excluded)
            .count();

        RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            selection: SelectionInfo {
                directory: config.directory.display().to_string(),
                variant_id: selection.variant_id_pattern().to_string(),
                chromosomes: selection
                    .chromosome_patterns()
                    .map(|patterns| patterns.map(str::to_string).collect()),
                chromosome_start: selection.chromosome_start,
                chromosome_end: selection.chromosome_end,
                position_start: selection.position_start,
                position_end: selection.position_end,
            },
            file_groups: config
                .classifier
                .rules()
                .iter()
                .map(|rule| FileGroupInfo {
                    label: rule.label().to_string(),
                    priority: rule.priority(),
                    selectors: rule.selectors().map(str::to_string).collect(),
                })
                .collect(),
            statistics: Statistics {
                files_scanned: summary.files.len(),
                files_excluded: excluded,
                files_skipped: summary.skipped.len() - excluded,
                lines_read: summary.lines_read(),
                lines_processed: summary.lines_processed(),
                parse_errors: summary.parse_errors(),
                results: output.results.len(),
            },
            census: &summary.census,
            files: &summary.files,
            // Exclusions only show up in the statistics.
            skipped: summary
                .skipped
                .iter()
                .filter(|s| s.reason != SkipReason::Excluded)
                .collect(),
            results: &output.results,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        tracing::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

/// Human-readable listing of every result, one site per block:
///
/// ```text
/// RS1 1:100
///     Default: AA=1, AG=1
/// ```
pub fn render_text(results: &ResultSet) -> String {
    if results.is_empty() {
        return String::from("Nothing matched selections\n");
    }

    let mut out = String::new();
    for result in results.iter() {
        let _ = writeln!(
            out,
            "{} {}:{}",
            result.variant_id(),
            result.chromosome(),
            result.position()
        );
        for group in result.groups() {
            let counts: Vec<String> = group
                .genotypes()
                .iter()
                .map(|(genotype, count)| format!("{genotype}={count}"))
                .collect();
            let _ = writeln!(out, "    {}: {}", group.label(), counts.join(", "));
        }
    }
    out
}

/// Skipped files other than plain exclusions, with a short reason.
pub fn render_skipped(skipped: &[SkippedFile]) -> String {
    let mut out = String::new();
    for file in skipped {
        let reason = match &file.reason {
            SkipReason::Excluded => continue,
            SkipReason::Bypassed => String::from("exome data"),
            SkipReason::UnknownFormat => String::from("unrecognized format"),
            SkipReason::Corrupt { line } => format!("corrupt record at line {line}"),
            SkipReason::Unreadable { message } => format!("unreadable: {message}"),
        };
        let _ = writeln!(out, "{} ({reason})", file.file_name);
    }
    out
}
