//! Directory scan: classify each file, stream its lines through the matching
//! vendor parser, and fold accepted records into a [`ResultSet`].
//!
//! Files are scanned one at a time and lines strictly in order. A file ends in
//! one of the [`FileState`] variants; none of them stops the scan of the
//! remaining files.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    classify::{Classification, FileClassifier},
    dtc::{self, Format, Line},
    filter::Selection,
    progress::Clock,
    smart_reader::open_input,
    tally::ResultSet,
};

/// Toggles for optional diagnostic callbacks. They never change the counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressOptions {
    /// Report each file as it starts (only when `show_progress_lines` is zero).
    pub show_file_progress: bool,
    /// Report every Nth line read; zero disables.
    pub show_progress_lines: u64,
    /// List selected files up front and flag files that contributed nothing.
    pub show_selected_files: bool,
}

/// Everything a scan needs, fully resolved.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub directory: PathBuf,
    pub classifier: FileClassifier,
    pub selection: Selection,
    pub progress: ProgressOptions,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            classifier: FileClassifier::default(),
            selection: Selection::default(),
            progress: ProgressOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to list {path}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Why a file contributed nothing (or stopped contributing) to the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No file group rule matched the name.
    Excluded,
    /// Exome-only data.
    Bypassed,
    /// The name matches no supported vendor layout.
    UnknownFormat,
    /// A variant id longer than the limit was found on this line.
    Corrupt { line: u64 },
    /// The file could not be opened or read to the end.
    Unreadable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file_name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Terminal state of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileState {
    Eof,
    /// A record past the chromosome-end bound was read on this line.
    EarlyExit { line: u64 },
    AbortedOnCorruption { line: u64 },
    UnknownFormat,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub file_name: String,
    pub label: String,
    pub format: Option<Format>,
    pub lines_read: u64,
    pub lines_processed: u64,
    pub parse_errors: u64,
    #[serde(flatten)]
    pub state: FileState,
}

/// Selected files by vendor layout, computed before scanning starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Census {
    pub files_selected: usize,
    pub by_format: BTreeMap<Format, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub census: Census,
    pub files: Vec<FileStats>,
    pub skipped: Vec<SkippedFile>,
}

impl ScanSummary {
    pub fn lines_read(&self) -> u64 {
        self.files.iter().map(|f| f.lines_read).sum()
    }

    pub fn lines_processed(&self) -> u64 {
        self.files.iter().map(|f| f.lines_processed).sum()
    }

    pub fn parse_errors(&self) -> u64 {
        self.files.iter().map(|f| f.parse_errors).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub results: ResultSet,
    pub summary: ScanSummary,
}

/// Snapshot handed to [`ScanObserver::lines_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineProgress {
    pub file_index: usize,
    pub file_total: usize,
    pub lines_read: u64,
    pub lines_processed: u64,
    pub elapsed: Duration,
}

/// Optional diagnostics emitted while scanning. Every method defaults to a no-op.
pub trait ScanObserver {
    fn census(&mut self, _census: &Census) {}

    fn file_selected(&mut self, _file_name: &str, _label: &str) {}

    fn file_started(&mut self, _file_index: usize, _file_total: usize, _elapsed: Duration) {}

    fn lines_progress(&mut self, _progress: LineProgress) {}

    fn file_without_matches(&mut self, _file_name: &str) {}

    fn file_skipped(&mut self, _skipped: &SkippedFile) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

pub struct Scanner<'a> {
    config: &'a ScanConfig,
    clock: &'a dyn Clock,
    observer: &'a mut dyn ScanObserver,
}

impl<'a> Scanner<'a> {
    pub fn new(
        config: &'a ScanConfig,
        clock: &'a dyn Clock,
        observer: &'a mut dyn ScanObserver,
    ) -> Self {
        Self {
            config,
            clock,
            observer,
        }
    }

    /// Scan every regular file directly inside the configured directory, in
    /// file-name order.
    pub fn run(self) -> Result<ScanOutput, ScanError> {
        let files = list_files(&self.config.directory)?;
        Ok(self.scan_files(&files))
    }

    /// Scan an explicit list of files in the given order.
    pub fn scan_files(mut self, files: &[PathBuf]) -> ScanOutput {
        let config = self.config;
        tracing::info!(
            directory = %config.directory.display(),
            candidates = files.len(),
            rules = config.classifier.rules().len(),
            variant_id = config.selection.variant_id_pattern(),
            "starting scan",
        );

        let census = self.census(files);
        self.observer.census(&census);

        let mut output = ScanOutput {
            results: ResultSet::new(),
            summary: ScanSummary {
                census,
                ..ScanSummary::default()
            },
        };
        let total = output.summary.census.files_selected;
        let mut index = 0;

        for path in files {
            let file_name = file_name_of(path);
            let label = match config.classifier.classify(&file_name) {
                Classification::Label(label) => label,
                Classification::Excluded => {
                    tracing::trace!(file = %file_name, "no file group matched");
                    self.skip(&mut output.summary, file_name, SkipReason::Excluded);
                    continue;
                }
                Classification::Bypassed => {
                    tracing::debug!(file = %file_name, "bypassing exome file");
                    self.skip(&mut output.summary, file_name, SkipReason::Bypassed);
                    continue;
                }
            };

            index += 1;
            let stats = self.scan_file(path, &file_name, label, index, total, &mut output);
            output.summary.files.push(stats);
        }

        tracing::info!(
            files = output.summary.files.len(),
            skipped = output.summary.skipped.len(),
            results = output.results.len(),
            lines_processed = output.summary.lines_processed(),
            "scan complete",
        );
        output
    }

    fn census(&mut self, files: &[PathBuf]) -> Census {
        let config = self.config;
        let mut census = Census::default();
        for path in files {
            let file_name = file_name_of(path);
            if let Classification::Label(label) = config.classifier.classify(&file_name) {
                census.files_selected += 1;
                if let Some(format) = Format::detect(&file_name) {
                    *census.by_format.entry(format).or_insert(0) += 1;
                }
                if config.progress.show_selected_files {
                    self.observer.file_selected(&file_name, label);
                }
            }
        }
        census
    }

    fn scan_file(
        &mut self,
        path: &Path,
        file_name: &str,
        label: &str,
        index: usize,
        total: usize,
        output: &mut ScanOutput,
    ) -> FileStats {
        let mut stats = FileStats {
            file_name: file_name.to_string(),
            label: label.to_string(),
            format: Format::detect(file_name),
            lines_read: 0,
            lines_processed: 0,
            parse_errors: 0,
            state: FileState::Eof,
        };

        let Some(format) = stats.format else {
            tracing::warn!(file = %file_name, "unrecognized file format");
            stats.state = FileState::UnknownFormat;
            self.skip(&mut output.summary, file_name.to_string(), SkipReason::UnknownFormat);
            return stats;
        };

        let input = match open_input(path) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "failed to open input");
                stats.state = FileState::Unreadable;
                let reason = SkipReason::Unreadable {
                    message: e.to_string(),
                };
                self.skip(&mut output.summary, file_name.to_string(), reason);
                return stats;
            }
        };

        let config = self.config;
        let progress = &config.progress;
        if progress.show_file_progress && progress.show_progress_lines == 0 {
            self.observer.file_started(index, total, self.clock.elapsed());
        }
        tracing::debug!(file = %file_name, %label, %format, "scanning file");

        let selection = &config.selection;
        let mut reader = dtc::Reader::new(input, format);
        while let Some(line) = reader.next() {
            stats.lines_read = reader.lines_read();
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "failed to read input line");
                    stats.state = FileState::Unreadable;
                    let reason = SkipReason::Unreadable {
                        message: e.to_string(),
                    };
                    self.skip(&mut output.summary, file_name.to_string(), reason);
                    break;
                }
            };

            match line {
                Line::Comment | Line::Blank => {}
                Line::Malformed(err) if err.kind.is_corrupt() => {
                    tracing::warn!(file = %file_name, line = err.line, "corrupt record, abandoning file");
                    stats.state = FileState::AbortedOnCorruption { line: err.line };
                    let reason = SkipReason::Corrupt { line: err.line };
                    self.skip(&mut output.summary, file_name.to_string(), reason);
                    break;
                }
                Line::Malformed(err) => {
                    tracing::trace!(
                        file = %file_name,
                        error = %err,
                        raw = %err.raw,
                        "dropping malformed line"
                    );
                    stats.parse_errors += 1;
                }
                Line::Parsed(record) => {
                    // Files are assumed sorted by chromosome.
                    if selection.is_past_end(&record) {
                        stats.state = FileState::EarlyExit {
                            line: stats.lines_read,
                        };
                        break;
                    }
                    if selection.accepts(&record) {
                        output.results.record(
                            label,
                            &record.variant_id,
                            record.chromosome,
                            record.position,
                            &record.genotype,
                        );
                        stats.lines_processed += 1;
                    }
                }
            }

            let interval = progress.show_progress_lines;
            if interval > 0 && stats.lines_read % interval == 0 {
                self.observer.lines_progress(LineProgress {
                    file_index: index,
                    file_total: total,
                    lines_read: stats.lines_read,
                    lines_processed: stats.lines_processed,
                    elapsed: self.clock.elapsed(),
                });
            }
        }

        if progress.show_selected_files && stats.lines_processed == 0 {
            self.observer.file_without_matches(file_name);
        }
        tracing::debug!(
            file = %file_name,
            lines_read = stats.lines_read,
            lines_processed = stats.lines_processed,
            parse_errors = stats.parse_errors,
            state = ?stats.state,
            "finished file",
        );
        stats
    }

    fn skip(&mut self, summary: &mut ScanSummary, file_name: String, reason: SkipReason) {
        let skipped = SkippedFile { file_name, reason };
        self.observer.file_skipped(&skipped);
        summary.skipped.push(skipped);
    }
}

/// Regular files directly inside `directory`, sorted by name.
pub fn list_files(directory: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ScanError::ListDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
