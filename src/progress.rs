//! Elapsed-time source and the default logging observer for scans.

use std::time::{Duration, Instant};

use crate::scan::{Census, LineProgress, ScanObserver, SkipReason, SkippedFile};

/// Source of elapsed time since a run started. Injected into the scanner so
/// tests can supply a fixed value.
pub trait Clock {
    fn elapsed(&self) -> Duration;
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Formats a duration as `"M minutes, S seconds"`.
///
/// ```
/// use snp_tally::progress::format_elapsed;
/// use std::time::Duration;
///
/// assert_eq!(format_elapsed(Duration::from_secs(125)), "2 minutes, 5 seconds");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{} minutes, {} seconds", secs / 60, secs % 60)
}

/// Formats a count with thousands separators, e.g. `1234567` → `1,234,567`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Reports scan diagnostics through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ScanObserver for LogProgress {
    fn census(&mut self, census: &Census) {
        tracing::info!(files = census.files_selected, "selected files");
        for (format, count) in &census.by_format {
            tracing::info!("{format}: {count}");
        }
    }

    fn file_selected(&mut self, file_name: &str, label: &str) {
        tracing::info!("Selected: {file_name} ({label})");
    }

    fn file_started(&mut self, file_index: usize, file_total: usize, elapsed: Duration) {
        tracing::info!(
            "files: {file_index}/{file_total}  elapsed: {}",
            format_elapsed(elapsed)
        );
    }

    fn lines_progress(&mut self, progress: LineProgress) {
        tracing::info!(
            "file: {}/{}  lines read: {}  processed {}  elapsed: {}",
            format_count(progress.file_index as u64),
            format_count(progress.file_total as u64),
            format_count(progress.lines_read),
            format_count(progress.lines_processed),
            format_elapsed(progress.elapsed),
        );
    }

    fn file_without_matches(&mut self, file_name: &str) {
        tracing::info!("No lines to process in {file_name}");
    }

    fn file_skipped(&mut self, skipped: &SkippedFile) {
        if skipped.reason != SkipReason::Excluded {
            tracing::debug!(file = %skipped.file_name, reason = ?skipped.reason, "skipped file");
        }
    }
}
