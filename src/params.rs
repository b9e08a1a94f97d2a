//! Parameter file loader.
//!
//! The file holds one `KEY<TAB>VALUE` pair per line, split at the first tab;
//! lines without a tab are ignored with a warning. `#` starts a comment line
//! and keys are case-insensitive. File groups use keys of the form
//! `FILES:<label>:<priority>` with a comma-separated list of file-name globs.
//! The example below is tab-separated:
//!
//! ```text
//! DIR	/data/opensnp
//! RSID	rs104*
//! CHROMEND	22
//! FILES:Tongue rollers:1	user10_*.txt, user11_*.txt
//! FILES:Non-rollers:2	user20_*.txt
//! ```
//!
//! Anything not given keeps the documented default of [`ScanConfig::default`].

use std::{fs, path::Path, path::PathBuf, str::FromStr};

use glob::PatternError;
use thiserror::Error;

use crate::scan::ScanConfig;

const TRUE_VALUES: [&str; 5] = ["TRUE", "T", "1", "YES", "Y"];

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read parameter file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {key} expects a non-negative integer, got '{value}'")]
    InvalidNumber {
        line: usize,
        key: String,
        value: String,
    },
    #[error("line {line}: invalid pattern for {key}")]
    InvalidPattern {
        line: usize,
        key: String,
        #[source]
        source: PatternError,
    },
    #[error("line {line}: file group key '{key}' must look like FILES:<label>:<priority>")]
    MalformedFileGroup { line: usize, key: String },
    #[error("line {line}: file group '{label}' was already given priority {existing}, not {priority}")]
    ConflictingPriority {
        line: usize,
        label: String,
        existing: i64,
        priority: i64,
    },
}

/// Interprets `TRUE`, `T`, `1`, `YES` and `Y` (any case) as true; everything else is false.
pub fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_uppercase();
    TRUE_VALUES.contains(&value.as_str())
}

pub fn load(path: &Path) -> Result<ScanConfig, ParamsError> {
    let text = fs::read_to_string(path).map_err(|source| ParamsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

pub fn parse(text: &str) -> Result<ScanConfig, ParamsError> {
    let mut config = ScanConfig::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('\t') else {
            tracing::warn!(line, "ignoring parameter line without a tab-separated value");
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        let keyword = key.split(':').next().unwrap_or(key).trim().to_uppercase();

        match keyword.as_str() {
            "DIR" => config.directory = PathBuf::from(value),
            "RSID" => {
                config.selection = config
                    .selection
                    .with_variant_id(value)
                    .map_err(|source| invalid_pattern(line, key, source))?;
            }
            "CHROMOSOMES" => {
                for pattern in value.split(',').filter(|p| !p.trim().is_empty()) {
                    config.selection = config
                        .selection
                        .with_chromosome(pattern)
                        .map_err(|source| invalid_pattern(line, key, source))?;
                }
            }
            "CHROMSTART" => config.selection.chromosome_start = number(line, key, value)?,
            "CHROMEND" => {
                let end: u8 = number(line, key, value)?;
                config.selection.chromosome_end = (end > 0).then_some(end);
            }
            "POSSTART" => config.selection.position_start = number(line, key, value)?,
            "POSEND" => config.selection.position_end = Some(number(line, key, value)?),
            "SHOWFILEPROGRESS" => config.progress.show_file_progress = parse_bool(value),
            "SHOWPROGRESS#LINES" => {
                config.progress.show_progress_lines = number(line, key, value)?;
            }
            "SHOWSELECTEDFILES" => config.progress.show_selected_files = parse_bool(value),
            "FILES" => {
                let (label, priority) = file_group_key(line, key)?;
                if let Some(existing) = config
                    .classifier
                    .rules()
                    .iter()
                    .find(|rule| rule.label() == label)
                    .map(|rule| rule.priority())
                    && existing != priority
                {
                    return Err(ParamsError::ConflictingPriority {
                        line,
                        label: label.to_string(),
                        existing,
                        priority,
                    });
                }
                for selector in value.split(',').filter(|s| !s.trim().is_empty()) {
                    config
                        .classifier
                        .add_selector(label, priority, selector)
                        .map_err(|source| invalid_pattern(line, key, source))?;
                }
            }
            _ => tracing::warn!(line, key, "ignoring unknown parameter"),
        }
    }

    Ok(config)
}

fn number<T: FromStr>(line: usize, key: &str, value: &str) -> Result<T, ParamsError> {
    value.parse().map_err(|_| ParamsError::InvalidNumber {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn invalid_pattern(line: usize, key: &str, source: PatternError) -> ParamsError {
    ParamsError::InvalidPattern {
        line,
        key: key.to_string(),
        source,
    }
}

/// Splits `FILES:<label>:<priority>`. The label may itself contain colons.
fn file_group_key(line: usize, key: &str) -> Result<(&str, i64), ParamsError> {
    let malformed = || ParamsError::MalformedFileGroup {
        line,
        key: key.to_string(),
    };
    let rest = key.split_once(':').map(|(_, rest)| rest).ok_or_else(malformed)?;
    let (label, priority) = rest.rsplit_once(':').ok_or_else(malformed)?;
    let label = label.trim();
    if label.is_empty() {
        return Err(malformed());
    }
    let priority = priority.trim().parse().map_err(|_| malformed())?;
    Ok((label, priority))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;

    #[test]
    fn defaults_when_empty() {
        let config = parse("# nothing here\n\n").unwrap();
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.selection.variant_id_pattern(), "*");
        assert!(config.selection.chromosome_patterns().is_none());
        assert_eq!(config.selection.chromosome_start, 0);
        assert_eq!(config.selection.chromosome_end, None);
        assert_eq!(config.selection.position_start, 0);
        assert_eq!(config.selection.position_end, None);
        assert!(!config.progress.show_file_progress);
        assert_eq!(config.progress.show_progress_lines, 0);
        assert!(!config.progress.show_selected_files);
        assert!(config.classifier.rules().is_empty());
    }

    #[test]
    fn reads_every_key() {
        let text = "\
DIR\t/data/opensnp
rsid\trs104*
CHROMOSOMES\t1, 2
CHROMSTART\t1
CHROMEND\t22
POSSTART\t100
POSEND\t5000
ShowFileProgress\tyes
SHOWPROGRESS#LINES\t100000
SHOWSELECTEDFILES\tnope
FILES:Tongue rollers:1\tuser10_*.txt, user11_*.txt
FILES:Non-rollers:2\tuser20_*.txt
FILES:Tongue rollers:1\tuser13_*.txt
";
        let config = parse(text).unwrap();
        assert_eq!(config.directory, PathBuf::from("/data/opensnp"));
        assert_eq!(config.selection.variant_id_pattern(), "RS104*");
        assert_eq!(
            config.selection.chromosome_patterns().unwrap().collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert_eq!(config.selection.chromosome_start, 1);
        assert_eq!(config.selection.chromosome_end, Some(22));
        assert_eq!(config.selection.position_start, 100);
        assert_eq!(config.selection.position_end, Some(5000));
        assert!(config.progress.show_file_progress);
        assert_eq!(config.progress.show_progress_lines, 100_000);
        assert!(!config.progress.show_selected_files);

        let rules = config.classifier.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].label(), "Tongue rollers");
        assert_eq!(rules[0].priority(), 1);
        assert_eq!(
            rules[0].selectors().collect::<Vec<_>>(),
            vec!["user10_*.txt", "user11_*.txt", "user13_*.txt"]
        );
        assert_eq!(
            config.classifier.classify("user20_file3.txt"),
            Classification::Label("Non-rollers")
        );
    }

    #[test]
    fn module_example_parses() {
        let text = "DIR\t/data/opensnp\nRSID\trs104*\nCHROMEND\t22\n\
FILES:Tongue rollers:1\tuser10_*.txt, user11_*.txt\nFILES:Non-rollers:2\tuser20_*.txt\n";
        let config = parse(text).unwrap();
        assert_eq!(config.directory, PathBuf::from("/data/opensnp"));
        assert_eq!(config.selection.chromosome_end, Some(22));
        assert_eq!(config.classifier.rules().len(), 2);
    }

    #[test]
    fn space_separated_lines_are_ignored() {
        let config = parse("DIR    /data/opensnp\nCHROMEND 22\n").unwrap();
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.selection.chromosome_end, None);
    }

    #[test]
    fn chromosome_end_zero_disables_early_exit() {
        let config = parse("CHROMEND\t0\n").unwrap();
        assert_eq!(config.selection.chromosome_end, None);
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse("# header\nPOSEND\tlots\n").unwrap_err();
        match err {
            ParamsError::InvalidNumber { line, key, value } => {
                assert_eq!(line, 2);
                assert_eq!(key, "POSEND");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_file_group_key() {
        assert!(matches!(
            parse("FILES:NoPriority\t*.txt\n"),
            Err(ParamsError::MalformedFileGroup { line: 1, .. })
        ));
        assert!(matches!(
            parse("FILES::3\t*.txt\n"),
            Err(ParamsError::MalformedFileGroup { .. })
        ));
    }

    #[test]
    fn same_label_with_another_priority_is_rejected() {
        let err = parse("FILES:A:1\tuser1_*\nFILES:A:5\tuser2_*\n").unwrap_err();
        match err {
            ParamsError::ConflictingPriority {
                line,
                label,
                existing,
                priority,
            } => {
                assert_eq!(line, 2);
                assert_eq!(label, "A");
                assert_eq!(existing, 1);
                assert_eq!(priority, 5);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn repeated_stars_are_accepted() {
        let config = parse("RSID\trs1**\nFILES:Ones:1\tuser1**.txt\n").unwrap();
        assert_eq!(config.selection.variant_id_pattern(), "RS1*");
        assert_eq!(
            config.classifier.rules()[0].selectors().collect::<Vec<_>>(),
            vec!["user1*.txt"]
        );
    }

    #[test]
    fn label_may_contain_colons() {
        let config = parse("FILES:Ratio 1:2:5\t*.txt\n").unwrap();
        assert_eq!(config.classifier.rules()[0].label(), "Ratio 1:2");
        assert_eq!(config.classifier.rules()[0].priority(), 5);
    }

    #[test]
    fn booleans() {
        for value in ["TRUE", "true", "T", "1", "yes", "Y"] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["false", "0", "no", "", "2"] {
            assert!(!parse_bool(value), "{value}");
        }
    }
}
