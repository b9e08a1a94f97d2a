//! Assigns candidate files to cohort labels.

use glob::{Pattern, PatternError};

use crate::filter::{GLOB_OPTIONS, compile_glob};

/// Label used for every file when no group rules are configured.
pub const DEFAULT_LABEL: &str = "Default";

/// Files whose names contain this marker hold exome-only data and are never scanned.
pub const EXOME_MARKER: &str = "-exome-";

/// A labelled set of file-name globs. Lower priorities are checked first.
#[derive(Debug, Clone)]
pub struct FileGroupRule {
    label: String,
    priority: i64,
    selectors: Vec<Pattern>,
}

impl FileGroupRule {
    pub fn new(label: impl Into<String>, priority: i64) -> Self {
        Self {
            label: label.into(),
            priority,
            selectors: Vec::new(),
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Result<Self, PatternError> {
        self.add_selector(selector)?;
        Ok(self)
    }

    pub fn add_selector(&mut self, selector: &str) -> Result<(), PatternError> {
        self.selectors.push(compile_glob(selector)?);
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(Pattern::as_str)
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches_with(file_name, GLOB_OPTIONS))
    }
}

/// Outcome of classifying one file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Label(&'a str),
    /// No group rule matched.
    Excluded,
    /// Exome-only data, skipped whatever the rules say.
    Bypassed,
}

#[derive(Debug, Clone, Default)]
pub struct FileClassifier {
    rules: Vec<FileGroupRule>,
}

impl FileClassifier {
    pub fn new(rules: impl IntoIterator<Item = FileGroupRule>) -> Self {
        let mut classifier = Self::default();
        for rule in rules {
            classifier.add_rule(rule);
        }
        classifier
    }

    /// Insert keeping ascending priority; ties keep insertion order.
    pub fn add_rule(&mut self, rule: FileGroupRule) {
        let index = self
            .rules
            .partition_point(|existing| existing.priority <= rule.priority);
        self.rules.insert(index, rule);
    }

    /// Append a selector to the rule with this label, creating the rule if needed.
    /// An existing rule keeps the priority it was created with.
    pub fn add_selector(
        &mut self,
        label: &str,
        priority: i64,
        selector: &str,
    ) -> Result<(), PatternError> {
        if let Some(rule) = self.rules.iter_mut().find(|rule| rule.label == label) {
            return rule.add_selector(selector);
        }
        self.add_rule(FileGroupRule::new(label, priority).with_selector(selector)?);
        Ok(())
    }

    pub fn rules(&self) -> &[FileGroupRule] {
        &self.rules
    }

    pub fn is_bypassed(file_name: &str) -> bool {
        file_name.contains(EXOME_MARKER)
    }

    pub fn classify<'a>(&'a self, file_name: &str) -> Classification<'a> {
        if Self::is_bypassed(file_name) {
            return Classification::Bypassed;
        }
        if self.rules.is_empty() {
            return Classification::Label(DEFAULT_LABEL);
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(file_name))
            .map_or(Classification::Excluded, |rule| {
                Classification::Label(rule.label())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_priority_number_wins() {
        let classifier = FileClassifier::new([
            FileGroupRule::new("GroupB", 2).with_selector("*y*").unwrap(),
            FileGroupRule::new("GroupA", 1).with_selector("*x*").unwrap(),
        ]);
        assert_eq!(classifier.classify("file_xy.txt"), Classification::Label("GroupA"));
        assert_eq!(classifier.classify("file_y.txt"), Classification::Label("GroupB"));
        assert_eq!(classifier.classify("file_z.txt"), Classification::Excluded);
    }

    #[test]
    fn rules_are_reordered_on_insert() {
        let mut classifier = FileClassifier::default();
        classifier.add_rule(FileGroupRule::new("Group 2", 2).with_selector("*bde*").unwrap());
        classifier.add_rule(FileGroupRule::new("Group 1", 1).with_selector("*bdef*").unwrap());
        classifier.add_rule(FileGroupRule::new("Group 3", 3).with_selector("*hij*").unwrap());

        let labels: Vec<&str> = classifier.rules().iter().map(FileGroupRule::label).collect();
        assert_eq!(labels, vec!["Group 1", "Group 2", "Group 3"]);
        assert_eq!(
            classifier.classify("file_with_bdef_in_name"),
            Classification::Label("Group 1")
        );
        assert_eq!(
            classifier.classify("file_with_bde_in_name"),
            Classification::Label("Group 2")
        );
        assert_eq!(
            classifier.classify("file_with_hij_in_name"),
            Classification::Label("Group 3")
        );
    }

    #[test]
    fn repeated_stars_in_selectors() {
        let classifier = FileClassifier::new([FileGroupRule::new("Ones", 1)
            .with_selector("user1**.txt")
            .unwrap()]);
        assert_eq!(
            classifier.rules()[0].selectors().collect::<Vec<_>>(),
            vec!["user1*.txt"]
        );
        assert_eq!(
            classifier.classify("user12_file3.23andme.txt"),
            Classification::Label("Ones")
        );
        assert_eq!(
            classifier.classify("user2_file3.23andme.txt"),
            Classification::Excluded
        );
    }

    #[test]
    fn no_rules_means_default_group() {
        let classifier = FileClassifier::default();
        assert_eq!(
            classifier.classify("user1_file1.23andme.txt"),
            Classification::Label(DEFAULT_LABEL)
        );
    }

    #[test]
    fn exome_files_are_bypassed() {
        let classifier = FileClassifier::new([FileGroupRule::new("All", 0)
            .with_selector("*")
            .unwrap()]);
        assert_eq!(
            classifier.classify("user7_file3-exome-vcf.23andme.txt"),
            Classification::Bypassed
        );
        assert_eq!(
            FileClassifier::default().classify("a-exome-b.txt"),
            Classification::Bypassed
        );
    }

    #[test]
    fn add_selector_extends_existing_label() {
        let mut classifier = FileClassifier::default();
        classifier.add_selector("Rollers", 1, "user10_*").unwrap();
        classifier.add_selector("Rollers", 1, "user11_*").unwrap();
        classifier.add_selector("Others", 2, "*.txt").unwrap();
        assert_eq!(classifier.rules().len(), 2);
        assert_eq!(
            classifier.rules()[0].selectors().collect::<Vec<_>>(),
            vec!["user10_*", "user11_*"]
        );
        assert_eq!(
            classifier.classify("user11_file2.23andme.txt"),
            Classification::Label("Rollers")
        );
        assert_eq!(
            classifier.classify("user12_file2.23andme.txt"),
            Classification::Label("Others")
        );
    }
}
