//! Record-level inclusion rules.

use glob::{MatchOptions, Pattern, PatternError};

use crate::dtc::Record;

pub(crate) const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compile an fnmatch-style glob. Names are not paths, so a run of `*` is a
/// single wildcard rather than a recursive one.
pub(crate) fn compile_glob(pattern: &str) -> Result<Pattern, PatternError> {
    let mut collapsed = String::with_capacity(pattern.len());
    for ch in pattern.trim().chars() {
        if ch == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(ch);
    }
    Pattern::new(&collapsed)
}

/// Which records a scan keeps. Never mutated once a scan starts.
#[derive(Debug, Clone)]
pub struct Selection {
    /// `None` matches every id.
    variant_id: Option<Pattern>,
    chromosomes: Option<Vec<Pattern>>,
    pub chromosome_start: u8,
    /// Records above this chromosome are never counted and stop the file early.
    pub chromosome_end: Option<u8>,
    pub position_start: u64,
    pub position_end: Option<u64>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            variant_id: None,
            chromosomes: None,
            chromosome_start: 0,
            chromosome_end: None,
            position_start: 0,
            position_end: None,
        }
    }
}

impl Selection {
    /// Restrict variant ids to a glob such as `RS104*`. Matching ignores case.
    pub fn with_variant_id(mut self, pattern: &str) -> Result<Self, PatternError> {
        self.variant_id = Some(compile_glob(&pattern.to_uppercase())?);
        Ok(self)
    }

    /// Add a chromosome glob to the allow-list. With no entries every chromosome passes.
    pub fn with_chromosome(mut self, pattern: &str) -> Result<Self, PatternError> {
        let pattern = compile_glob(pattern)?;
        self.chromosomes.get_or_insert_with(Vec::new).push(pattern);
        Ok(self)
    }

    pub fn with_chromosome_range(mut self, start: u8, end: Option<u8>) -> Self {
        self.chromosome_start = start;
        self.chromosome_end = end;
        self
    }

    pub fn with_position_range(mut self, start: u64, end: Option<u64>) -> Self {
        self.position_start = start;
        self.position_end = end;
        self
    }

    pub fn variant_id_pattern(&self) -> &str {
        self.variant_id.as_ref().map_or("*", Pattern::as_str)
    }

    pub fn chromosome_patterns(&self) -> Option<impl Iterator<Item = &str>> {
        self.chromosomes
            .as_ref()
            .map(|patterns| patterns.iter().map(Pattern::as_str))
    }

    /// True once a sorted file has moved past every chromosome we could count.
    pub fn is_past_end(&self, record: &Record) -> bool {
        self.chromosome_end
            .is_some_and(|end| record.chromosome > end)
    }

    pub fn accepts(&self, record: &Record) -> bool {
        self.accepts_variant_id(&record.variant_id)
            && self.accepts_chromosome(record.chromosome)
            && self.accepts_position(record.position)
    }

    fn accepts_variant_id(&self, variant_id: &str) -> bool {
        self.variant_id.as_ref().is_none_or(|pattern| {
            pattern.matches_with(&variant_id.to_uppercase(), GLOB_OPTIONS)
        })
    }

    fn accepts_chromosome(&self, chromosome: u8) -> bool {
        if chromosome < self.chromosome_start
            || self.chromosome_end.is_some_and(|end| chromosome > end)
        {
            return false;
        }
        match &self.chromosomes {
            None => true,
            Some(patterns) => {
                let name = chromosome.to_string();
                patterns
                    .iter()
                    .any(|pattern| pattern.matches_with(&name, GLOB_OPTIONS))
            }
        }
    }

    fn accepts_position(&self, position: u64) -> bool {
        position >= self.position_start && self.position_end.is_none_or(|end| position <= end)
    }
}
