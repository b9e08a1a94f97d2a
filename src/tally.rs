//! Per-variant genotype counts, split by file group.
//!
//! The layout is `(variant id, chromosome, position) → label → genotype → count`.
//! [`ResultSet::record`] is the only way counts change; everything else is a
//! read-only view for reporting.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Identity of one aggregated site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
struct VariantKey {
    pub variant_id: String,
    pub chromosome: u8,
    pub position: u64,
}

/// Genotype → number of times it was observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GenotypeHistogram(BTreeMap<String, u64>);

impl GenotypeHistogram {
    fn increment(&mut self, genotype: &str) {
        *self.0.entry(genotype.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, genotype: &str) -> u64 {
        self.0.get(genotype).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(genotype, count)| (genotype.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

/// Counts for one label at one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    label: String,
    genotypes: GenotypeHistogram,
}

impl Group {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            genotypes: GenotypeHistogram::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn count(&self, genotype: &str) -> u64 {
        self.genotypes.get(genotype)
    }

    pub fn genotypes(&self) -> &GenotypeHistogram {
        &self.genotypes
    }
}

/// Everything seen for one `(variant id, chromosome, position)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantResult {
    #[serde(flatten)]
    key: VariantKey,
    groups: BTreeMap<String, Group>,
}

impl VariantResult {
    fn new(key: VariantKey) -> Self {
        Self {
            key,
            groups: BTreeMap::new(),
        }
    }

    fn add_one(&mut self, label: &str, genotype: &str) {
        self.groups
            .entry(label.to_string())
            .or_insert_with(|| Group::new(label))
            .genotypes
            .increment(genotype);
    }

    pub fn variant_id(&self) -> &str {
        &self.key.variant_id
    }

    pub fn chromosome(&self) -> u8 {
        self.key.chromosome
    }

    pub fn position(&self) -> u64 {
        self.key.position
    }

    pub fn group(&self, label: &str) -> Option<&Group> {
        self.groups.get(label)
    }

    /// Groups in label order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }
}

/// All results of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    results: BTreeMap<VariantKey, VariantResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one observation of `genotype` for `label` at the given site.
    ///
    /// Repeated identical calls are repeated observations: counts add up, they
    /// are never deduplicated.
    pub fn record(
        &mut self,
        label: &str,
        variant_id: &str,
        chromosome: u8,
        position: u64,
        genotype: &str,
    ) {
        let key = VariantKey {
            variant_id: variant_id.to_string(),
            chromosome,
            position,
        };
        self.results
            .entry(key)
            .or_insert_with_key(|key| VariantResult::new(key.clone()))
            .add_one(label, genotype);
    }

    pub fn get(&self, variant_id: &str, chromosome: u8, position: u64) -> Option<&VariantResult> {
        self.results.get(&VariantKey {
            variant_id: variant_id.to_string(),
            chromosome,
            position,
        })
    }

    /// Results ordered by variant id, then chromosome, then position.
    pub fn iter(&self) -> impl Iterator<Item = &VariantResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.results.values())
    }
}
