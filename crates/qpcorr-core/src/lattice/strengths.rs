use crate::domain::MagnetStrength;
use std::collections::BTreeMap;

/// Quadrupole strengths keyed by family name, as read from the sequence file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrengthTable {
    records: Vec<MagnetStrength>,
    by_name: BTreeMap<String, usize>,
}

impl StrengthTable {
    pub fn new(records: Vec<MagnetStrength>) -> Self {
        let mut by_name = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            by_name
                .entry(record.name.to_ascii_uppercase())
                .or_insert(index);
        }
        Self { records, by_name }
    }

    pub fn records(&self) -> &[MagnetStrength] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, family: &str) -> Option<&MagnetStrength> {
        self.by_name
            .get(&family.to_ascii_uppercase())
            .map(|index| &self.records[*index])
    }

    /// Looks up the integrated strength of a lattice element by the part of its
    /// name before the first `.` and applies `scale`.
    pub fn kl_for(&self, element_name: &str, scale: f64) -> Option<f64> {
        let family = element_name.split('.').next().unwrap_or(element_name);
        self.get(family).map(|record| record.kl * scale)
    }
}
