//! Header mapping from raw CSV column headers to canonical field keys.

use std::collections::BTreeSet;
use std::fmt;

use crate::models::field::FieldKey;

/// Sentinel id for columns that should be ignored.
pub const NO_MAPPING: &str = "no_mapping";

/// Where a raw CSV column lands in the canonical model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingTarget {
    Field(FieldKey),
    NoMapping,
}

impl MappingTarget {
    pub fn field(&self) -> Option<FieldKey> {
        match self {
            Self::Field(key) => Some(*key),
            Self::NoMapping => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Field(key) => key.as_str(),
            Self::NoMapping => NO_MAPPING,
        }
    }
}

impl fmt::Display for MappingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header → target table. Each header appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    entries: Vec<(String, MappingTarget)>,
}

impl HeaderMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the target for a header, keeping first-insert order.
    pub fn insert(&mut self, header: impl Into<String>, target: MappingTarget) {
        let header = header.into();
        match self.entries.iter_mut().find(|(h, _)| *h == header) {
            Some(entry) => entry.1 = target,
            None => self.entries.push((header, target)),
        }
    }

    pub fn get(&self, header: &str) -> Option<MappingTarget> {
        self.entries
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, target)| *target)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn header_set(&self) -> BTreeSet<String> {
        self.entries.iter().map(|(h, _)| h.clone()).collect()
    }

    pub fn entries(&self) -> &[(String, MappingTarget)] {
        &self.entries
    }

    /// Canonical keys some header maps to.
    pub fn mapped_keys(&self) -> BTreeSet<FieldKey> {
        self.entries.iter().filter_map(|(_, t)| t.field()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
