//! Canonical rows: one data CSV row re-keyed by canonical field keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::field::{FieldKey, FieldScope};

/// Field key → raw string value for a single data row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRow(BTreeMap<FieldKey, String>);

impl CanonicalRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Value for `key`, or "" when the column was absent or unmapped.
    pub fn value(&self, key: FieldKey) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Copy of the fields belonging to one entity level.
    pub fn scoped(&self, scope: FieldScope) -> BTreeMap<FieldKey, String> {
        self.0
            .iter()
            .filter(|(key, _)| key.scope() == scope)
            .map(|(key, value)| (*key, value.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FieldKey, String)> for CanonicalRow {
    fn from_iter<I: IntoIterator<Item = (FieldKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
