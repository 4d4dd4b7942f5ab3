use crate::fuzzy::normalize;
use crate::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A catalog item: its unique label plus display attributes (url, price, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

impl CatalogEntry {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: Map::new(),
        }
    }

    pub fn with_payload(label: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            label: label.into(),
            payload,
        }
    }

    /// Builder-style attribute setter
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Case-folded, trimmed label used as the identity key
    pub fn key(&self) -> String {
        normalize(&self.label)
    }
}

/// Ordered, label-unique sequence of entries.
///
/// Order defines the row index space of the similarity matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog, dropping entries whose normalized label was already seen.
    ///
    /// The first occurrence wins; every dropped duplicate is logged.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut seen: AHashMap<String, usize> = AHashMap::with_capacity(entries.len());
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.key();
            if let Some(&first) = seen.get(&key) {
                warn!(label = %entry.label, first_index = first, "Dropping duplicate catalog label");
                continue;
            }
            seen.insert(key, kept.len());
            kept.push(entry);
        }
        Self { entries: kept }
    }

    /// Catalog of bare labels
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels.into_iter().map(CatalogEntry::new).collect())
    }

    #[inline]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable label <-> row index mapping, built once per catalog load
#[derive(Debug, Clone)]
pub struct CatalogLookup {
    catalog: Catalog,
    index: AHashMap<String, usize>,
}

impl CatalogLookup {
    pub fn new(catalog: Catalog) -> Self {
        let index = catalog
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.key(), i))
            .collect();
        Self { catalog, index }
    }

    /// Row index of `label`, matched after trimming and case folding
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.find(label)
            .ok_or_else(|| Error::NotFound(label.to_string()))
    }

    /// Like [`index_of`](Self::index_of) but absence is `None`
    #[inline]
    pub fn find(&self, label: &str) -> Option<usize> {
        self.index.get(&normalize(label)).copied()
    }

    pub fn label_at(&self, index: usize) -> Result<&CatalogEntry> {
        self.catalog.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.catalog.len(),
        })
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}
