//! Recommender engine
//!
//! Holds the current catalog, vocabulary and similarity matrix as one
//! immutable [`Snapshot`] behind a lock-protected `Arc`. Requests clone the
//! `Arc` and run without holding any lock; rebuilds construct a new snapshot
//! off to the side and swap it in whole, so a reader sees either the old or
//! the new state and never a mix.

use crate::catalog::{Catalog, CatalogEntry, CatalogLookup};
use crate::fuzzy::{normalize, validate_cutoff, FuzzyMetric, FuzzyResolver, DEFAULT_CUTOFF};
use crate::ranker;
use crate::similarity::{SimilarityMatrix, DEFAULT_PARALLEL_THRESHOLD};
use crate::vector::DocumentVector;
use crate::vectorizer::{Vectorizer, Vocabulary};
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Configuration for a [`Recommender`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Number of results when the caller does not ask for a specific count
    pub default_k: usize,
    /// Largest `k` accepted per HTTP request. The engine itself takes any `k >= 1`.
    pub max_k: usize,
    /// Minimum fuzzy ratio for free-text resolution
    pub fuzzy_cutoff: f64,
    pub fuzzy_metric: FuzzyMetric,
    /// Catalog size above which the matrix build runs on rayon workers
    pub parallel_threshold: usize,
    /// Tokens shorter than this are not vocabulary terms
    pub min_token_len: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            default_k: 10,
            max_k: 100,
            fuzzy_cutoff: DEFAULT_CUTOFF,
            fuzzy_metric: FuzzyMetric::Lcs,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            min_token_len: 1,
        }
    }
}

impl RecommenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_k == 0 {
            return Err(Error::InvalidConfig("default_k must be >= 1".to_string()));
        }
        if self.default_k > self.max_k {
            return Err(Error::InvalidConfig(format!(
                "default_k ({}) exceeds max_k ({})",
                self.default_k, self.max_k
            )));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_cutoff) {
            return Err(Error::InvalidConfig(format!(
                "fuzzy_cutoff must be within [0, 1], got {}",
                self.fuzzy_cutoff
            )));
        }
        Ok(())
    }

    fn vectorizer(&self) -> Vectorizer {
        Vectorizer::new().with_min_token_len(self.min_token_len)
    }

    /// Reject request sizes above `max_k`
    pub fn check_request_k(&self, k: usize) -> Result<()> {
        if k > self.max_k {
            return Err(Error::InvalidArgument(format!(
                "k must be <= {}, got {}",
                self.max_k, k
            )));
        }
        Ok(())
    }
}

/// One recommended catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedItem {
    /// 1-based rank after excluding the query entry
    pub rank: usize,
    pub index: usize,
    pub label: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

/// Result of a recommendation request.
///
/// A missing label and a failed fuzzy resolution are ordinary outcomes here,
/// not errors; `Err` from the engine means bad arguments or a broken invariant.
#[must_use]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Found {
        /// Catalog label the recommendations are for
        resolved_label: String,
        /// Ratio of the fuzzy match, `None` when the label matched exactly
        fuzzy_ratio: Option<f64>,
        items: Vec<RecommendedItem>,
    },
    NotFound {
        label: String,
    },
    NoMatch {
        query: String,
    },
}

impl Outcome {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found { .. })
    }

    /// Recommended items, empty unless `Found`
    pub fn items(&self) -> &[RecommendedItem] {
        match self {
            Outcome::Found { items, .. } => items,
            _ => &[],
        }
    }

    pub fn resolved_label(&self) -> Option<&str> {
        match self {
            Outcome::Found { resolved_label, .. } => Some(resolved_label),
            _ => None,
        }
    }

    /// Turn the misses into `Error::NotFound` / `Error::NoMatch`
    pub fn into_result(self) -> Result<Vec<RecommendedItem>> {
        match self {
            Outcome::Found { items, .. } => Ok(items),
            Outcome::NotFound { label } => Err(Error::NotFound(label)),
            Outcome::NoMatch { query } => Err(Error::NoMatch(query)),
        }
    }
}

/// Everything derived from one catalog load. Never mutated after construction.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    lookup: CatalogLookup,
    vocabulary: Vocabulary,
    matrix: SimilarityMatrix,
}

impl Snapshot {
    /// Vectorize `catalog` and compute its similarity matrix
    pub fn build(catalog: Catalog, config: &RecommenderConfig, generation: u64) -> Result<Self> {
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let started = Instant::now();
        let (vocabulary, vectors) = config.vectorizer().build(&catalog.labels());
        let matrix = SimilarityMatrix::compute_with_threshold(&vectors, config.parallel_threshold);
        info!(
            generation,
            entries = catalog.len(),
            terms = vocabulary.len(),
            nonzeros = vectors.iter().map(DocumentVector::nnz).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Similarity matrix built"
        );
        Ok(Self {
            generation,
            lookup: CatalogLookup::new(catalog),
            vocabulary,
            matrix,
        })
    }

    /// Use a precomputed matrix; its shape must match the catalog
    pub fn with_matrix(
        catalog: Catalog,
        matrix: SimilarityMatrix,
        config: &RecommenderConfig,
        generation: u64,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        if matrix.dim() != catalog.len() {
            return Err(Error::ShapeMismatch {
                expected: catalog.len(),
                rows: matrix.dim(),
                cols: matrix.dim(),
            });
        }
        let (vocabulary, _) = config.vectorizer().build(&catalog.labels());
        info!(generation, entries = catalog.len(), "Loaded precomputed similarity matrix");
        Ok(Self {
            generation,
            lookup: CatalogLookup::new(catalog),
            vocabulary,
            matrix,
        })
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn lookup(&self) -> &CatalogLookup {
        &self.lookup
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        self.lookup.catalog()
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[inline]
    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Top-`k` neighbors of row `index` with their catalog entries attached
    pub fn recommend_index(&self, index: usize, k: usize) -> Result<Vec<RecommendedItem>> {
        ranker::recommend(index, &self.matrix, k)?
            .into_iter()
            .map(|n| {
                let entry = self.lookup.label_at(n.index)?;
                Ok(RecommendedItem {
                    rank: n.rank,
                    index: n.index,
                    label: entry.label.clone(),
                    score: n.score,
                    payload: entry.payload.clone(),
                })
            })
            .collect()
    }
}

/// Thread-safe recommender over an atomically swappable snapshot
pub struct Recommender {
    config: RecommenderConfig,
    current: RwLock<Arc<Snapshot>>,
    rebuild_lock: Mutex<()>,
}

impl Recommender {
    pub fn new(catalog: Catalog, config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        let snapshot = Snapshot::build(catalog, &config, 0)?;
        Ok(Self::from_snapshot(snapshot, config))
    }

    /// Start from a precomputed similarity matrix instead of computing one
    pub fn with_matrix(
        catalog: Catalog,
        matrix: SimilarityMatrix,
        config: RecommenderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let snapshot = Snapshot::with_matrix(catalog, matrix, &config, 0)?;
        Ok(Self::from_snapshot(snapshot, config))
    }

    fn from_snapshot(snapshot: Snapshot, config: RecommenderConfig) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(snapshot)),
            rebuild_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// The snapshot current at the time of the call
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    /// Recommend neighbors of an exact (trimmed, case-insensitive) catalog label
    pub fn recommend_by_label(&self, label: &str, k: usize) -> Result<Outcome> {
        check_k(k)?;
        let snapshot = self.snapshot();
        match snapshot.lookup().find(label) {
            Some(index) => {
                debug!(label, index, k, "Exact label match");
                found(&snapshot, index, None, k)
            }
            None => {
                debug!(label, "Label not in catalog");
                Ok(Outcome::NotFound { label: label.to_string() })
            }
        }
    }

    /// Recommend from free text: exact label first, then fuzzy resolution
    pub fn recommend_by_free_text(&self, query: &str, k: usize, cutoff: f64) -> Result<Outcome> {
        check_k(k)?;
        validate_cutoff(cutoff)?;
        let snapshot = self.snapshot();

        if let Some(index) = snapshot.lookup().find(query) {
            return found(&snapshot, index, None, k);
        }

        let labels = snapshot.catalog().labels();
        let resolver = FuzzyResolver::new(self.config.fuzzy_metric);
        match resolver.best_match(query, &labels, cutoff)? {
            Some(m) => {
                debug!(query, resolved = labels[m.index], ratio = m.ratio, "Fuzzy match");
                found(&snapshot, m.index, Some(m.ratio), k)
            }
            None => {
                debug!(query, cutoff, "No fuzzy match above cutoff");
                Ok(Outcome::NoMatch { query: query.to_string() })
            }
        }
    }

    /// Free-text recommendation with the configured `default_k` and cutoff
    pub fn recommend(&self, query: &str) -> Result<Outcome> {
        self.recommend_by_free_text(query, self.config.default_k, self.config.fuzzy_cutoff)
    }

    /// Top-`k` neighbors of a row index in the current snapshot
    pub fn recommend_index(&self, index: usize, k: usize) -> Result<Vec<RecommendedItem>> {
        check_k(k)?;
        self.snapshot().recommend_index(index, k)
    }

    /// Case-insensitive substring search over labels, in catalog order
    pub fn search_labels(&self, term: &str, limit: usize) -> Vec<CatalogEntry> {
        let term = normalize(term);
        if term.is_empty() {
            return Vec::new();
        }
        self.snapshot()
            .catalog()
            .entries()
            .iter()
            .filter(|entry| entry.label.to_lowercase().contains(&term))
            .take(limit)
            .cloned()
            .collect()
    }

    /// First `limit` catalog entries
    pub fn preview(&self, limit: usize) -> Vec<CatalogEntry> {
        self.snapshot()
            .catalog()
            .entries()
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Replace the catalog and recompute everything. Returns the new generation.
    ///
    /// Rebuilds are serialized; readers keep using the previous snapshot until
    /// the swap. On error the previous snapshot stays in place.
    pub fn rebuild(&self, catalog: Catalog) -> Result<u64> {
        let _guard = self.rebuild_lock.lock();
        let generation = self.generation() + 1;
        info!(generation, entries = catalog.len(), "Rebuilding recommender");
        let snapshot = Snapshot::build(catalog, &self.config, generation)?;
        *self.current.write() = Arc::new(snapshot);
        Ok(generation)
    }

    /// Replace the catalog using a precomputed matrix
    pub fn rebuild_with_matrix(&self, catalog: Catalog, matrix: SimilarityMatrix) -> Result<u64> {
        let _guard = self.rebuild_lock.lock();
        let generation = self.generation() + 1;
        let snapshot = Snapshot::with_matrix(catalog, matrix, &self.config, generation)?;
        *self.current.write() = Arc::new(snapshot);
        Ok(generation)
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidArgument("k must be >= 1".to_string()));
    }
    Ok(())
}

fn found(snapshot: &Snapshot, index: usize, fuzzy_ratio: Option<f64>, k: usize) -> Result<Outcome> {
    let resolved_label = snapshot.lookup().label_at(index)?.label.clone();
    let items = snapshot.recommend_index(index, k)?;
    Ok(Outcome::Found { resolved_label, fuzzy_ratio, items })
}
