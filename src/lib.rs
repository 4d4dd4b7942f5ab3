//! # courserec
//!
//! An in-memory course recommender. Course titles are turned into term-count
//! vectors, every pair of titles is scored by cosine similarity once, and a
//! recommendation is the top-K row of that matrix, excluding the course itself.
//! Misspelled titles are resolved to the closest catalog label first.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! courserec --catalog courses.csv serve --http-port 8080
//! curl -X POST localhost:8080/recommend/search -H 'content-type: application/json' \
//!      -d '{"query": "data scence", "k": 5}'
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use courserec::prelude::*;
//!
//! let catalog = Catalog::from_labels([
//!     "Intro to Data Science",
//!     "Advanced Data Science",
//!     "Intro to Cooking",
//! ]);
//! let recommender = Recommender::new(catalog, RecommenderConfig::default()).unwrap();
//!
//! let outcome = recommender.recommend_by_label("intro to data science", 2).unwrap();
//! assert_eq!(outcome.items()[0].label, "Advanced Data Science");
//! ```
//!
//! ## Crate Structure
//!
//! - `courserec-core` - Vectorizer, similarity matrix, ranker, fuzzy resolver, engine
//! - `courserec-storage` - CSV catalog source and precomputed matrix artifacts
//! - `courserec-api` - REST API

// Re-export core types
pub use courserec_core::{
    Catalog, CatalogEntry, CatalogLookup,
    Recommender, RecommenderConfig, Outcome, RecommendedItem, Snapshot,
    FuzzyMetric, FuzzyResolver, FuzzyMatch,
    SimilarityMatrix, Vectorizer, Vocabulary, DocumentVector, Neighbor,
    Error, Result,
};

// Re-export storage
pub use courserec_storage::{CsvCatalogSource, MatrixStore, StorageConfig, StorageManager};

// Re-export API
pub use courserec_api::{ApiState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Catalog, CatalogEntry,
        Recommender, RecommenderConfig, Outcome, RecommendedItem,
        FuzzyMetric,
        Error, Result,
        StorageConfig, StorageManager,
        RestApi,
    };
}
