//! # courserec Core
//!
//! Core library for the courserec course recommender.
//!
//! This crate provides the retrieval engine:
//!
//! - [`Vectorizer`] - Label tokenization into sparse term-count [`DocumentVector`]s
//! - [`SimilarityMatrix`] - Dense, symmetric pairwise cosine similarity
//! - [`ranker`] - Top-K neighbors of a row, excluding the row itself
//! - [`FuzzyResolver`] - Closest catalog label for a misspelled query
//! - [`CatalogLookup`] - Label to row index and back
//! - [`Recommender`] - All of the above behind an atomically swapped snapshot
//!
//! ## Example
//!
//! ```rust
//! use courserec_core::{Catalog, Recommender, RecommenderConfig};
//!
//! let catalog = Catalog::from_labels([
//!     "Intro to Data Science",
//!     "Advanced Data Science",
//!     "Intro to Cooking",
//! ]);
//! let recommender = Recommender::new(catalog, RecommenderConfig::default()).unwrap();
//!
//! // Misspelled free text falls back to fuzzy resolution
//! let outcome = recommender.recommend_by_free_text("data scence", 2, 0.6).unwrap();
//! assert!(outcome.is_found());
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod ranker;
pub mod similarity;
pub mod vector;
pub mod vectorizer;

pub use catalog::{Catalog, CatalogEntry, CatalogLookup};
pub use engine::{Outcome, RecommendedItem, Recommender, RecommenderConfig, Snapshot};
pub use error::{Error, Result};
pub use fuzzy::{FuzzyMatch, FuzzyMetric, FuzzyResolver, DEFAULT_CUTOFF};
pub use ranker::Neighbor;
pub use similarity::SimilarityMatrix;
pub use vector::DocumentVector;
pub use vectorizer::{Vectorizer, Vocabulary};
