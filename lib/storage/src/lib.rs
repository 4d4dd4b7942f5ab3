pub mod artifact;
pub mod catalog_source;
pub mod manager;

pub use artifact::{ArtifactDescription, MatrixArtifact, MatrixStore};
pub use catalog_source::{CsvCatalogSource, DEFAULT_LABEL_COLUMN};
pub use manager::{StorageConfig, StorageManager, DEFAULT_ARTIFACT_NAME};
