use crate::artifact::{ArtifactDescription, MatrixStore};
use crate::catalog_source::{CsvCatalogSource, DEFAULT_LABEL_COLUMN};
use anyhow::{Context, Result};
use courserec_core::{Catalog, Recommender, RecommenderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default artifact file name inside the data directory
pub const DEFAULT_ARTIFACT_NAME: &str = "similarity.matrix";

/// Where the catalog and the precomputed matrix live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub label_column: String,
    pub artifact_name: String,
    /// Write the matrix to the data directory after computing it
    pub persist_artifact: bool,
}

impl StorageConfig {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(data_dir: P, catalog_path: Q) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            catalog_path: catalog_path.as_ref().to_path_buf(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            persist_artifact: true,
        }
    }
}

/// Wires the catalog source and artifact store into a [`Recommender`]
pub struct StorageManager {
    config: StorageConfig,
    source: CsvCatalogSource,
    artifacts: MatrixStore,
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;
        let source = CsvCatalogSource::new(&config.catalog_path, config.label_column.clone());
        let artifacts = MatrixStore::new(&config.data_dir)?;
        Ok(Self {
            config,
            source,
            artifacts,
        })
    }

    #[inline]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    #[inline]
    pub fn artifacts(&self) -> &MatrixStore {
        &self.artifacts
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        self.source.load()
    }

    /// Load the catalog and build a recommender, reusing a matching artifact when present
    pub fn open(&self, config: RecommenderConfig) -> Result<Recommender> {
        let catalog = self.load_catalog()?;
        match self.artifacts.load_for(&self.config.artifact_name, &catalog)? {
            Some(matrix) => {
                info!(artifact = %self.config.artifact_name, "Using precomputed similarity matrix");
                Ok(Recommender::with_matrix(catalog, matrix, config)?)
            }
            None => {
                let recommender = Recommender::new(catalog, config)?;
                if self.config.persist_artifact {
                    self.persist(&recommender)?;
                }
                Ok(recommender)
            }
        }
    }

    /// Reload the catalog from its source and swap it into `recommender`
    pub fn reload(&self, recommender: &Recommender) -> Result<u64> {
        let catalog = self.load_catalog()?;
        let generation = match self.artifacts.load_for(&self.config.artifact_name, &catalog)? {
            Some(matrix) => recommender.rebuild_with_matrix(catalog, matrix)?,
            None => {
                let generation = recommender.rebuild(catalog)?;
                if self.config.persist_artifact {
                    self.persist(recommender)?;
                }
                generation
            }
        };
        info!(generation, "Catalog reloaded");
        Ok(generation)
    }

    /// Write the recommender's current matrix as the artifact
    pub fn persist(&self, recommender: &Recommender) -> Result<ArtifactDescription> {
        let snapshot = recommender.snapshot();
        self.artifacts
            .save(&self.config.artifact_name, snapshot.catalog(), snapshot.matrix())
    }

    /// Compute the matrix for the current catalog file and write it, without serving
    pub fn precompute(&self, config: RecommenderConfig) -> Result<ArtifactDescription> {
        let recommender = Recommender::new(self.load_catalog()?, config)?;
        self.persist(&recommender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_catalog(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("courses.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_open_computes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_catalog(dir.path(), "title,price\nRust Basics,10\nRust Async,20\nBaking,5\n");
        let manager = StorageManager::new(StorageConfig::new(dir.path().join("data"), &csv)).unwrap();

        let recommender = manager.open(RecommenderConfig::default()).unwrap();
        assert_eq!(recommender.len(), 3);
        assert!(manager.artifacts().exists(DEFAULT_ARTIFACT_NAME));

        // Second open reuses the artifact and yields the same ranking
        let reopened = manager.open(RecommenderConfig::default()).unwrap();
        assert_eq!(
            reopened.snapshot().matrix(),
            recommender.snapshot().matrix()
        );
    }

    #[test]
    fn test_reload_picks_up_catalog_changes() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_catalog(dir.path(), "title\nRust Basics\nRust Async\n");
        let manager = StorageManager::new(StorageConfig::new(dir.path(), &csv)).unwrap();
        let recommender = manager.open(RecommenderConfig::default()).unwrap();

        write_catalog(dir.path(), "title\nRust Basics\nRust Async\nGo Basics\n");
        let generation = manager.reload(&recommender).unwrap();
        assert_eq!(generation, 1);
        assert_eq!(recommender.len(), 3);
        let outcome = recommender.recommend_by_label("Go Basics", 1).unwrap();
        assert_eq!(outcome.items()[0].label, "Rust Basics");
    }

    #[test]
    fn test_open_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_catalog(dir.path(), "name\nA course\n");
        let mut config = StorageConfig::new(dir.path().join("data"), &csv);
        config.label_column = "name".to_string();
        config.persist_artifact = false;
        let manager = StorageManager::new(config).unwrap();
        manager.open(RecommenderConfig::default()).unwrap();
        assert!(!manager.artifacts().exists(DEFAULT_ARTIFACT_NAME));
    }

    #[test]
    fn test_empty_catalog_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_catalog(dir.path(), "title\n");
        let manager = StorageManager::new(StorageConfig::new(dir.path(), &csv)).unwrap();
        assert!(manager.open(RecommenderConfig::default()).is_err());
    }
}
