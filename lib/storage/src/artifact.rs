// Precomputed similarity matrix artifacts
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};
use chrono::{DateTime, Utc};
use courserec_core::fuzzy::normalize;
use courserec_core::{Catalog, Error, SimilarityMatrix};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ARTIFACT_VERSION: u32 = 1;

/// Artifact description for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescription {
    pub name: String,
    pub created_at: String,
    pub dim: usize,
    pub size: u64,
    pub checksum: String,
}

/// On-disk similarity matrix plus the catalog it was computed for
#[derive(Debug, Serialize, Deserialize)]
pub struct MatrixArtifact {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// SHA-256 over the normalized labels, in catalog order
    pub catalog_fingerprint: String,
    pub labels: Vec<String>,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl MatrixArtifact {
    pub fn new(catalog: &Catalog, matrix: &SimilarityMatrix) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            created_at: Utc::now(),
            catalog_fingerprint: catalog_fingerprint(catalog),
            labels: catalog.labels().into_iter().map(str::to_string).collect(),
            dim: matrix.dim(),
            data: matrix.as_slice().to_vec(),
        }
    }

    /// Check the artifact against `catalog` and turn it into a matrix.
    ///
    /// Fails on a shape mismatch or when the artifact was computed for a
    /// different catalog, since its rows would point at the wrong entries.
    pub fn into_matrix_for(mut self, catalog: &Catalog) -> Result<SimilarityMatrix> {
        if self.version != ARTIFACT_VERSION {
            return Err(anyhow!("Unsupported artifact version {}", self.version));
        }
        let matrix = SimilarityMatrix::from_flat(std::mem::take(&mut self.data), self.dim)?;
        if matrix.dim() != catalog.len() {
            return Err(Error::ShapeMismatch {
                expected: catalog.len(),
                rows: matrix.dim(),
                cols: matrix.dim(),
            }
            .into());
        }
        if self.catalog_fingerprint != catalog_fingerprint(catalog) {
            return Err(anyhow!(
                "Similarity artifact was computed for a different catalog (created {}, first differing row {:?})",
                self.created_at.to_rfc3339(),
                self.first_label_difference(catalog)
            ));
        }
        Ok(matrix)
    }

    /// Row of the first stored label that no longer matches `catalog`
    pub fn first_label_difference(&self, catalog: &Catalog) -> Option<usize> {
        let current = catalog.entries();
        self.labels
            .iter()
            .zip(current)
            .position(|(stored, entry)| normalize(stored) != entry.key())
            .or_else(|| (self.labels.len() != current.len()).then_some(self.labels.len().min(current.len())))
    }
}

/// Fingerprint of the catalog's row order
pub fn catalog_fingerprint(catalog: &Catalog) -> String {
    let mut hasher = Sha256::new();
    for entry in catalog.entries() {
        hasher.update(entry.key().as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Reads and writes gzip-compressed bincode matrix artifacts in one directory
pub struct MatrixStore {
    dir: PathBuf,
}

impl MatrixStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Write the matrix for `catalog` atomically under `name`
    pub fn save(&self, name: &str, catalog: &Catalog, matrix: &SimilarityMatrix) -> Result<ArtifactDescription> {
        let artifact = MatrixArtifact::new(catalog, matrix);
        let encoded = bincode::serialize(&artifact).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&encoded)?;
        let compressed = encoder.finish()?;

        let path = self.path_for(name);
        AtomicFile::new(&path, AllowOverwrite)
            .write(|f| f.write_all(&compressed))
            .map_err(|e| anyhow!("Failed to write artifact {:?}: {}", path, e))?;

        let description = ArtifactDescription {
            name: name.to_string(),
            created_at: artifact.created_at.to_rfc3339(),
            dim: artifact.dim,
            size: compressed.len() as u64,
            checksum: format!("{:x}", Sha256::digest(&compressed)),
        };
        info!(path = ?path, dim = description.dim, size = description.size, "Similarity artifact saved");
        Ok(description)
    }

    /// Read the artifact stored under `name`, `None` when absent
    pub fn load(&self, name: &str) -> Result<Option<MatrixArtifact>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        load_artifact_from_path(&path).map(Some)
    }

    /// Load the artifact for `catalog`; a missing or stale artifact is `None`
    pub fn load_for(&self, name: &str, catalog: &Catalog) -> Result<Option<SimilarityMatrix>> {
        let Some(artifact) = self.load(name)? else {
            return Ok(None);
        };
        if artifact.catalog_fingerprint != catalog_fingerprint(catalog) {
            warn!(
                name,
                stored_entries = artifact.labels.len(),
                entries = catalog.len(),
                first_difference = ?artifact.first_label_difference(catalog),
                "Ignoring stale similarity artifact built for a different catalog"
            );
            return Ok(None);
        }
        artifact.into_matrix_for(catalog).map(Some)
    }

    /// Describe the artifact stored under `name`
    pub fn describe(&self, name: &str) -> Result<Option<ArtifactDescription>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let artifact = decode(&bytes)?;
        Ok(Some(ArtifactDescription {
            name: name.to_string(),
            created_at: artifact.created_at.to_rfc3339(),
            dim: artifact.dim,
            size: bytes.len() as u64,
            checksum: format!("{:x}", Sha256::digest(&bytes)),
        }))
    }

    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Load an artifact from an arbitrary path
pub fn load_artifact_from_path(path: &Path) -> Result<MatrixArtifact> {
    let file = File::open(path)
        .map_err(Error::Io)
        .with_context(|| format!("Failed to open artifact {:?}", path))?;
    let mut compressed = Vec::new();
    BufReader::new(file).read_to_end(&mut compressed)?;
    decode(&compressed).with_context(|| format!("Failed to decode artifact {:?}", path))
}

fn decode(compressed: &[u8]) -> Result<MatrixArtifact> {
    let mut decoder = GzDecoder::new(compressed);
    let mut encoded = Vec::new();
    decoder.read_to_end(&mut encoded).map_err(Error::Io)?;
    let artifact = bincode::deserialize(&encoded).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(artifact)
}
