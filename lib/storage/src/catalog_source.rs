// CSV catalog source
use anyhow::{anyhow, Context, Result};
use courserec_core::{Catalog, CatalogEntry};
use serde_json::{Map, Number, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default label column
pub const DEFAULT_LABEL_COLUMN: &str = "title";

/// Reads a catalog from a CSV file with a header row.
///
/// One column holds the label; every other non-empty cell lands in the
/// entry payload, as a JSON number when it parses as one.
#[derive(Debug, Clone)]
pub struct CsvCatalogSource {
    path: PathBuf,
    label_column: String,
}

impl CsvCatalogSource {
    pub fn new<P: AsRef<Path>>(path: P, label_column: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            label_column: label_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Load and deduplicate the catalog
    pub fn load(&self) -> Result<Catalog> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Failed to open catalog {:?}", self.path))?;
        let catalog = read_catalog(file, &self.label_column)
            .with_context(|| format!("Failed to read catalog {:?}", self.path))?;
        info!(path = ?self.path, entries = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }
}

/// Parse CSV from any reader
pub fn read_catalog<R: Read>(reader: R, label_column: &str) -> Result<Catalog> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == label_column)
        .ok_or_else(|| anyhow!("Label column '{}' not found in catalog header", label_column))?;

    let mut entries = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Malformed catalog row {}", row + 2))?;
        let label = record.get(label_idx).unwrap_or("").trim();
        if label.is_empty() {
            warn!(row = row + 2, "Skipping catalog row with empty label");
            continue;
        }

        let mut payload = Map::new();
        for (idx, (header, cell)) in headers.iter().zip(record.iter()).enumerate() {
            if idx == label_idx || cell.trim().is_empty() {
                continue;
            }
            payload.insert(header.to_string(), parse_cell(cell.trim()));
        }
        entries.push(CatalogEntry::with_payload(label, payload));
    }

    Ok(Catalog::new(entries))
}

fn parse_cell(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}
