use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Label absent from the catalog lookup
    #[error("Course not found: {0}")]
    NotFound(String),

    /// Fuzzy resolution found no label at or above the cutoff
    #[error("No catalog title matches query: {0}")]
    NoMatch(String),

    /// An index escaped the catalog bounds. Seeing this from the public API is a bug.
    #[error("Index {index} out of range for catalog of size {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Similarity matrix shape mismatch: expected {expected}x{expected}, got {rows}x{cols}")]
    ShapeMismatch { expected: usize, rows: usize, cols: usize },

    #[error("Catalog is empty")]
    EmptyCatalog,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// `NotFound` and `NoMatch` are expected outcomes, not failures.
    pub fn is_expected_miss(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::NoMatch(_))
    }
}
