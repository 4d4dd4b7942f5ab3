//! Dense pairwise similarity matrix
//!
//! Built once per catalog load from the document vectors (or accepted from a
//! precomputed artifact) and read-only afterwards.

use crate::vector::DocumentVector;
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Row count above which [`SimilarityMatrix::compute`] splits rows across rayon workers
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// Square, symmetric cosine similarity matrix stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    dim: usize,
    data: Vec<f32>,
}

impl SimilarityMatrix {
    /// Compute cosine similarity for every pair of vectors.
    pub fn compute(vectors: &[DocumentVector]) -> Self {
        Self::compute_with_threshold(vectors, DEFAULT_PARALLEL_THRESHOLD)
    }

    /// Like [`compute`](Self::compute), partitioning the rows across rayon
    /// workers once there are more than `parallel_threshold` of them.
    ///
    /// Only the upper triangle is computed; the lower one is mirrored from it,
    /// so `get(i, j) == get(j, i)` holds bit for bit.
    pub fn compute_with_threshold(vectors: &[DocumentVector], parallel_threshold: usize) -> Self {
        let n = vectors.len();
        let norms: Vec<f64> = vectors.iter().map(DocumentVector::norm).collect();

        let upper_row = |i: usize| -> Vec<f32> {
            (i + 1..n)
                .map(|j| {
                    let denom = norms[i] * norms[j];
                    if denom == 0.0 {
                        0.0
                    } else {
                        (vectors[i].dot(&vectors[j]) as f64 / denom).clamp(0.0, 1.0) as f32
                    }
                })
                .collect()
        };

        let rows: Vec<Vec<f32>> = if n > parallel_threshold {
            (0..n).into_par_iter().map(upper_row).collect()
        } else {
            (0..n).map(upper_row).collect()
        };

        let mut data = vec![0.0f32; n * n];
        for (i, row) in rows.into_iter().enumerate() {
            data[i * n + i] = if norms[i] > 0.0 { 1.0 } else { 0.0 };
            for (offset, score) in row.into_iter().enumerate() {
                let j = i + 1 + offset;
                data[i * n + j] = score;
                data[j * n + i] = score;
            }
        }

        Self { dim: n, data }
    }

    /// Accept a precomputed matrix after checking it is `expected` x `expected`.
    ///
    /// A ragged or wrongly sized matrix is rejected outright, never truncated
    /// or padded. Non-finite cells are rejected as well.
    pub fn load(rows: Vec<Vec<f32>>, expected: usize) -> Result<Self> {
        if rows.len() != expected {
            let cols = rows.first().map_or(0, Vec::len);
            return Err(Error::ShapeMismatch { expected, rows: rows.len(), cols });
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != expected) {
            return Err(Error::ShapeMismatch { expected, rows: rows.len(), cols: bad.len() });
        }
        let data: Vec<f32> = rows.into_iter().flatten().collect();
        Self::from_flat(data, expected)
    }

    /// Accept a row-major flat buffer of `expected * expected` cells.
    pub fn from_flat(data: Vec<f32>, expected: usize) -> Result<Self> {
        if expected.checked_mul(expected) != Some(data.len()) {
            let cols = if expected == 0 { data.len() } else { data.len() / expected };
            return Err(Error::ShapeMismatch { expected, rows: expected, cols });
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "non-finite similarity at row {}, column {}",
                pos / expected,
                pos % expected
            )));
        }
        Ok(Self { dim: expected, data })
    }

    /// Number of rows (and columns)
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dim == 0
    }

    /// Similarity of `i` and `j`, `None` when either is out of range
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        if i < self.dim && j < self.dim {
            Some(self.data[i * self.dim + j])
        } else {
            None
        }
    }

    /// Full row `i`
    pub fn row(&self, i: usize) -> Result<&[f32]> {
        if i >= self.dim {
            return Err(Error::IndexOutOfRange { index: i, len: self.dim });
        }
        Ok(&self.data[i * self.dim..(i + 1) * self.dim])
    }

    /// Row-major cells
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Vectorizer;

    fn sample_vectors() -> Vec<DocumentVector> {
        let (_, vectors) = Vectorizer::new().build(&[
            "Intro to Data Science",
            "Advanced Data Science",
            "Intro to Cooking",
            "!!!",
            "data data science",
        ]);
        vectors
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let matrix = SimilarityMatrix::compute(&sample_vectors());
        assert_eq!(matrix.dim(), 5);
        for i in 0..5 {
            for j in 0..5 {
                let a = matrix.get(i, j).unwrap();
                let b = matrix.get(j, i).unwrap();
                assert_eq!(a, b, "asymmetric at ({}, {})", i, j);
                assert!((0.0..=1.0).contains(&a));
            }
        }
    }

    #[test]
    fn test_self_similarity() {
        let matrix = SimilarityMatrix::compute(&sample_vectors());
        assert_eq!(matrix.get(0, 0), Some(1.0));
        assert_eq!(matrix.get(4, 4), Some(1.0));
        // Zero vector is dissimilar even to itself
        assert_eq!(matrix.get(3, 3), Some(0.0));
    }

    #[test]
    fn test_zero_vector_row_is_all_zero() {
        let matrix = SimilarityMatrix::compute(&sample_vectors());
        assert!(matrix.row(3).unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_known_values() {
        let matrix = SimilarityMatrix::compute(&sample_vectors());
        // {intro,to,data,science} vs {advanced,data,science}: 2 / (2 * sqrt 3)
        let expected = 2.0 / (2.0 * 3f32.sqrt());
        assert!((matrix.get(0, 1).unwrap() - expected).abs() < 1e-6);
        // {intro,to,data,science} vs {intro,to,cooking}: 2 / (2 * sqrt 3)
        assert!((matrix.get(0, 2).unwrap() - expected).abs() < 1e-6);
        assert_eq!(matrix.get(1, 2), Some(0.0));
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let labels: Vec<String> = (0..64)
            .map(|i| format!("course {} topic {} level {}", i % 7, i % 5, i % 3))
            .collect();
        let (_, vectors) = Vectorizer::new().build(&labels);
        let sequential = SimilarityMatrix::compute_with_threshold(&vectors, usize::MAX);
        let parallel = SimilarityMatrix::compute_with_threshold(&vectors, 0);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_load_accepts_square() {
        let matrix = SimilarityMatrix::load(vec![vec![1.0, 0.5], vec![0.5, 1.0]], 2).unwrap();
        assert_eq!(matrix.get(0, 1), Some(0.5));
        assert_eq!(matrix.get(2, 0), None);
    }

    #[test]
    fn test_load_rejects_wrong_row_count() {
        let err = SimilarityMatrix::load(vec![vec![1.0, 0.5], vec![0.5, 1.0]], 3).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 3, rows: 2, cols: 2 }));
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let err = SimilarityMatrix::load(vec![vec![1.0, 0.5], vec![0.5]], 2).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, rows: 2, cols: 1 }));
    }

    #[test]
    fn test_from_flat_rejects_overflowing_dim() {
        assert!(matches!(
            SimilarityMatrix::from_flat(vec![1.0], usize::MAX / 2),
            Err(Error::ShapeMismatch { cols: 0, .. })
        ));
        assert!(matches!(
            SimilarityMatrix::from_flat(vec![1.0; 4], usize::MAX),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_flat_rejects_nan() {
        let err = SimilarityMatrix::from_flat(vec![1.0, f32::NAN, 0.0, 1.0], 2).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_row_out_of_range() {
        let matrix = SimilarityMatrix::compute(&sample_vectors());
        assert!(matches!(matrix.row(5), Err(Error::IndexOutOfRange { index: 5, len: 5 })));
    }
}
