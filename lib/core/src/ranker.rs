//! Top-K neighbor ranking over a similarity matrix row

use crate::similarity::SimilarityMatrix;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One ranked neighbor of the query row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Row index in the catalog
    pub index: usize,
    pub score: f32,
    /// 1-based position after the query row itself is excluded
    pub rank: usize,
}

/// Heap entry ordered so that the *worst* candidate sits on top.
///
/// Better means higher score, then lower index.
#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    score: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: lower score (or higher index on ties) = higher priority
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Return the `k` rows most similar to `query_index`, excluding the row itself.
///
/// Ordered by descending score with ties broken by ascending index, so the
/// output is fully determined by the matrix. At most `N - 1` neighbors come
/// back. The matrix is only read.
pub fn recommend(query_index: usize, matrix: &SimilarityMatrix, k: usize) -> Result<Vec<Neighbor>> {
    if k == 0 {
        return Err(Error::InvalidArgument("k must be >= 1".to_string()));
    }
    let row = matrix.row(query_index)?;

    let keep = k.min(row.len().saturating_sub(1));
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(keep + 1);
    for (index, &score) in row.iter().enumerate() {
        if index == query_index {
            continue;
        }
        let candidate = Candidate { index, score };
        if heap.len() < keep {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            // `worst > candidate` in heap order means the candidate ranks better
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    // Ascending heap order = best first
    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .enumerate()
        .map(|(pos, c)| Neighbor { index: c.index, score: c.score, rank: pos + 1 })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f32>>) -> SimilarityMatrix {
        let n = rows.len();
        SimilarityMatrix::load(rows, n).unwrap()
    }

    #[test]
    fn test_orders_by_score_descending() {
        let m = matrix(vec![
            vec![1.0, 0.2, 0.9, 0.5],
            vec![0.2, 1.0, 0.1, 0.3],
            vec![0.9, 0.1, 1.0, 0.4],
            vec![0.5, 0.3, 0.4, 1.0],
        ]);
        let result = recommend(0, &m, 2).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!((result[0].index, result[0].rank), (2, 1));
        assert_eq!((result[1].index, result[1].rank), (3, 2));
        assert_eq!(result[0].score, 0.9);
    }

    #[test]
    fn test_excludes_query_row() {
        // Row 1 is identical to row 0 and scores 1.0, but only row 0 is the query
        let m = matrix(vec![
            vec![1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);
        for q in 0..3 {
            let result = recommend(q, &m, 10).unwrap();
            assert_eq!(result.len(), 2);
            assert!(result.iter().all(|n| n.index != q));
        }
        assert_eq!(recommend(0, &m, 1).unwrap()[0].index, 1);
    }

    #[test]
    fn test_ties_break_by_ascending_index() {
        let m = matrix(vec![
            vec![1.0, 0.5, 0.7, 0.5, 0.7],
            vec![0.5, 1.0, 0.0, 0.0, 0.0],
            vec![0.7, 0.0, 1.0, 0.0, 0.0],
            vec![0.5, 0.0, 0.0, 1.0, 0.0],
            vec![0.7, 0.0, 0.0, 0.0, 1.0],
        ]);
        let order: Vec<usize> = recommend(0, &m, 4).unwrap().iter().map(|n| n.index).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);

        // Truncation keeps the lowest indices among equal scores
        let order: Vec<usize> = recommend(0, &m, 3).unwrap().iter().map(|n| n.index).collect();
        assert_eq!(order, vec![2, 4, 1]);
    }

    #[test]
    fn test_k_larger_than_catalog() {
        let m = matrix(vec![vec![1.0, 0.3], vec![0.3, 1.0]]);
        let result = recommend(1, &m, 50).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].index, 0);
    }

    #[test]
    fn test_single_entry_catalog_is_empty() {
        let m = matrix(vec![vec![1.0]]);
        assert!(recommend(0, &m, 5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_arguments() {
        let m = matrix(vec![vec![1.0, 0.3], vec![0.3, 1.0]]);
        assert!(matches!(recommend(0, &m, 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            recommend(2, &m, 1),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_deterministic() {
        let m = matrix(vec![
            vec![1.0, 0.4, 0.4, 0.4],
            vec![0.4, 1.0, 0.4, 0.4],
            vec![0.4, 0.4, 1.0, 0.4],
            vec![0.4, 0.4, 0.4, 1.0],
        ]);
        let first = recommend(2, &m, 3).unwrap();
        for _ in 0..10 {
            assert_eq!(recommend(2, &m, 3).unwrap(), first);
        }
    }
}
