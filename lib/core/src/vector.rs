use serde::{Deserialize, Serialize};

/// Sparse term-count vector over a shared vocabulary.
///
/// Entries are kept sorted by column id with no duplicates and no zero counts,
/// which lets two vectors be dotted with a single merge pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentVector {
    entries: Vec<(u32, u32)>,
}

impl DocumentVector {
    /// Build from `(column, count)` pairs in any order. Repeated columns are summed.
    #[must_use]
    pub fn from_counts(mut counts: Vec<(u32, u32)>) -> Self {
        counts.sort_unstable_by_key(|&(col, _)| col);
        let mut entries: Vec<(u32, u32)> = Vec::with_capacity(counts.len());
        for (col, count) in counts {
            if count == 0 {
                continue;
            }
            match entries.last_mut() {
                Some((last, acc)) if *last == col => *acc += count,
                _ => entries.push((col, count)),
            }
        }
        Self { entries }
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[(u32, u32)] {
        &self.entries
    }

    /// Number of distinct terms present
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// True when the label produced no tokens
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Term frequency at `column`, 0 when absent
    #[must_use]
    pub fn get(&self, column: u32) -> u32 {
        self.entries
            .binary_search_by_key(&column, |&(col, _)| col)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    /// Dot product via sorted merge
    #[must_use]
    pub fn dot(&self, other: &DocumentVector) -> u64 {
        let (a, b) = (&self.entries, &other.entries);
        let mut i = 0usize;
        let mut j = 0usize;
        let mut acc = 0u64;
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += u64::from(a[i].1) * u64::from(b[j].1);
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Euclidean norm
    #[inline]
    #[must_use]
    pub fn norm(&self) -> f64 {
        let sum: u64 = self
            .entries
            .iter()
            .map(|&(_, c)| u64::from(c) * u64::from(c))
            .sum();
        (sum as f64).sqrt()
    }

    /// Cosine similarity, 0.0 whenever either side is a zero vector.
    ///
    /// Both vectors are non-negative, so the result lies in [0, 1]; rounding
    /// overshoot is clamped.
    #[must_use]
    pub fn cosine_similarity(&self, other: &DocumentVector) -> f32 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        (self.dot(other) as f64 / denom).clamp(0.0, 1.0) as f32
    }
}
