//! Fuzzy title resolution
//!
//! Maps an imprecise user string onto the closest known catalog label using a
//! character-sequence similarity ratio. Used as the fallback when an exact
//! label lookup misses.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default minimum ratio for a fuzzy match to count
pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Character-level similarity used to compare a query with a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyMetric {
    /// `2 * LCS(a, b) / (|a| + |b|)` over characters
    #[default]
    Lcs,
    /// `1 - levenshtein(a, b) / max(|a|, |b|)`
    Levenshtein,
    JaroWinkler,
}

impl FuzzyMetric {
    /// Ratio in [0.0, 1.0] where 1.0 means identical
    pub fn ratio(self, a: &str, b: &str) -> f64 {
        match self {
            FuzzyMetric::Lcs => lcs_ratio(a, b),
            FuzzyMetric::Levenshtein => strsim::normalized_levenshtein(a, b),
            FuzzyMetric::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

impl std::str::FromStr for FuzzyMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lcs" => Ok(FuzzyMetric::Lcs),
            "levenshtein" => Ok(FuzzyMetric::Levenshtein),
            "jaro_winkler" | "jaro-winkler" | "jarowinkler" => Ok(FuzzyMetric::JaroWinkler),
            other => Err(Error::InvalidConfig(format!("unknown fuzzy metric: {}", other))),
        }
    }
}

/// Normalize for comparison: trim and lowercase
#[inline]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Longest-common-subsequence ratio, 1.0 when both strings are empty
pub fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(&a, &b)) as f64 / total as f64
}

/// LCS length with two rolling rows
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Check that a cutoff is a usable ratio threshold
pub fn validate_cutoff(cutoff: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&cutoff) {
        return Err(Error::InvalidArgument(format!(
            "cutoff must be within [0, 1], got {}",
            cutoff
        )));
    }
    Ok(())
}

/// A fuzzy match: the position of the label in `known_labels` and its ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub index: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyResolver {
    metric: FuzzyMetric,
}

impl FuzzyResolver {
    pub fn new(metric: FuzzyMetric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> FuzzyMetric {
        self.metric
    }

    /// Find the best label for `query`, or `None` when the best ratio is below `cutoff`.
    ///
    /// Ties at the best ratio go to the earliest label in `known_labels`. An
    /// empty query (after trimming) never matches.
    pub fn best_match<S: AsRef<str>>(
        &self,
        query: &str,
        known_labels: &[S],
        cutoff: f64,
    ) -> Result<Option<FuzzyMatch>> {
        validate_cutoff(cutoff)?;
        let query = normalize(query);
        if query.is_empty() {
            return Ok(None);
        }

        let mut best: Option<FuzzyMatch> = None;
        for (index, label) in known_labels.iter().enumerate() {
            let ratio = self.metric.ratio(&query, &normalize(label.as_ref()));
            if best.map_or(true, |b| ratio > b.ratio) {
                best = Some(FuzzyMatch { index, ratio });
            }
        }

        Ok(best.filter(|b| b.ratio >= cutoff))
    }

    /// Resolve `query` to the closest known label, if any clears `cutoff`.
    pub fn resolve<S: AsRef<str>>(
        &self,
        query: &str,
        known_labels: &[S],
        cutoff: f64,
    ) -> Result<Option<String>> {
        Ok(self
            .best_match(query, known_labels, cutoff)?
            .map(|m| known_labels[m.index].as_ref().to_string()))
    }
}
