//! Term-count vectorizer
//!
//! Turns catalog labels into sparse [`DocumentVector`]s over a [`Vocabulary`]
//! built from the same labels. Tokens are lowercased and split on every
//! non-alphanumeric character. No stemming, no stop words, no weighting:
//! length normalization happens later inside cosine similarity.

use crate::vector::DocumentVector;
use ahash::{AHashMap, AHashSet};

/// Immutable mapping from normalized term to column id.
///
/// Columns are assigned in first-seen order across the label sequence, so the
/// same input order always yields the same vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    columns: AHashMap<String, u32>,
}

impl Vocabulary {
    fn from_terms(terms: Vec<String>) -> Self {
        let columns = terms
            .iter()
            .enumerate()
            .map(|(col, term)| (term.clone(), col as u32))
            .collect();
        Self { terms, columns }
    }

    #[inline]
    pub fn column(&self, term: &str) -> Option<u32> {
        self.columns.get(term).copied()
    }

    #[inline]
    pub fn term(&self, column: u32) -> Option<&str> {
        self.terms.get(column as usize).map(String::as_str)
    }

    /// Terms in column order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Builds a vocabulary and one document vector per label.
#[derive(Debug, Clone, Copy)]
pub struct Vectorizer {
    min_token_len: usize,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self { min_token_len: 1 }
    }
}

impl Vectorizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop tokens shorter than `len` characters.
    ///
    /// `2` reproduces the common `\w\w+` token pattern, which ignores
    /// single-letter words such as "C" or "R".
    #[must_use]
    pub fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len.max(1);
        self
    }

    /// Lowercase and split on non-alphanumeric boundaries
    pub fn tokenize<'a>(&self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        let min_len = self.min_token_len;
        text.split(|c: char| !c.is_alphanumeric())
            .filter(move |s| !s.is_empty() && s.chars().count() >= min_len)
            .map(str::to_lowercase)
    }

    /// Build the vocabulary and document vectors for `labels`, in order.
    pub fn build<S: AsRef<str>>(&self, labels: &[S]) -> (Vocabulary, Vec<DocumentVector>) {
        let mut terms: Vec<String> = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();

        for label in labels {
            for token in self.tokenize(label.as_ref()) {
                if seen.insert(token.clone()) {
                    terms.push(token);
                }
            }
        }

        let vocabulary = Vocabulary::from_terms(terms);
        let vectors = labels
            .iter()
            .map(|label| self.transform(&vocabulary, label.as_ref()))
            .collect();
        (vocabulary, vectors)
    }

    /// Vectorize free text against an existing vocabulary. Unknown terms are ignored.
    pub fn transform(&self, vocabulary: &Vocabulary, text: &str) -> DocumentVector {
        let counts = self
            .tokenize(text)
            .filter_map(|token| vocabulary.column(&token))
            .map(|col| (col, 1))
            .collect();
        DocumentVector::from_counts(counts)
    }
}
