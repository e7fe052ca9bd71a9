//! Enumeration of unordered three-keyword combinations.
//!
//! The counting pipeline queries every 3-element subset of the keyword
//! list. Identity is the canonical (lexicographically sorted) triple, so
//! two permutations of the same keywords are one combination.

/// An unordered combination of exactly three distinct keywords.
///
/// Terms are stored in canonical order; equality and hashing operate on
/// that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination {
    terms: [String; 3],
}

impl Combination {
    /// Build a combination from three keywords, normalizing term order.
    pub fn new(a: impl Into<String>, b: impl Into<String>, c: impl Into<String>) -> Self {
        let mut terms = [a.into(), b.into(), c.into()];
        terms.sort();
        Self { terms }
    }

    /// The three terms, in canonical order.
    pub fn terms(&self) -> &[String; 3] {
        &self.terms
    }
}

/// Enumerate all unordered 3-element subsets of `keywords`.
///
/// Enumeration follows input-list order (indices i < j < k), which fixes
/// the first-seen order used for stable ranking tie-breaks. Fewer than
/// three keywords yield an empty vector, not an error. The input is
/// assumed deduplicated (config validation enforces it), so no
/// permutation can appear twice.
pub fn triples(keywords: &[String]) -> Vec<Combination> {
    let n = keywords.len();
    if n < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(n * (n - 1) * (n - 2) / 6);
    for i in 0..n - 2 {
        for j in i + 1..n - 1 {
            for k in j + 1..n {
                out.push(Combination::new(
                    keywords[i].clone(),
                    keywords[j].clone(),
                    keywords[k].clone(),
                ));
            }
        }
    }
    out
}
