//! Ranking of combination counts.
//!
//! Combinations with at least one hit are sorted by count descending and
//! truncated to the top N. The sort is stable, so equal counts keep the
//! enumeration (first-seen) order.

use crate::combinations::Combination;
use crate::types::RankingEntry;

/// How many combinations the ranking keeps.
pub const TOP_N: usize = 30;

/// One combination's counting outcome. `None` marks a failed query.
#[derive(Debug, Clone)]
pub struct CombinationCount {
    /// The counted combination.
    pub combination: Combination,
    /// The query text sent for it.
    pub query: String,
    /// Hit count, or `None` after retry exhaustion.
    pub count: Option<u64>,
}

/// Rank combination counts: hits only, descending, stable, top `top_n`.
pub fn rank(counts: &[CombinationCount], top_n: usize) -> Vec<RankingEntry> {
    let mut with_hits: Vec<&CombinationCount> = counts
        .iter()
        .filter(|c| c.count.is_some_and(|n| n > 0))
        .collect();
    with_hits.sort_by(|a, b| b.count.cmp(&a.count));
    with_hits.truncate(top_n);
    with_hits
        .into_iter()
        .map(|c| RankingEntry {
            terms: c.combination.terms().clone(),
            query: c.query.clone(),
            count: c.count.unwrap_or(0),
            titles: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(terms: [&str; 3], n: Option<u64>) -> CombinationCount {
        let combination = Combination::new(terms[0], terms[1], terms[2]);
        let query = format!("\"{}\" AND \"{}\" AND \"{}\"", terms[0], terms[1], terms[2]);
        CombinationCount {
            combination,
            query,
            count: n,
        }
    }

    #[test]
    fn sorted_descending() {
        let counts = vec![
            count(["a", "b", "c"], Some(5)),
            count(["a", "b", "d"], Some(50)),
            count(["a", "c", "d"], Some(12)),
        ];
        let ranked = rank(&counts, TOP_N);
        let values: Vec<u64> = ranked.iter().map(|r| r.count).collect();
        assert_eq!(values, vec![50, 12, 5]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let counts = vec![
            count(["a", "b", "c"], Some(7)),
            count(["a", "b", "d"], Some(7)),
            count(["a", "c", "d"], Some(7)),
        ];
        let ranked = rank(&counts, TOP_N);
        assert_eq!(ranked[0].terms, ["a", "b", "c"].map(String::from));
        assert_eq!(ranked[1].terms, ["a", "b", "d"].map(String::from));
        assert_eq!(ranked[2].terms, ["a", "c", "d"].map(String::from));
    }

    #[test]
    fn zero_counts_excluded() {
        let counts = vec![
            count(["a", "b", "c"], Some(0)),
            count(["a", "b", "d"], Some(3)),
        ];
        let ranked = rank(&counts, TOP_N);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].count, 3);
    }

    #[test]
    fn failed_counts_excluded() {
        let counts = vec![
            count(["a", "b", "c"], None),
            count(["a", "b", "d"], Some(1)),
        ];
        let ranked = rank(&counts, TOP_N);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn truncated_to_top_n() {
        let keywords: Vec<String> = (0..10).map(|i| format!("kw{i}")).collect();
        let combos = crate::combinations::triples(&keywords);
        let counts: Vec<CombinationCount> = combos
            .into_iter()
            .enumerate()
            .map(|(i, combination)| CombinationCount {
                query: combination.terms().join(" AND "),
                combination,
                count: Some(i as u64 + 1),
            })
            .collect();
        assert!(counts.len() > TOP_N);
        let ranked = rank(&counts, TOP_N);
        assert_eq!(ranked.len(), TOP_N);
        // Highest count first.
        assert_eq!(ranked[0].count, counts.len() as u64);
    }

    #[test]
    fn empty_input_ranks_empty() {
        assert!(rank(&[], TOP_N).is_empty());
    }
}
