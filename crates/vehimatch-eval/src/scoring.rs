use std::collections::HashSet;

use vehimatch_core::model::{CanonicalRecord, SearchHit};

/// Binary relevance of one result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relevance {
    /// Some hit denotes the ground-truth record. Rank does not matter.
    pub correct: bool,
    /// Number of distinct triples among the hits.
    pub retrieved: usize,
}

/// Score a result set against its single ground-truth record.
///
/// With exactly one relevant item per query, precision and recall both
/// reduce to whether that item was retrieved at all.
pub fn precision_recall(hits: &[SearchHit], truth: &CanonicalRecord) -> Relevance {
    let distinct: HashSet<_> = hits.iter().map(SearchHit::key).collect();
    Relevance {
        correct: hits.iter().any(|hit| hit.is_match(truth)),
        retrieved: distinct.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camry() -> CanonicalRecord {
        CanonicalRecord::new("Toyota", "Camry", 2015)
    }

    #[test]
    fn test_match_at_top_rank() {
        let hits = vec![
            SearchHit::new("Toyota", "Camry", 2015, 0.9),
            SearchHit::new("Honda", "Civic", 2015, 0.4),
        ];
        let relevance = precision_recall(&hits, &camry());
        assert!(relevance.correct);
        assert_eq!(relevance.retrieved, 2);
    }

    #[test]
    fn test_match_at_lower_rank_still_counts() {
        let hits = vec![
            SearchHit::new("Honda", "Civic", 2015, 0.9),
            SearchHit::new("Toyota", "Camry", 2015, 0.1),
        ];
        assert!(precision_recall(&hits, &camry()).correct);
    }

    #[test]
    fn test_wrong_year_is_a_miss() {
        let hits = vec![SearchHit::new("Toyota", "Camry", 2016, 0.9)];
        assert!(!precision_recall(&hits, &camry()).correct);
    }

    #[test]
    fn test_duplicates_counted_once() {
        let hits = vec![
            SearchHit::new("Toyota", "Camry", 2015, 0.9),
            SearchHit::new("toyota", "camry", 2015, 0.8),
            SearchHit::new("Toyota", "Camry", 2016, 0.7),
        ];
        assert_eq!(precision_recall(&hits, &camry()).retrieved, 2);
    }

    #[test]
    fn test_no_hits() {
        let relevance = precision_recall(&[], &camry());
        assert!(!relevance.correct);
        assert_eq!(relevance.retrieved, 0);
    }
}
