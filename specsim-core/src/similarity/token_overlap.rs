use std::collections::HashSet;

use super::SimilarityStrategy;

/// Jaccard similarity over whitespace-delimited token sets
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlap;

impl SimilarityStrategy for TokenOverlap {
    fn score(&self, a: &str, b: &str) -> f64 {
        let tokens_a: HashSet<&str> = a.split_whitespace().collect();
        let tokens_b: HashSet<&str> = b.split_whitespace().collect();

        let union = tokens_a.union(&tokens_b).count();
        if union == 0 {
            return 0.0;
        }

        let intersection = tokens_a.intersection(&tokens_b).count();
        intersection as f64 / union as f64
    }

    fn method_name(&self) -> &'static str {
        "custom_similarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_both_empty_is_zero() {
        assert_eq!(TokenOverlap.score("", ""), 0.0);
        assert_eq!(TokenOverlap.score("   ", "\t"), 0.0);
    }

    #[test]
    fn test_one_empty_is_zero() {
        assert_eq!(TokenOverlap.score("system encrypt", ""), 0.0);
    }

    #[test]
    fn test_shared_tokens() {
        let score = TokenOverlap.score("system shall encrypt data", "system must encrypt data");
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_tokens_count_once() {
        assert_eq!(TokenOverlap.score("data data data", "data"), 1.0);
    }

    proptest! {
        #[test]
        fn prop_score_is_bounded(a in "[a-e ]{0,30}", b in "[a-e ]{0,30}") {
            let score = TokenOverlap.score(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_self_similarity_is_one(a in "[a-z]{1,8}( [a-z]{1,8}){0,6}") {
            prop_assert_eq!(TokenOverlap.score(&a, &a), 1.0);
        }

        #[test]
        fn prop_score_is_symmetric(a in "[a-e ]{0,30}", b in "[a-e ]{0,30}") {
            prop_assert_eq!(TokenOverlap.score(&a, &b), TokenOverlap.score(&b, &a));
        }
    }
}
