use std::collections::BTreeMap;

use super::SimilarityStrategy;

/// Cosine similarity between TF-IDF vectors of exactly the two compared texts.
///
/// Every call fits a fresh two-document vector space; nothing is cached
/// across pairs. Weighting follows the usual vectorizer defaults: raw term
/// counts, smoothed idf `ln((1 + n) / (1 + df)) + 1` and L2 normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfCosine;

const DOCUMENT_COUNT: f64 = 2.0;

/// Lowercased runs of at least two word characters
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
}

fn smoothed_idf(document_frequency: f64) -> f64 {
    ((1.0 + DOCUMENT_COUNT) / (1.0 + document_frequency)).ln() + 1.0
}

impl SimilarityStrategy for TfIdfCosine {
    fn score(&self, a: &str, b: &str) -> f64 {
        // term -> (count in a, count in b); ordered so summation is stable
        let mut counts: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        for token in tokenize(a) {
            counts.entry(token).or_default().0 += 1;
        }
        for token in tokenize(b) {
            counts.entry(token).or_default().1 += 1;
        }

        if counts.is_empty() {
            return 0.0;
        }

        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;
        for &(count_a, count_b) in counts.values() {
            let df = f64::from(u32::from(count_a > 0) + u32::from(count_b > 0));
            let idf = smoothed_idf(df);
            let weight_a = f64::from(count_a) * idf;
            let weight_b = f64::from(count_b) * idf;
            dot += weight_a * weight_b;
            norm_a += weight_a * weight_a;
            norm_b += weight_b * weight_b;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
    }

    fn method_name(&self) -> &'static str {
        "cosine_similarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_vocabulary_is_zero() {
        assert_eq!(TfIdfCosine.score("", ""), 0.0);
        // single-character tokens are not part of the vocabulary
        assert_eq!(TfIdfCosine.score("a b c", "a b"), 0.0);
    }

    #[test]
    fn test_one_sided_vocabulary_is_zero() {
        assert_eq!(TfIdfCosine.score("encrypt data", ""), 0.0);
    }

    #[test]
    fn test_identical_texts_score_one() {
        let score = TfIdfCosine.score("signature check signature", "signature check signature");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_terms_weighted_below_unique_terms() {
        // shared terms get idf 1, the two unique terms ln(1.5) + 1
        let score = TfIdfCosine.score("system shall encrypt data", "system must encrypt data");
        let unique = smoothed_idf(1.0);
        let expected = 3.0 / (3.0 + unique * unique);
        assert!((score - expected).abs() < 1e-12);
        assert!((score - 0.603).abs() < 1e-3);
    }

    #[test]
    fn test_disjoint_texts_score_zero() {
        assert_eq!(TfIdfCosine.score("encrypt data", "completely unrelated topic"), 0.0);
    }

    #[test]
    fn test_case_is_ignored() {
        let score = TfIdfCosine.score("Encrypt DATA", "encrypt data");
        assert!((score - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_score_is_bounded(a in "[a-d ]{0,40}", b in "[a-d ]{0,40}") {
            let score = TfIdfCosine.score(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_score_is_symmetric(a in "[a-d ]{0,40}", b in "[a-d ]{0,40}") {
            prop_assert_eq!(TfIdfCosine.score(&a, &b), TfIdfCosine.score(&b, &a));
        }
    }
}
