//! Similarity strategies
//!
//! A strategy scores two normalized strings and names itself so stored
//! edges record how they were produced. The comparison engine only sees the
//! `SimilarityStrategy` trait.

mod tfidf;
mod token_overlap;

pub use tfidf::TfIdfCosine;
pub use token_overlap::TokenOverlap;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SpecsimError};

/// Scores two normalized texts.
pub trait SimilarityStrategy: Send + Sync {
    /// Returns a similarity in [0, 1]; 1 means identical
    fn score(&self, a: &str, b: &str) -> f64;

    /// Identifier stored alongside every edge this strategy produces
    fn method_name(&self) -> &'static str;
}

/// Selectable comparison methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Jaccard overlap of token sets
    #[default]
    Custom,
    /// Cosine similarity of per-pair TF-IDF vectors
    Cosine,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Custom => write!(f, "custom"),
            Method::Cosine => write!(f, "cosine"),
        }
    }
}

impl Method {
    /// Parses a method name; accepts the stored method identifiers too
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "custom" | "jaccard" | "custom_similarity" => Ok(Method::Custom),
            "cosine" | "tfidf" | "cosine_similarity" => Ok(Method::Cosine),
            other => Err(SpecsimError::Validation(format!(
                "unknown comparison method '{}', expected 'custom' or 'cosine'",
                other
            ))),
        }
    }

    /// Builds the strategy for this method
    pub fn strategy(self) -> Box<dyn SimilarityStrategy> {
        match self {
            Method::Custom => Box::new(TokenOverlap),
            Method::Cosine => Box::new(TfIdfCosine),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("custom").unwrap(), Method::Custom);
        assert_eq!(Method::parse("Cosine").unwrap(), Method::Cosine);
        assert_eq!(Method::parse("cosine_similarity").unwrap(), Method::Cosine);
        assert!(Method::parse("embedding").is_err());
    }

    #[test]
    fn test_method_builds_matching_strategy() {
        assert_eq!(Method::Custom.strategy().method_name(), "custom_similarity");
        assert_eq!(Method::Cosine.strategy().method_name(), "cosine_similarity");
    }
}
