//! Free-text similarity queries
//!
//! Normalizes the query text, scores it against the stored corpus and joins
//! the matches back to their provenance.

use tracing::{debug, info};

use crate::db::SimilarityStore;
use crate::engine::ComparisonEngine;
use crate::error::{Result, SpecsimError};
use crate::models::{Candidate, EnrichedRequirement};
use crate::normalize::TextNormalizer;

/// Finds stored requirements similar to `raw_text`.
///
/// Blank input, or input that normalizes to nothing, is a validation error.
/// Results are ordered by similarity descending, one row per requirement
/// number.
pub fn find_similar_requirements<S: SimilarityStore + ?Sized>(
    store: &S,
    engine: &ComparisonEngine,
    normalizer: &dyn TextNormalizer,
    raw_text: &str,
) -> Result<Vec<EnrichedRequirement>> {
    if raw_text.trim().is_empty() {
        return Err(SpecsimError::Validation(
            "query text must not be empty".to_string(),
        ));
    }

    let query = normalizer.normalize(raw_text).ok_or_else(|| {
        SpecsimError::Validation("query text contains no comparable words".to_string())
    })?;
    debug!("Normalized query: {}", query);

    let similar = engine.find_similar(store, &query)?;
    info!(
        "{} requirements above threshold {} using {}",
        similar.len(),
        engine.threshold(),
        engine.method_name()
    );

    let candidates: Vec<Candidate> = similar.iter().map(Candidate::from).collect();
    store.enrich(&candidates)
}
