//! Store abstraction used by the comparison engine
//!
//! The engine never talks to SQLite directly; it loads requirement sets,
//! writes qualifying pairs and enriches query matches through this trait.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Candidate, EnrichedRequirement, Requirement, SimilarityEdgeDraft};

/// Outcome of a batch similarity write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Edges inserted
    pub inserted: usize,
    /// Keys of edges skipped because they already existed
    pub conflicts: Vec<String>,
}

impl WriteSummary {
    pub fn skipped(&self) -> usize {
        self.conflicts.len()
    }
}

/// Operations the comparison engine needs from a record store.
///
/// Reads borrow the store shared; writes need it exclusively, so a store
/// handle serves one comparison run or one enrichment call at a time.
pub trait SimilarityStore {
    /// All requirements of one specification, in insertion order
    fn requirements_by_specification(&self, specification_id: i64) -> Result<Vec<Requirement>>;

    /// The whole requirement corpus, in insertion order
    fn all_requirements(&self) -> Result<Vec<Requirement>>;

    /// Writes a batch of drafted edges.
    ///
    /// Duplicate keys are logged and skipped while the rest of the batch is
    /// still committed. A reference to a missing row is a schema error: the
    /// batch is rolled back and the error is returned.
    fn write_similarity_edges(&mut self, drafts: &[SimilarityEdgeDraft]) -> Result<WriteSummary>;

    /// Joins candidates back to their specification, source, obligation and
    /// test procedure, ordered by similarity descending.
    ///
    /// Returns an empty list for empty input without querying. Candidates
    /// sharing a requirement number collapse to the best-scoring row.
    fn enrich(&self, candidates: &[Candidate]) -> Result<Vec<EnrichedRequirement>>;
}
