//! Comparison engine
//!
//! Scores requirements against each other (pairwise specification
//! comparison) or against a free-text query (query-to-corpus comparison)
//! using an injected similarity strategy and a strict threshold.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::SimilarityStore;
use crate::error::Result;
use crate::models::{
    validate_threshold, Requirement, SimilarRequirement, SimilarityEdgeDraft, Specification,
};
use crate::similarity::SimilarityStrategy;

/// Outer-loop iterations between progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// Counters from one pairwise comparison run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Pairs scored by the strategy
    pub pairs_compared: usize,
    /// Pairs skipped because both requirements carry the same number
    pub pairs_skipped: usize,
    /// Pairs whose description score exceeded the threshold
    pub edges_drafted: usize,
    /// Edges actually inserted
    pub edges_written: usize,
    /// Edges skipped because they were already stored
    pub edges_duplicate: usize,
}

/// Drives comparisons with one strategy and one threshold
pub struct ComparisonEngine {
    strategy: Box<dyn SimilarityStrategy>,
    threshold: f64,
}

impl ComparisonEngine {
    /// Creates an engine. The threshold must lie in [0, 1].
    pub fn new(strategy: Box<dyn SimilarityStrategy>, threshold: f64) -> Result<Self> {
        Ok(Self {
            strategy,
            threshold: validate_threshold(threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn method_name(&self) -> &'static str {
        self.strategy.method_name()
    }

    /// Scores strictly above the threshold qualify
    pub fn is_above_threshold(&self, score: f64) -> bool {
        score > self.threshold
    }

    /// Cross-compares two requirement sets without touching a store.
    ///
    /// Every requirement of `left` is scored against every requirement of
    /// `right`, except pairs that share a requirement number. Title and
    /// description are scored independently; only the description score
    /// decides whether a pair qualifies.
    ///
    /// Cost is two strategy calls per pair, O(|left| * |right|), with no
    /// pruning or early exit.
    pub fn cross_compare(
        &self,
        left_spec: &Specification,
        left: &[Requirement],
        right_spec: &Specification,
        right: &[Requirement],
    ) -> (Vec<SimilarityEdgeDraft>, ComparisonSummary) {
        let mut drafts = Vec::new();
        let mut summary = ComparisonSummary::default();

        for (i, left_req) in left.iter().enumerate() {
            for right_req in right {
                if left_req.requirement_number == right_req.requirement_number {
                    summary.pairs_skipped += 1;
                    continue;
                }

                let title_similarity = self
                    .strategy
                    .score(&left_req.processed_title, &right_req.processed_title);
                let description_similarity = self.strategy.score(
                    &left_req.processed_description,
                    &right_req.processed_description,
                );
                summary.pairs_compared += 1;

                if self.is_above_threshold(description_similarity) {
                    drafts.push(SimilarityEdgeDraft::new(
                        left_req,
                        right_req,
                        title_similarity,
                        description_similarity,
                        self.strategy.method_name(),
                    ));
                }
            }

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                info!(
                    "Progress: Compared {} requirements of {} with {} by using {}",
                    i + 1,
                    left_spec.label(),
                    right_spec.label(),
                    self.strategy.method_name()
                );
            }
        }

        summary.edges_drafted = drafts.len();
        (drafts, summary)
    }

    /// Compares two specifications and stores every qualifying pair.
    ///
    /// Both requirement sets are loaded in full, cross-compared, and the
    /// drafted edges are written in a single batch at the end. This is the
    /// expensive path: O(|A| * |B|) strategy calls.
    pub fn compare<S: SimilarityStore + ?Sized>(
        &self,
        store: &mut S,
        left_spec: &Specification,
        right_spec: &Specification,
    ) -> Result<ComparisonSummary> {
        let left = store.requirements_by_specification(left_spec.id)?;
        let right = store.requirements_by_specification(right_spec.id)?;

        info!(
            "Comparing {} ({} requirements) with {} ({} requirements) by using {}",
            left_spec.label(),
            left.len(),
            right_spec.label(),
            right.len(),
            self.strategy.method_name()
        );

        let (drafts, mut summary) = self.cross_compare(left_spec, &left, right_spec, &right);
        let written = store.write_similarity_edges(&drafts)?;
        summary.edges_written = written.inserted;
        summary.edges_duplicate = written.skipped();

        Ok(summary)
    }

    /// Scores a normalized query against every requirement's processed
    /// description and returns those strictly above the threshold, in
    /// corpus order. Titles are not compared. Read-only.
    ///
    /// The query must already be normalized and non-empty.
    pub fn find_similar<S: SimilarityStore + ?Sized>(
        &self,
        store: &S,
        normalized_query: &str,
    ) -> Result<Vec<SimilarRequirement>> {
        let corpus = store.all_requirements()?;

        let similar = corpus
            .into_iter()
            .filter_map(|requirement| {
                let similarity = self
                    .strategy
                    .score(normalized_query, &requirement.processed_description);
                self.is_above_threshold(similarity)
                    .then_some(SimilarRequirement {
                        requirement,
                        similarity,
                        threshold: self.threshold,
                    })
            })
            .collect();

        Ok(similar)
    }
}
