use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpecsimError};

/// Test procedure label used when a document does not provide one
pub const DEFAULT_TEST_PROCEDURE: &str = "unknown";

/// Category/type label used when a document does not provide one
pub const UNKNOWN_LABEL: &str = "Unbekannt";

/// Lifecycle status of an imported specification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpecificationStatus {
    #[default]
    Pending,
    Processed,
    Failed,
}

impl fmt::Display for SpecificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecificationStatus::Pending => write!(f, "pending"),
            SpecificationStatus::Processed => write!(f, "processed"),
            SpecificationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for SpecificationStatus {
    type Err = SpecsimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SpecificationStatus::Pending),
            "processed" => Ok(SpecificationStatus::Processed),
            "failed" => Ok(SpecificationStatus::Failed),
            other => Err(SpecsimError::Validation(format!(
                "unknown specification status '{}'",
                other
            ))),
        }
    }
}

/// A specification document as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specification {
    pub id: i64,
    pub name: String,
    pub version: String,
    /// File name of the source document
    pub fullname: String,
    pub file_path: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub spec_type: Option<String>,
    /// Number of requirements imported for this specification
    pub req_count: i64,
    pub status: SpecificationStatus,
}

impl Specification {
    /// Short human-readable label, e.g. "gemSpec_Krypt V2.3"
    pub fn label(&self) -> String {
        format!("{} V{}", self.name, self.version)
    }
}

/// Data needed to register a specification document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSpecification {
    pub name: String,
    pub version: String,
    pub fullname: String,
    pub file_path: String,
    pub category: String,
    #[serde(rename = "type")]
    pub spec_type: String,
}

impl NewSpecification {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let version = version.into();
        Self {
            fullname: format!("{}_V{}", name, version),
            file_path: String::new(),
            category: UNKNOWN_LABEL.to_string(),
            spec_type: UNKNOWN_LABEL.to_string(),
            name,
            version,
        }
    }
}

/// A single requirement with its lookup labels resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub id: i64,
    pub specification_id: i64,
    pub source: String,
    /// Human-facing number, unique within a specification only
    pub requirement_number: String,
    pub title: String,
    pub description: String,
    pub processed_title: String,
    pub processed_description: String,
    pub obligation: String,
    pub test_procedure: String,
}

/// A requirement ready to be inserted. Normalization happens upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRequirement {
    pub specification_id: i64,
    pub source: String,
    pub requirement_number: String,
    pub title: String,
    pub description: String,
    pub processed_title: String,
    pub processed_description: String,
    pub obligation: String,
    pub test_procedure: String,
}

impl NewRequirement {
    /// Creates a requirement with the default test procedure
    pub fn new(
        specification_id: i64,
        requirement_number: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        processed_title: impl Into<String>,
        processed_description: impl Into<String>,
    ) -> Self {
        Self {
            specification_id,
            source: String::new(),
            requirement_number: requirement_number.into(),
            title: title.into(),
            description: description.into(),
            processed_title: processed_title.into(),
            processed_description: processed_description.into(),
            obligation: String::new(),
            test_procedure: DEFAULT_TEST_PROCEDURE.to_string(),
        }
    }
}

/// Builds the composite key of a similarity edge.
///
/// The key is order-sensitive: `(a, b)` and `(b, a)` are different edges.
pub fn edge_key(requirement1_id: i64, requirement2_id: i64) -> String {
    format!("{}_{}", requirement1_id, requirement2_id)
}

/// Rounds a similarity score to three decimals for storage
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// A qualifying pair produced by a comparison run, not yet written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityEdgeDraft {
    pub specification1_id: i64,
    pub specification2_id: i64,
    pub requirement1_id: i64,
    pub requirement2_id: i64,
    pub requirement1_number: String,
    pub requirement2_number: String,
    /// Rounded to three decimals
    pub title_similarity: f64,
    /// Rounded to three decimals
    pub description_similarity: f64,
    pub comparison_method: String,
}

impl SimilarityEdgeDraft {
    /// Builds a draft from two requirements, rounding both scores
    pub fn new(
        first: &Requirement,
        second: &Requirement,
        title_similarity: f64,
        description_similarity: f64,
        comparison_method: &str,
    ) -> Self {
        Self {
            specification1_id: first.specification_id,
            specification2_id: second.specification_id,
            requirement1_id: first.id,
            requirement2_id: second.id,
            requirement1_number: first.requirement_number.clone(),
            requirement2_number: second.requirement_number.clone(),
            title_similarity: round_score(title_similarity),
            description_similarity: round_score(description_similarity),
            comparison_method: comparison_method.to_string(),
        }
    }

    pub fn key(&self) -> String {
        edge_key(self.requirement1_id, self.requirement2_id)
    }
}

/// A stored similarity edge joined to both requirements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityEdge {
    pub combined_identifier: String,
    pub specification1_id: i64,
    pub specification2_id: i64,
    pub requirement1_id: i64,
    pub requirement2_id: i64,
    pub requirement1_number: String,
    pub requirement2_number: String,
    pub requirement1_title: String,
    pub requirement2_title: String,
    pub title_similarity: f64,
    pub description_similarity: f64,
    pub comparison_method: String,
}

/// Number of similarity edges between two specifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimilarityCount {
    pub spec1_id: i64,
    pub spec2_id: i64,
    pub spec1_name: String,
    pub spec1_version: String,
    pub spec2_name: String,
    pub spec2_version: String,
    pub similarity_count: i64,
}

/// A requirement that scored above the threshold against a query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarRequirement {
    pub requirement: Requirement,
    pub similarity: f64,
    pub threshold: f64,
}

/// Input to enrichment: a requirement id and the score it reached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub requirement_id: i64,
    pub similarity: f64,
}

impl From<&SimilarRequirement> for Candidate {
    fn from(similar: &SimilarRequirement) -> Self {
        Self {
            requirement_id: similar.requirement.id,
            similarity: similar.similarity,
        }
    }
}

/// A query match joined back to its provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedRequirement {
    pub requirement_number: String,
    pub specification_name: String,
    pub source: String,
    pub title: String,
    pub description: String,
    pub obligation: String,
    pub test_procedure: String,
    pub similarity: f64,
}

/// Validates a similarity threshold: finite and within [0, 1]
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(SpecsimError::Validation(format!(
            "threshold must be between 0 and 1, got {}",
            threshold
        )))
    }
}
