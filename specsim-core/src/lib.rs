pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod import;
pub mod models;
pub mod normalize;
pub mod query;
pub mod similarity;

// Re-export commonly used types
pub use config::{settings_path, Settings};
pub use db::{SimilarityStore, SqliteStore, WriteSummary};
pub use engine::{ComparisonEngine, ComparisonSummary};
pub use error::{ErrorKind, Result, SpecsimError};
pub use import::{import_document, ImportDocument, ImportSummary, RawRequirement};
pub use models::{
    Candidate, EnrichedRequirement, NewRequirement, NewSpecification, Requirement,
    SimilarRequirement, SimilarityCount, SimilarityEdge, SimilarityEdgeDraft, Specification,
    SpecificationStatus,
};
pub use normalize::{german_stopwords, BasicNormalizer, Stemming, TextNormalizer};
pub use query::find_similar_requirements;
pub use similarity::{Method, SimilarityStrategy, TfIdfCosine, TokenOverlap};
