//! Error types for specsim
//!
//! Errors are grouped into four kinds so callers can decide what to show
//! and what to recover from:
//! - `Validation`: bad input from the caller (blank query, bad threshold)
//! - `Conflict`: a duplicate similarity edge, recovered inside batch writes
//! - `Schema`: a reference to a row that does not exist; always fatal
//! - `Unexpected`: anything else (SQLite, I/O, serialization)

use rusqlite::ffi;
use thiserror::Error;

/// Result alias used throughout the core library
pub type Result<T> = std::result::Result<T, SpecsimError>;

/// Errors that can occur while importing, comparing or querying requirements
#[derive(Error, Debug)]
pub enum SpecsimError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Similarity edge already exists: {key}")]
    Conflict { key: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Specification not found: {0}")]
    SpecificationNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a `SpecsimError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Schema,
    Unexpected,
}

impl SpecsimError {
    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpecsimError::Validation(_) | SpecsimError::SpecificationNotFound(_) => {
                ErrorKind::Validation
            }
            SpecsimError::Conflict { .. } => ErrorKind::Conflict,
            SpecsimError::Schema(_) => ErrorKind::Schema,
            SpecsimError::Database(_)
            | SpecsimError::Io(_)
            | SpecsimError::Yaml(_)
            | SpecsimError::Json(_) => ErrorKind::Unexpected,
        }
    }

    /// Maps a failed SQLite statement onto the error taxonomy.
    ///
    /// Primary key and unique violations become `Conflict`, foreign key
    /// violations become `Schema`. Everything else stays a database error.
    pub fn from_sqlite(err: rusqlite::Error, key: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    return SpecsimError::Conflict {
                        key: key.to_string(),
                    };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return SpecsimError::Schema(format!(
                        "{} references a missing row ({})",
                        key,
                        message.as_deref().unwrap_or("foreign key constraint failed")
                    ));
                }
                _ => {}
            }
        }
        SpecsimError::Database(err)
    }
}
