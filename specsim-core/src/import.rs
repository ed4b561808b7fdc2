//! Specification import
//!
//! An import document describes one specification and its raw requirement
//! rows. Rows are normalized, buffered and committed in one batch; the
//! specification's status tracks whether the import went through.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::db::SqliteStore;
use crate::error::{Result, SpecsimError};
use crate::models::{
    NewRequirement, NewSpecification, Specification, SpecificationStatus, DEFAULT_TEST_PROCEDURE,
    UNKNOWN_LABEL,
};
use crate::normalize::TextNormalizer;

/// One raw requirement row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRequirement {
    pub number: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub obligation: Option<String>,
    /// Defaults to the specification name
    #[serde(default)]
    pub source: Option<String>,
    /// Defaults to "unknown"
    #[serde(default)]
    pub test_procedure: Option<String>,
}

/// A specification document ready for import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportDocument {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub spec_type: Option<String>,
    #[serde(default)]
    pub requirements: Vec<RawRequirement>,
}

impl ImportDocument {
    /// Loads a document, choosing JSON or YAML by file extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Ok(serde_yaml::from_str(&content)?),
        }
    }

    fn new_specification(&self, file_path: &str) -> NewSpecification {
        let mut spec = NewSpecification::new(self.name.clone(), self.version.clone());
        if let Some(fullname) = &self.fullname {
            spec.fullname = fullname.clone();
        }
        spec.file_path = file_path.to_string();
        spec.category = self
            .category
            .clone()
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        spec.spec_type = self
            .spec_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        spec
    }
}

/// Outcome of importing one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportSummary {
    pub specification: Specification,
    pub imported: usize,
    /// Rows whose title or description normalized to nothing
    pub skipped: usize,
}

/// Imports one document into the store.
///
/// A specification that already has requirements is refused; requirements
/// are write-once and similarity edges point at their ids.
pub fn import_document(
    store: &mut SqliteStore,
    normalizer: &dyn TextNormalizer,
    document: &ImportDocument,
    file_path: &str,
) -> Result<ImportSummary> {
    let spec = store.get_or_create_specification(&document.new_specification(file_path))?;
    if spec.req_count > 0 {
        return Err(SpecsimError::Validation(format!(
            "{} has already been imported",
            spec.label()
        )));
    }

    info!("Importing {}", spec.label());
    match import_rows(store, normalizer, document, &spec) {
        Ok((imported, skipped)) => {
            store.set_specification_status(spec.id, SpecificationStatus::Processed)?;
            info!(
                "Total number of entries added from {}: {}",
                spec.label(),
                imported
            );
            let specification = store
                .specification(spec.id)?
                .ok_or_else(|| SpecsimError::SpecificationNotFound(spec.label()))?;
            Ok(ImportSummary {
                specification,
                imported,
                skipped,
            })
        }
        Err(err) => {
            error!("Import of {} failed: {}", spec.label(), err);
            store.discard_pending_requirements();
            store.set_specification_status(spec.id, SpecificationStatus::Failed)?;
            Err(err)
        }
    }
}

fn import_rows(
    store: &mut SqliteStore,
    normalizer: &dyn TextNormalizer,
    document: &ImportDocument,
    spec: &Specification,
) -> Result<(usize, usize)> {
    let mut skipped = 0;

    for (index, row) in document.requirements.iter().enumerate() {
        let title = row.title.as_deref().unwrap_or_default();
        let description = row.description.as_deref().unwrap_or_default();

        let (processed_title, processed_description) =
            match (normalizer.normalize(title), normalizer.normalize(description)) {
                (Some(t), Some(d)) => (t, d),
                _ => {
                    warn!(
                        "Row {} ({}) in {} has empty title or description and will be skipped",
                        index + 1,
                        row.number,
                        spec.fullname
                    );
                    skipped += 1;
                    continue;
                }
            };

        let mut requirement = NewRequirement::new(
            spec.id,
            row.number.clone(),
            title,
            description,
            processed_title,
            processed_description,
        );
        requirement.source = row
            .source
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| spec.name.clone());
        requirement.obligation = row.obligation.clone().unwrap_or_default();
        requirement.test_procedure = row
            .test_procedure
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEST_PROCEDURE.to_string());

        store.add_requirement(&requirement)?;
    }

    let imported = store.commit_requirements()?;
    store.update_specification_req_count(spec.id)?;
    Ok((imported, skipped))
}
