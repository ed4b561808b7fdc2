//! SQLite record store
//!
//! Persists specifications, requirements and similarity edges in a single
//! SQLite database. The store takes ownership of an opened connection; the
//! lookup cache lives as long as the store does.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, SpecsimError};
use crate::models::{
    Candidate, EnrichedRequirement, NewRequirement, NewSpecification, Requirement,
    SimilarityCount, SimilarityEdge, SimilarityEdgeDraft, Specification, SpecificationStatus,
};

use super::lookup::{LookupCache, LookupTable};
use super::traits::{SimilarityStore, WriteSummary};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Tables dropped by `reset`, dependents first
const ALL_TABLES: [&str; 10] = [
    "requirement_similarities",
    "requirements",
    "specifications",
    "spec_categories",
    "spec_types",
    "req_sources",
    "req_obligations",
    "req_test_procedures",
    "comparison_methods",
    "schema_version",
];

/// Specification types and the category each belongs to, seeded on creation
pub const DEFAULT_SPEC_TYPES: &[(&str, &str)] = &[
    ("Konzepte", "Spezifikationsdokumente"),
    ("Systemlösung", "Spezifikationsdokumente"),
    ("Spezifikationen", "Spezifikationsdokumente"),
    ("Feature-Spezifikationen", "Spezifikationsdokumente"),
    ("Richtlinien", "Spezifikationsdokumente"),
    ("Produkttyp Steckbriefe", "Steckbriefe"),
    ("Anbietertyp Steckbriefe", "Steckbriefe"),
    ("Anwendungssteckbrief", "Steckbriefe"),
    ("Verzeichnis", "Steckbriefe"),
    ("Unbekannt", "Unbekannt"),
];

const SPECIFICATION_COLUMNS: &str =
    "SELECT s.id, s.name, s.version, COALESCE(s.fullname, ''), COALESCE(s.file_path, ''),
            c.name, t.name, s.req_count, s.status
     FROM specifications s
     LEFT JOIN spec_categories c ON s.category_id = c.id
     LEFT JOIN spec_types t ON s.type_id = t.id";

const REQUIREMENT_COLUMNS: &str =
    "SELECT r.id, r.specification_id, COALESCE(src.name, ''), r.requirement_number,
            COALESCE(r.title, ''), COALESCE(r.description, ''),
            COALESCE(r.processed_title, ''), COALESCE(r.processed_description, ''),
            COALESCE(ob.name, ''), COALESCE(tp.name, '')
     FROM requirements r
     LEFT JOIN req_sources src ON r.source_id = src.id
     LEFT JOIN req_obligations ob ON r.obligation_id = ob.id
     LEFT JOIN req_test_procedures tp ON r.test_procedure_id = tp.id";

/// A requirement row with its lookup ids resolved, waiting for commit
#[derive(Debug, Clone)]
struct PendingRequirement {
    specification_id: i64,
    source_id: i64,
    requirement_number: String,
    title: String,
    description: String,
    processed_title: String,
    processed_description: String,
    obligation_id: i64,
    test_procedure_id: i64,
}

/// SQLite store implementation
pub struct SqliteStore {
    conn: Connection,
    cache: LookupCache,
    pending_requirements: Vec<PendingRequirement>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Self::new(Connection::open(path)?)
    }

    /// Opens a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Wraps an opened connection, creating the schema if needed
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn,
            cache: LookupCache::new(),
            pending_requirements: Vec::new(),
        };

        store.init_schema()?;
        store.seed_static_data()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let current_version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            debug!("Creating schema version {}", SCHEMA_VERSION);
            self.conn.execute_batch(include_str!("schema.sql"))?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        } else if current_version != SCHEMA_VERSION {
            return Err(SpecsimError::Schema(format!(
                "database schema version {} is not supported, expected {}",
                current_version, SCHEMA_VERSION
            )));
        }

        Ok(())
    }

    fn seed_static_data(&mut self) -> Result<()> {
        for (type_name, category_name) in DEFAULT_SPEC_TYPES {
            self.lookup_id(LookupTable::Category, category_name)?;
            self.lookup_id(LookupTable::SpecType, type_name)?;
        }
        Ok(())
    }

    /// Drops every table and recreates an empty schema.
    ///
    /// This is the only way similarity edges are ever deleted.
    pub fn reset(&mut self) -> Result<()> {
        warn!("Dropping all tables");
        self.conn.execute_batch("PRAGMA foreign_keys=OFF;")?;
        for table in ALL_TABLES {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
        }
        self.conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        self.cache.clear();
        self.pending_requirements.clear();
        self.init_schema()?;
        self.seed_static_data()
    }

    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Forgets cached lookup ids, e.g. after the tables were reset elsewhere
    pub fn clear_lookup_cache(&mut self) {
        self.cache.clear();
    }

    /// Resolves a lookup label to its id, creating the row if absent
    pub fn lookup_id(&mut self, table: LookupTable, name: &str) -> Result<i64> {
        self.cache.get_or_create(&self.conn, table, name)
    }

    // =========================================================================
    // Specifications
    // =========================================================================

    fn row_to_specification(row: &Row<'_>) -> rusqlite::Result<Specification> {
        let status: String = row.get(8)?;
        let status = status.parse::<SpecificationStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Specification {
            id: row.get(0)?,
            name: row.get(1)?,
            version: row.get(2)?,
            fullname: row.get(3)?,
            file_path: row.get(4)?,
            category: row.get(5)?,
            spec_type: row.get(6)?,
            req_count: row.get(7)?,
            status,
        })
    }

    /// Registers a specification, or returns the existing one with the
    /// same name and version
    pub fn get_or_create_specification(&mut self, spec: &NewSpecification) -> Result<Specification> {
        let category_id = self.lookup_id(LookupTable::Category, &spec.category)?;
        let type_id = self.lookup_id(LookupTable::SpecType, &spec.spec_type)?;

        let inserted = self.conn.execute(
            "INSERT INTO specifications (name, version, fullname, file_path, category_id, type_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name, version) DO NOTHING",
            params![
                spec.name,
                spec.version,
                spec.fullname,
                spec.file_path,
                category_id,
                type_id,
            ],
        )?;
        if inserted == 0 {
            debug!("Specification {} V{} already registered", spec.name, spec.version);
        }

        self.specification_by_name(&spec.name, Some(spec.version.as_str()))?
            .ok_or_else(|| {
                SpecsimError::Schema(format!(
                    "specification {} V{} could not be retrieved or added",
                    spec.name, spec.version
                ))
            })
    }

    /// Gets a specification by id
    pub fn specification(&self, id: i64) -> Result<Option<Specification>> {
        let sql = format!("{} WHERE s.id = ?1", SPECIFICATION_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::row_to_specification)
            .optional()?)
    }

    /// Gets a specification by name; without a version the most recently
    /// registered one wins
    pub fn specification_by_name(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<Specification>> {
        let spec = match version {
            Some(version) => {
                let sql = format!(
                    "{} WHERE s.name = ?1 AND s.version = ?2",
                    SPECIFICATION_COLUMNS
                );
                self.conn
                    .query_row(&sql, params![name, version], Self::row_to_specification)
                    .optional()?
            }
            None => {
                let sql = format!(
                    "{} WHERE s.name = ?1 ORDER BY s.id DESC LIMIT 1",
                    SPECIFICATION_COLUMNS
                );
                self.conn
                    .query_row(&sql, params![name], Self::row_to_specification)
                    .optional()?
            }
        };
        Ok(spec)
    }

    /// Lists every specification
    pub fn list_specifications(&self) -> Result<Vec<Specification>> {
        let sql = format!("{} ORDER BY s.id", SPECIFICATION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let specs = stmt
            .query_map([], Self::row_to_specification)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(specs)
    }

    /// Recounts the requirements of a specification and stores the count
    pub fn update_specification_req_count(&self, specification_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM requirements WHERE specification_id = ?1",
            params![specification_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "UPDATE specifications SET req_count = ?1 WHERE id = ?2",
            params![count, specification_id],
        )?;
        Ok(count)
    }

    pub fn set_specification_status(
        &self,
        specification_id: i64,
        status: SpecificationStatus,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE specifications SET status = ?1 WHERE id = ?2",
            params![status.to_string(), specification_id],
        )?;
        if updated == 0 {
            return Err(SpecsimError::SpecificationNotFound(
                specification_id.to_string(),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Requirements
    // =========================================================================

    fn row_to_requirement(row: &Row<'_>) -> rusqlite::Result<Requirement> {
        Ok(Requirement {
            id: row.get(0)?,
            specification_id: row.get(1)?,
            source: row.get(2)?,
            requirement_number: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            processed_title: row.get(6)?,
            processed_description: row.get(7)?,
            obligation: row.get(8)?,
            test_procedure: row.get(9)?,
        })
    }

    fn query_requirements(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Requirement>> {
        let mut stmt = self.conn.prepare(sql)?;
        let requirements = stmt
            .query_map(params, Self::row_to_requirement)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requirements)
    }

    /// Buffers a requirement for the next `commit_requirements`
    pub fn add_requirement(&mut self, requirement: &NewRequirement) -> Result<()> {
        let source_id = self.lookup_id(LookupTable::Source, &requirement.source)?;
        let obligation_id = self.lookup_id(LookupTable::Obligation, &requirement.obligation)?;
        let test_procedure_id =
            self.lookup_id(LookupTable::TestProcedure, &requirement.test_procedure)?;

        self.pending_requirements.push(PendingRequirement {
            specification_id: requirement.specification_id,
            source_id,
            requirement_number: requirement.requirement_number.clone(),
            title: requirement.title.clone(),
            description: requirement.description.clone(),
            processed_title: requirement.processed_title.clone(),
            processed_description: requirement.processed_description.clone(),
            obligation_id,
            test_procedure_id,
        });
        Ok(())
    }

    /// Number of requirements waiting for commit
    pub fn pending_requirement_count(&self) -> usize {
        self.pending_requirements.len()
    }

    /// Drops every buffered requirement without writing it
    pub fn discard_pending_requirements(&mut self) -> usize {
        let discarded = self.pending_requirements.len();
        if discarded > 0 {
            warn!("Discarding {} uncommitted requirements", discarded);
        }
        self.pending_requirements.clear();
        discarded
    }

    /// Inserts every buffered requirement in one transaction.
    ///
    /// The buffer is emptied whether or not the commit succeeds.
    pub fn commit_requirements(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.pending_requirements);
        if pending.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO requirements (
                    specification_id, source_id, requirement_number, title, description,
                    processed_title, processed_description, obligation_id, test_procedure_id
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for req in &pending {
                stmt.execute(params![
                    req.specification_id,
                    req.source_id,
                    req.requirement_number,
                    req.title,
                    req.description,
                    req.processed_title,
                    req.processed_description,
                    req.obligation_id,
                    req.test_procedure_id,
                ])
                .map_err(|e| SpecsimError::from_sqlite(e, &req.requirement_number))?;
            }
        }
        tx.commit()?;

        Ok(pending.len())
    }

    /// First requirement carrying `number`, across all specifications
    pub fn requirement_by_number(&self, number: &str) -> Result<Option<Requirement>> {
        let sql = format!(
            "{} WHERE r.requirement_number = ?1 ORDER BY r.id LIMIT 1",
            REQUIREMENT_COLUMNS
        );
        Ok(self.query_requirements(&sql, &[&number])?.into_iter().next())
    }

    /// Requirements whose title or description contains `text`.
    ///
    /// `%` and `_` in `text` match literally.
    pub fn search_requirements(&self, text: &str) -> Result<Vec<Requirement>> {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        let sql = format!(
            "{} WHERE r.title LIKE ?1 ESCAPE '\\' OR r.description LIKE ?1 ESCAPE '\\'
             ORDER BY r.id",
            REQUIREMENT_COLUMNS
        );
        self.query_requirements(&sql, &[&pattern])
    }

    // =========================================================================
    // Similarities
    // =========================================================================

    /// Stored edges touching a specification on either side
    pub fn similarities_by_specification(&self, specification_id: i64) -> Result<Vec<SimilarityEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT rs.combined_identifier, rs.specification1_id, rs.specification2_id,
                    rs.requirement1_id, rs.requirement2_id,
                    rs.requirement1_number, rs.requirement2_number,
                    COALESCE(r1.title, ''), COALESCE(r2.title, ''),
                    rs.title_similarity_score, rs.description_similarity_score,
                    COALESCE(m.name, '')
             FROM requirement_similarities rs
             JOIN requirements r1 ON rs.requirement1_id = r1.id
             JOIN requirements r2 ON rs.requirement2_id = r2.id
             LEFT JOIN comparison_methods m ON rs.comparison_method_id = m.id
             WHERE r1.specification_id = ?1 OR r2.specification_id = ?1
             ORDER BY rs.description_similarity_score DESC, rs.combined_identifier",
        )?;

        let edges = stmt
            .query_map(params![specification_id], |row| {
                Ok(SimilarityEdge {
                    combined_identifier: row.get(0)?,
                    specification1_id: row.get(1)?,
                    specification2_id: row.get(2)?,
                    requirement1_id: row.get(3)?,
                    requirement2_id: row.get(4)?,
                    requirement1_number: row.get(5)?,
                    requirement2_number: row.get(6)?,
                    requirement1_title: row.get(7)?,
                    requirement2_title: row.get(8)?,
                    title_similarity: row.get(9)?,
                    description_similarity: row.get(10)?,
                    comparison_method: row.get(11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Edge counts per (specification, specification) pair
    pub fn similarity_counts(&self) -> Result<Vec<SimilarityCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT r1.specification_id, r2.specification_id,
                    s1.name, s1.version, s2.name, s2.version,
                    COUNT(*)
             FROM requirement_similarities rs
             JOIN requirements r1 ON rs.requirement1_id = r1.id
             JOIN requirements r2 ON rs.requirement2_id = r2.id
             JOIN specifications s1 ON r1.specification_id = s1.id
             JOIN specifications s2 ON r2.specification_id = s2.id
             GROUP BY r1.specification_id, r2.specification_id
             ORDER BY r1.specification_id, r2.specification_id",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok(SimilarityCount {
                    spec1_id: row.get(0)?,
                    spec2_id: row.get(1)?,
                    spec1_name: row.get(2)?,
                    spec1_version: row.get(3)?,
                    spec2_name: row.get(4)?,
                    spec2_version: row.get(5)?,
                    similarity_count: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}

impl SimilarityStore for SqliteStore {
    fn requirements_by_specification(&self, specification_id: i64) -> Result<Vec<Requirement>> {
        let sql = format!(
            "{} WHERE r.specification_id = ?1 ORDER BY r.id",
            REQUIREMENT_COLUMNS
        );
        self.query_requirements(&sql, &[&specification_id])
    }

    fn all_requirements(&self) -> Result<Vec<Requirement>> {
        let sql = format!("{} ORDER BY r.id", REQUIREMENT_COLUMNS);
        self.query_requirements(&sql, &[])
    }

    fn write_similarity_edges(&mut self, drafts: &[SimilarityEdgeDraft]) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();
        if drafts.is_empty() {
            return Ok(summary);
        }

        // Lookup rows are committed before the batch starts
        let mut method_ids: HashMap<&str, i64> = HashMap::new();
        for draft in drafts {
            if !method_ids.contains_key(draft.comparison_method.as_str()) {
                let id = self.lookup_id(LookupTable::ComparisonMethod, &draft.comparison_method)?;
                method_ids.insert(draft.comparison_method.as_str(), id);
            }
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO requirement_similarities (
                    combined_identifier,
                    specification1_id,
                    specification2_id,
                    requirement1_id,
                    requirement2_id,
                    requirement1_number,
                    requirement2_number,
                    title_similarity_score,
                    description_similarity_score,
                    comparison_method_id
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for draft in drafts {
                let key = draft.key();
                let method_id = method_ids[draft.comparison_method.as_str()];
                let result = stmt.execute(params![
                    key,
                    draft.specification1_id,
                    draft.specification2_id,
                    draft.requirement1_id,
                    draft.requirement2_id,
                    draft.requirement1_number,
                    draft.requirement2_number,
                    draft.title_similarity,
                    draft.description_similarity,
                    method_id,
                ]);

                match result {
                    Ok(_) => summary.inserted += 1,
                    Err(err) => match SpecsimError::from_sqlite(err, &key) {
                        SpecsimError::Conflict { key } => {
                            warn!("Skipping duplicate similarity edge {}", key);
                            summary.conflicts.push(key);
                        }
                        other => return Err(other),
                    },
                }
            }
        }
        tx.commit()?;

        info!(
            "Stored {} similarity edges ({} duplicates skipped)",
            summary.inserted,
            summary.skipped()
        );
        Ok(summary)
    }

    fn enrich(&self, candidates: &[Candidate]) -> Result<Vec<EnrichedRequirement>> {
        if candidates.is_empty() {
            debug!("No similar requirements to enrich");
            return Ok(Vec::new());
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "CREATE TEMP TABLE IF NOT EXISTS enrich_candidates (
                id INTEGER NOT NULL,
                similarity REAL NOT NULL
             );
             DELETE FROM enrich_candidates;",
        )?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO enrich_candidates (id, similarity) VALUES (?1, ?2)")?;
            for candidate in candidates {
                stmt.execute(params![candidate.requirement_id, candidate.similarity])?;
            }
        }

        let missing: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT c.id FROM enrich_candidates c
                 LEFT JOIN requirements r ON r.id = c.id
                 WHERE r.id IS NULL
                 ORDER BY c.id",
            )?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        };
        if !missing.is_empty() {
            return Err(SpecsimError::Schema(format!(
                "enrichment references unknown requirement ids {:?}",
                missing
            )));
        }

        let enriched = {
            let mut stmt = tx.prepare(
                "SELECT r.requirement_number,
                        spec.name,
                        source.name,
                        COALESCE(r.title, ''),
                        COALESCE(r.description, ''),
                        obligation.name,
                        test.name,
                        MAX(c.similarity) AS similarity
                 FROM enrich_candidates c
                 JOIN requirements r ON r.id = c.id
                 JOIN specifications spec ON r.specification_id = spec.id
                 JOIN req_sources source ON r.source_id = source.id
                 JOIN req_obligations obligation ON r.obligation_id = obligation.id
                 JOIN req_test_procedures test ON r.test_procedure_id = test.id
                 GROUP BY r.requirement_number
                 ORDER BY similarity DESC, r.requirement_number",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(EnrichedRequirement {
                        requirement_number: row.get(0)?,
                        specification_name: row.get(1)?,
                        source: row.get(2)?,
                        title: row.get(3)?,
                        description: row.get(4)?,
                        obligation: row.get(5)?,
                        test_procedure: row.get(6)?,
                        similarity: row.get(7)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        tx.execute("DELETE FROM enrich_candidates", [])?;
        tx.commit()?;
        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn store_with_spec(name: &str) -> (SqliteStore, Specification) {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let spec = store
            .get_or_create_specification(&NewSpecification::new(name, "1.0"))
            .unwrap();
        (store, spec)
    }

    fn add(store: &mut SqliteStore, spec: &Specification, number: &str, text: &str) {
        let mut req = NewRequirement::new(spec.id, number, text, text, text, text);
        req.source = spec.name.clone();
        req.obligation = "MUSS".to_string();
        store.add_requirement(&req).unwrap();
    }

    fn draft(a: &Requirement, b: &Requirement, score: f64) -> SimilarityEdgeDraft {
        SimilarityEdgeDraft::new(a, b, score, score, "custom_similarity")
    }

    #[test]
    fn test_open_creates_schema_and_seeds_lookups() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let store = SqliteStore::open(temp_file.path()).unwrap();

        let types: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM spec_types", [], |row| row.get(0))
            .unwrap();
        assert_eq!(types, DEFAULT_SPEC_TYPES.len() as i64);
        assert!(store.list_specifications().unwrap().is_empty());

        // Reopening an existing file keeps the schema
        drop(store);
        let reopened = SqliteStore::open(temp_file.path()).unwrap();
        assert!(reopened.all_requirements().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_schema_version_is_schema_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL);
             INSERT INTO schema_version (version) VALUES (99);",
        )
        .unwrap();
        let err = SqliteStore::new(conn).err().unwrap();
        assert!(matches!(err, SpecsimError::Schema(_)));
    }

    #[test]
    fn test_get_or_create_specification_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut new_spec = NewSpecification::new("gemSpec_Krypt", "2.3");
        new_spec.spec_type = "Spezifikationen".to_string();
        new_spec.category = "Spezifikationsdokumente".to_string();

        let first = store.get_or_create_specification(&new_spec).unwrap();
        let second = store.get_or_create_specification(&new_spec).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, SpecificationStatus::Pending);
        assert_eq!(first.spec_type.as_deref(), Some("Spezifikationen"));
        assert_eq!(store.list_specifications().unwrap().len(), 1);

        let other_version = store
            .get_or_create_specification(&NewSpecification::new("gemSpec_Krypt", "2.4"))
            .unwrap();
        assert_ne!(other_version.id, first.id);
        assert_eq!(
            store
                .specification_by_name("gemSpec_Krypt", None)
                .unwrap()
                .unwrap()
                .version,
            "2.4"
        );
    }

    #[test]
    fn test_commit_requirements_and_read_back() {
        let (mut store, spec) = store_with_spec("spec_a");
        add(&mut store, &spec, "A-1", "encrypt data");
        add(&mut store, &spec, "A-2", "sign documents");
        assert_eq!(store.pending_requirement_count(), 2);

        assert_eq!(store.commit_requirements().unwrap(), 2);
        assert_eq!(store.pending_requirement_count(), 0);
        assert_eq!(store.update_specification_req_count(spec.id).unwrap(), 2);
        assert_eq!(store.specification(spec.id).unwrap().unwrap().req_count, 2);

        let reqs = store.requirements_by_specification(spec.id).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].requirement_number, "A-1");
        assert_eq!(reqs[0].source, "spec_a");
        assert_eq!(reqs[0].obligation, "MUSS");
        assert_eq!(reqs[0].test_procedure, "unknown");

        assert_eq!(
            store.requirement_by_number("A-2").unwrap().unwrap().title,
            "sign documents"
        );
        assert_eq!(store.search_requirements("crypt").unwrap().len(), 1);
    }

    #[test]
    fn test_search_matches_wildcards_literally() {
        let (mut store, spec) = store_with_spec("spec_a");
        add(&mut store, &spec, "A-1", "at least 100% coverage");
        add(&mut store, &spec, "A-2", "use the key_id field");
        add(&mut store, &spec, "A-3", "use the keyXid field");
        add(&mut store, &spec, "A-4", "path C:\\certs");
        store.commit_requirements().unwrap();

        let numbers = |text: &str| -> Vec<String> {
            store
                .search_requirements(text)
                .unwrap()
                .into_iter()
                .map(|r| r.requirement_number)
                .collect()
        };
        assert_eq!(numbers("%"), vec!["A-1"]);
        assert_eq!(numbers("key_id"), vec!["A-2"]);
        assert_eq!(numbers("C:\\certs"), vec!["A-4"]);
        assert_eq!(numbers("use").len(), 2);
    }

    #[test]
    fn test_discard_pending_requirements() {
        let (mut store, spec) = store_with_spec("spec_a");
        add(&mut store, &spec, "A-1", "encrypt data");
        add(&mut store, &spec, "A-2", "sign documents");

        assert_eq!(store.discard_pending_requirements(), 2);
        assert_eq!(store.pending_requirement_count(), 0);
        assert_eq!(store.commit_requirements().unwrap(), 0);
        assert!(store.all_requirements().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_stored_status_is_an_error() {
        let (store, spec) = store_with_spec("spec_a");
        store
            .connection()
            .execute(
                "UPDATE specifications SET status = 'archived' WHERE id = ?1",
                params![spec.id],
            )
            .unwrap();

        assert!(store.specification(spec.id).is_err());
    }

    #[test]
    fn test_commit_with_unknown_specification_is_schema_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let req = NewRequirement::new(42, "X-1", "t", "d", "t", "d");
        store.add_requirement(&req).unwrap();

        let err = store.commit_requirements().unwrap_err();
        assert!(matches!(err, SpecsimError::Schema(_)));
        assert!(store.all_requirements().unwrap().is_empty());
    }

    #[test]
    fn test_set_specification_status() {
        let (store, spec) = store_with_spec("spec_a");
        store
            .set_specification_status(spec.id, SpecificationStatus::Processed)
            .unwrap();
        assert_eq!(
            store.specification(spec.id).unwrap().unwrap().status,
            SpecificationStatus::Processed
        );
        assert!(store
            .set_specification_status(999, SpecificationStatus::Failed)
            .is_err());
    }

    #[test]
    fn test_write_edges_skips_duplicates_and_keeps_the_rest() {
        let (mut store, spec) = store_with_spec("spec_a");
        add(&mut store, &spec, "A-1", "one");
        add(&mut store, &spec, "A-2", "two");
        add(&mut store, &spec, "A-3", "three");
        store.commit_requirements().unwrap();
        let reqs = store.all_requirements().unwrap();

        let first = store
            .write_similarity_edges(&[draft(&reqs[0], &reqs[1], 0.5)])
            .unwrap();
        assert_eq!(first.inserted, 1);

        let second = store
            .write_similarity_edges(&[
                draft(&reqs[0], &reqs[1], 0.5),
                draft(&reqs[0], &reqs[2], 0.4),
                draft(&reqs[1], &reqs[0], 0.5),
            ])
            .unwrap();
        assert_eq!(second.inserted, 2);
        assert_eq!(second.conflicts, vec![format!("{}_{}", reqs[0].id, reqs[1].id)]);

        let edges = store.similarities_by_specification(spec.id).unwrap();
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().all(|e| e.comparison_method == "custom_similarity"));
    }

    #[test]
    fn test_stale_lookup_cache_is_schema_error() {
        let (mut store, spec) = store_with_spec("spec_a");
        add(&mut store, &spec, "A-1", "one");
        add(&mut store, &spec, "A-2", "two");
        store.commit_requirements().unwrap();
        let reqs = store.all_requirements().unwrap();

        store
            .write_similarity_edges(&[draft(&reqs[0], &reqs[1], 0.5)])
            .unwrap();
        store
            .connection()
            .execute_batch(
                "DELETE FROM requirement_similarities; DELETE FROM comparison_methods;",
            )
            .unwrap();

        let err = store
            .write_similarity_edges(&[draft(&reqs[1], &reqs[0], 0.5)])
            .unwrap_err();
        assert!(matches!(err, SpecsimError::Schema(_)));
        assert!(store.similarities_by_specification(spec.id).unwrap().is_empty());

        // A fresh cache recovers
        store.clear_lookup_cache();
        let summary = store
            .write_similarity_edges(&[draft(&reqs[1], &reqs[0], 0.5)])
            .unwrap();
        assert_eq!(summary.inserted, 1);
    }

    #[test]
    fn test_similarity_counts_per_spec_pair() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store
            .get_or_create_specification(&NewSpecification::new("spec_a", "1"))
            .unwrap();
        let b = store
            .get_or_create_specification(&NewSpecification::new("spec_b", "1"))
            .unwrap();
        add(&mut store, &a, "A-1", "one");
        add(&mut store, &b, "B-1", "one");
        add(&mut store, &b, "B-2", "one");
        store.commit_requirements().unwrap();
        let ra = store.requirements_by_specification(a.id).unwrap();
        let rb = store.requirements_by_specification(b.id).unwrap();

        store
            .write_similarity_edges(&[draft(&ra[0], &rb[0], 1.0), draft(&ra[0], &rb[1], 1.0)])
            .unwrap();

        let counts = store.similarity_counts().unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].spec1_name, "spec_a");
        assert_eq!(counts[0].spec2_name, "spec_b");
        assert_eq!(counts[0].similarity_count, 2);
    }

    #[test]
    fn test_enrich_empty_input_does_not_query() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch("PRAGMA foreign_keys=OFF; DROP TABLE requirements;")
            .unwrap();
        assert!(store.enrich(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_enrich_orders_and_groups_by_number() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store
            .get_or_create_specification(&NewSpecification::new("spec_a", "1"))
            .unwrap();
        let b = store
            .get_or_create_specification(&NewSpecification::new("spec_b", "1"))
            .unwrap();
        add(&mut store, &a, "A-1", "encrypt data");
        add(&mut store, &a, "A-2", "sign data");
        add(&mut store, &b, "A-1", "encrypt all data");
        store.commit_requirements().unwrap();
        let reqs = store.all_requirements().unwrap();

        let enriched = store
            .enrich(&[
                Candidate { requirement_id: reqs[0].id, similarity: 0.4 },
                Candidate { requirement_id: reqs[1].id, similarity: 0.6 },
                Candidate { requirement_id: reqs[2].id, similarity: 0.5 },
                Candidate { requirement_id: reqs[1].id, similarity: 0.6 },
            ])
            .unwrap();

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].requirement_number, "A-2");
        assert_eq!(enriched[0].similarity, 0.6);
        assert_eq!(enriched[0].specification_name, "spec_a");
        assert_eq!(enriched[0].obligation, "MUSS");
        assert_eq!(enriched[0].test_procedure, "unknown");
        // the two "A-1" rows collapse onto the better match
        assert_eq!(enriched[1].requirement_number, "A-1");
        assert_eq!(enriched[1].similarity, 0.5);
        assert_eq!(enriched[1].specification_name, "spec_b");
    }

    #[test]
    fn test_enrich_unknown_id_is_schema_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .enrich(&[Candidate { requirement_id: 7, similarity: 0.9 }])
            .unwrap_err();
        assert!(matches!(err, SpecsimError::Schema(_)));
    }

    #[test]
    fn test_reset_drops_everything() {
        let (mut store, spec) = store_with_spec("spec_a");
        add(&mut store, &spec, "A-1", "one");
        store.commit_requirements().unwrap();

        store.reset().unwrap();
        assert!(store.all_requirements().unwrap().is_empty());
        assert!(store.list_specifications().unwrap().is_empty());

        // the writer keeps working against the new tables
        let spec = store
            .get_or_create_specification(&NewSpecification::new("spec_a", "1.0"))
            .unwrap();
        add(&mut store, &spec, "A-1", "one");
        assert_eq!(store.commit_requirements().unwrap(), 1);
    }
}
