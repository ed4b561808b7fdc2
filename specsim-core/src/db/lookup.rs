//! Name-keyed lookup tables and the per-writer id cache

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// The six dictionary tables referenced by specifications, requirements
/// and similarity edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupTable {
    Category,
    SpecType,
    Source,
    Obligation,
    TestProcedure,
    ComparisonMethod,
}

impl LookupTable {
    pub const ALL: [LookupTable; 6] = [
        LookupTable::Category,
        LookupTable::SpecType,
        LookupTable::Source,
        LookupTable::Obligation,
        LookupTable::TestProcedure,
        LookupTable::ComparisonMethod,
    ];

    /// SQL table name. Only these fixed names are ever interpolated into SQL.
    pub fn table_name(self) -> &'static str {
        match self {
            LookupTable::Category => "spec_categories",
            LookupTable::SpecType => "spec_types",
            LookupTable::Source => "req_sources",
            LookupTable::Obligation => "req_obligations",
            LookupTable::TestProcedure => "req_test_procedures",
            LookupTable::ComparisonMethod => "comparison_methods",
        }
    }
}

impl fmt::Display for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// Caches `(table, name) -> id` for the lifetime of one store instance.
///
/// Ids are only valid against the tables they were read from. After the
/// tables are dropped (or another process resets them) the cache must be
/// cleared, otherwise writes reference ids that no longer exist and fail
/// with a schema error.
#[derive(Debug, Default)]
pub struct LookupCache {
    ids: HashMap<(LookupTable, String), i64>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, inserting the row if it does not exist
    pub fn get_or_create(
        &mut self,
        conn: &Connection,
        table: LookupTable,
        name: &str,
    ) -> Result<i64> {
        if let Some(id) = self.ids.get(&(table, name.to_string())) {
            return Ok(*id);
        }

        let existing: Option<i64> = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?1", table.table_name()),
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute(
                    &format!("INSERT INTO {} (name) VALUES (?1)", table.table_name()),
                    params![name],
                )?;
                conn.last_insert_rowid()
            }
        };

        self.ids.insert((table, name.to_string()), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forgets every cached id
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn_with_tables() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("schema.sql")).unwrap();
        conn
    }

    #[test]
    fn test_get_or_create_inserts_once() {
        let conn = conn_with_tables();
        let mut cache = LookupCache::new();

        let first = cache
            .get_or_create(&conn, LookupTable::Obligation, "MUSS")
            .unwrap();
        let second = cache
            .get_or_create(&conn, LookupTable::Obligation, "MUSS")
            .unwrap();
        assert_eq!(first, second);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM req_obligations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_fresh_cache_finds_existing_rows() {
        let conn = conn_with_tables();
        let id = LookupCache::new()
            .get_or_create(&conn, LookupTable::Source, "gemSpec_Krypt")
            .unwrap();

        let mut fresh = LookupCache::new();
        assert!(fresh.is_empty());
        assert_eq!(
            fresh
                .get_or_create(&conn, LookupTable::Source, "gemSpec_Krypt")
                .unwrap(),
            id
        );
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_tables_are_independent() {
        let conn = conn_with_tables();
        let mut cache = LookupCache::new();
        let a = cache
            .get_or_create(&conn, LookupTable::Category, "same")
            .unwrap();
        let b = cache
            .get_or_create(&conn, LookupTable::SpecType, "same")
            .unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 1);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
