//! Persistence layer for specsim
//!
//! The comparison engine works against the `SimilarityStore` trait; the
//! SQLite implementation adds the import, listing and reporting queries the
//! CLI needs on top of it.

mod lookup;
mod sqlite_store;
mod traits;

pub use lookup::{LookupCache, LookupTable};
pub use sqlite_store::{SqliteStore, DEFAULT_SPEC_TYPES};
pub use traits::{SimilarityStore, WriteSummary};
