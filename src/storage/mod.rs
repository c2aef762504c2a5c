//! Persistent policy knowledge store.
//!
//! Documents are split into passages at ingestion time; passages are
//! indexed with SQLite FTS5 and ranked with BM25.

mod schema;
mod sqlite;

pub use schema::SCHEMA_VERSION;
pub use sqlite::{Document, PassageHit, SqliteStorage, StoreStats};

/// Default database location relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".policy-assistant/knowledge.db";
