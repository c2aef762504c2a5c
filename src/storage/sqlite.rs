//! `SQLite` implementation of the knowledge store.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::chunking::PassageDraft;
use crate::error::StorageError;

type Result<T> = std::result::Result<T, StorageError>;

/// A stored policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Row identifier.
    pub id: i64,
    /// Unique display name, reported as the passage source.
    pub name: String,
    /// Originating file name, if loaded from disk.
    pub filename: Option<String>,
    /// Content size in bytes.
    pub size: usize,
    /// Number of passages.
    pub passage_count: usize,
    /// Unix timestamp of ingestion.
    pub created_at: i64,
}

/// A passage returned by full-text search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassageHit {
    /// Passage row identifier.
    pub passage_id: i64,
    /// Owning document name.
    pub document: String,
    /// Owning document file name.
    pub filename: Option<String>,
    /// Section heading the passage was cut from.
    pub heading: Option<String>,
    /// Passage text.
    pub content: String,
    /// BM25 relevance, higher is better.
    pub score: f64,
}

/// Store-wide counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of documents.
    pub documents: usize,
    /// Number of passages.
    pub passages: usize,
    /// Total document bytes.
    pub total_size: usize,
    /// Schema version, if initialized.
    pub schema_version: Option<i64>,
    /// Database file, `None` for in-memory stores.
    pub path: Option<PathBuf>,
}

/// Policy knowledge store backed by `SQLite` with an FTS5 passage index.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Opens (or creates) a database file. Does not create tables; see [`Self::init`].
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens an initialized in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        let mut storage = Self { conn, path: None };
        storage.init()?;
        Ok(storage)
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        Ok(())
    }

    /// Creates tables and records the schema version. Idempotent.
    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        info!(version = SCHEMA_VERSION, "knowledge store initialized");
        Ok(())
    }

    /// Returns whether [`Self::init`] has been run on this database.
    pub fn is_initialized(&self) -> Result<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
            [],
            |row| row.get(0),
        )?;
        Ok(exists > 0)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    /// Stores a document and indexes its passages in one transaction.
    ///
    /// Returns the new document id.
    pub fn add_document(
        &mut self,
        name: &str,
        filename: Option<&str>,
        size: usize,
        passages: &[PassageDraft],
    ) -> Result<i64> {
        self.ensure_initialized()?;
        if self.get_document(name)?.is_some() {
            return Err(StorageError::DuplicateDocument {
                name: name.to_string(),
            });
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (name, filename, size) VALUES (?1, ?2, ?3)",
            params![name, filename, i64::try_from(size).unwrap_or(i64::MAX)],
        )?;
        let document_id = tx.last_insert_rowid();

        {
            let mut insert_passage = tx.prepare(
                "INSERT INTO passages (document_id, ordinal, heading, content)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_fts = tx.prepare(
                "INSERT INTO passages_fts (rowid, heading, content) VALUES (?1, ?2, ?3)",
            )?;
            for (ordinal, passage) in passages.iter().enumerate() {
                insert_passage.execute(params![
                    document_id,
                    i64::try_from(ordinal).unwrap_or(i64::MAX),
                    passage.heading,
                    passage.content
                ])?;
                let passage_id = tx.last_insert_rowid();
                insert_fts.execute(params![
                    passage_id,
                    passage.heading.as_deref().unwrap_or(""),
                    passage.content
                ])?;
            }
        }

        tx.commit()?;
        info!(
            document = name,
            id = document_id,
            passages = passages.len(),
            "document stored"
        );
        Ok(document_id)
    }

    /// Removes a document and its passages. Returns `false` if it did not exist.
    pub fn remove_document(&mut self, name: &str) -> Result<bool> {
        self.ensure_initialized()?;
        let Some(doc) = self.get_document(name)? else {
            return Ok(false);
        };
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM passages_fts WHERE rowid IN (SELECT id FROM passages WHERE document_id = ?1)",
            params![doc.id],
        )?;
        tx.execute("DELETE FROM passages WHERE document_id = ?1", params![doc.id])?;
        tx.execute("DELETE FROM documents WHERE id = ?1", params![doc.id])?;
        tx.commit()?;
        info!(document = name, "document removed");
        Ok(true)
    }

    /// Looks up a document by name.
    pub fn get_document(&self, name: &str) -> Result<Option<Document>> {
        self.conn
            .query_row(
                "SELECT d.id, d.name, d.filename, d.size, d.created_at,
                        (SELECT COUNT(*) FROM passages p WHERE p.document_id = d.id)
                 FROM documents d WHERE d.name = ?1",
                params![name],
                row_to_document,
            )
            .optional()
            .map_err(StorageError::from)
    }

    /// Lists documents in ingestion order.
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.filename, d.size, d.created_at,
                    (SELECT COUNT(*) FROM passages p WHERE p.document_id = d.id)
             FROM documents d ORDER BY d.id",
        )?;
        let docs = stmt
            .query_map([], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Runs an FTS5 `MATCH` expression and returns the best `limit` passages.
    ///
    /// `match_expr` must already be a valid FTS5 query; see
    /// [`crate::search::fts_query`].
    pub fn search_passages(&self, match_expr: &str, limit: usize) -> Result<Vec<PassageHit>> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT p.id, d.name, d.filename, p.heading, p.content, bm25(passages_fts) AS rank
             FROM passages_fts
             JOIN passages p ON p.id = passages_fts.rowid
             JOIN documents d ON d.id = p.document_id
             WHERE passages_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(
                params![match_expr, i64::try_from(limit).unwrap_or(i64::MAX)],
                |row| {
                    let rank: f64 = row.get(5)?;
                    Ok(PassageHit {
                        passage_id: row.get(0)?,
                        document: row.get(1)?,
                        filename: row.get(2)?,
                        heading: row.get(3)?,
                        content: row.get(4)?,
                        score: -rank,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(query = match_expr, hits = hits.len(), "fts search");
        Ok(hits)
    }

    /// Returns store-wide counters.
    pub fn stats(&self) -> Result<StoreStats> {
        self.ensure_initialized()?;
        let (documents, total_size): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM documents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let passages: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
        let schema_version = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .and_then(|v| v.parse().ok());

        Ok(StoreStats {
            documents: to_usize(documents),
            passages: to_usize(passages),
            total_size: to_usize(total_size),
            schema_version,
            path: self.path.clone(),
        })
    }

    /// Database file path, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        name: row.get(1)?,
        filename: row.get(2)?,
        size: to_usize(row.get(3)?),
        created_at: row.get(4)?,
        passage_count: to_usize(row.get(5)?),
    })
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drafts() -> Vec<PassageDraft> {
        vec![
            PassageDraft {
                heading: Some("Leave".to_string()),
                content: "Employees accrue twenty days of annual leave.".to_string(),
            },
            PassageDraft {
                heading: Some("Hardware".to_string()),
                content: "Laptop requests need manager approval.".to_string(),
            },
        ]
    }

    fn store() -> SqliteStorage {
        SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_uninitialized_file_store() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("kb.db");
        let mut s = SqliteStorage::open(&path).unwrap_or_else(|_| unreachable!());
        assert!(!s.is_initialized().unwrap_or(true));
        assert!(matches!(s.stats(), Err(StorageError::NotInitialized)));
        s.init().unwrap_or_else(|_| unreachable!());
        assert!(s.is_initialized().unwrap_or(false));
        assert_eq!(s.path(), Some(path.as_path()));
    }

    #[test]
    fn test_add_and_list() {
        let mut s = store();
        let id = s
            .add_document("Handbook", Some("handbook.md"), 90, &drafts())
            .unwrap_or_else(|_| unreachable!());
        assert!(id > 0);
        let docs = s.list_documents().unwrap_or_default();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "Handbook");
        assert_eq!(docs[0].filename.as_deref(), Some("handbook.md"));
        assert_eq!(docs[0].passage_count, 2);

        let stats = s.stats().unwrap_or_else(|_| unreachable!());
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.passages, 2);
        assert_eq!(stats.total_size, 90);
        assert_eq!(stats.schema_version, Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut s = store();
        assert!(s.add_document("Handbook", None, 0, &drafts()).is_ok());
        assert!(matches!(
            s.add_document("Handbook", None, 0, &drafts()),
            Err(StorageError::DuplicateDocument { .. })
        ));
    }

    #[test]
    fn test_search_ranks_matching_passage() {
        let mut s = store();
        assert!(s.add_document("Handbook", None, 0, &drafts()).is_ok());
        let hits = s.search_passages("\"laptop\"", 3).unwrap_or_default();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, "Handbook");
        assert_eq!(hits[0].heading.as_deref(), Some("Hardware"));
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn test_remove_document_clears_index() {
        let mut s = store();
        assert!(s.add_document("Handbook", None, 0, &drafts()).is_ok());
        assert!(s.remove_document("Handbook").unwrap_or(false));
        assert!(!s.remove_document("Handbook").unwrap_or(true));
        assert!(s.search_passages("\"leave\"", 3).unwrap_or_default().is_empty());
        assert_eq!(s.stats().map(|st| st.passages).unwrap_or(99), 0);
    }
}
