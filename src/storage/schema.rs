//! Knowledge store schema.

/// Current schema version, recorded in the `meta` table.
pub const SCHEMA_VERSION: i64 = 1;

/// Tables for documents, their passages, and the passage full-text index.
///
/// `passages_fts` rows share their rowid with `passages.id`.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    filename TEXT,
    size INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

CREATE TABLE IF NOT EXISTS passages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    ordinal INTEGER NOT NULL,
    heading TEXT,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_passages_document ON passages(document_id, ordinal);

CREATE VIRTUAL TABLE IF NOT EXISTS passages_fts USING fts5(
    heading,
    content,
    tokenize="unicode61 remove_diacritics 1"
);
"#;
