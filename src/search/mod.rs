//! Retrieval over the policy knowledge store.
//!
//! The [`Retriever`] trait is the collaborator boundary the agent pipeline
//! depends on: `search(query)` yields ranked passages whose metadata names
//! their source. [`SqliteRetriever`] implements it over [`SqliteStorage`]
//! with BM25 full-text ranking.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AgentError, StorageError};
use crate::storage::{PassageHit, SqliteStorage};

/// Source name used for passages whose metadata carries none.
pub const DEFAULT_SOURCE_NAME: &str = "Organization Policy";

/// Default number of passages returned per search.
pub const DEFAULT_TOP_K: usize = 3;

/// Upper bound on `top_k`.
pub const MAX_TOP_K: usize = 50;

/// A ranked passage returned by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text.
    pub text: String,
    /// Free-form metadata; `source`, `name` or `filename` identify the origin.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Relevance score, higher is better.
    #[serde(default)]
    pub score: f64,
}

impl Passage {
    /// Returns the passage's source name.
    ///
    /// Reads `metadata.source`, then `name`, then `filename`, ignoring blank
    /// values, and falls back to [`DEFAULT_SOURCE_NAME`].
    #[must_use]
    pub fn source_name(&self) -> &str {
        ["source", "name", "filename"]
            .iter()
            .find_map(|key| match self.metadata.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
                _ => None,
            })
            .unwrap_or(DEFAULT_SOURCE_NAME)
    }
}

impl From<PassageHit> for Passage {
    fn from(hit: PassageHit) -> Self {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::String(hit.document));
        if let Some(filename) = hit.filename {
            metadata.insert("filename".to_string(), Value::String(filename));
        }
        if let Some(heading) = hit.heading {
            metadata.insert("heading".to_string(), Value::String(heading));
        }
        metadata.insert("passage_id".to_string(), Value::from(hit.passage_id));
        Self {
            text: hit.content,
            metadata,
            score: hit.score,
        }
    }
}

/// Returns the distinct source names of `passages`, in first-seen order.
#[must_use]
pub fn unique_sources(passages: &[Passage]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for p in passages {
        let name = p.source_name();
        if !out.iter().any(|s| s == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Document retrieval collaborator.
///
/// An empty result is a normal outcome, not an error.
pub trait Retriever: Send + Sync {
    /// Returns up to `top_k` passages ranked by relevance to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] if the backing store fails.
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, AgentError>;
}

/// Builds an FTS5 `MATCH` expression from free text.
///
/// Each word becomes a quoted term and terms are OR-ed, so punctuation and
/// FTS5 operators in user input are never interpreted. Returns `None` when
/// the text has no words.
#[must_use]
pub fn fts_query(text: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in text.unicode_words() {
        let term = format!("\"{}\"", word.to_lowercase().replace('"', "\"\""));
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Runs a BM25 search over the store.
///
/// # Errors
///
/// Returns an error if the store is not initialized or the query fails.
pub fn search_bm25(
    storage: &SqliteStorage,
    query: &str,
    top_k: usize,
) -> Result<Vec<Passage>, StorageError> {
    let Some(expr) = fts_query(query) else {
        return Ok(Vec::new());
    };
    let hits = storage.search_passages(&expr, top_k.clamp(1, MAX_TOP_K))?;
    debug!(query, hits = hits.len(), "bm25 search");
    Ok(hits.into_iter().map(Passage::from).collect())
}

/// [`Retriever`] over a [`SqliteStorage`].
#[derive(Debug)]
pub struct SqliteRetriever {
    storage: Mutex<SqliteStorage>,
}

impl SqliteRetriever {
    /// Wraps an initialized store.
    #[must_use]
    pub const fn new(storage: SqliteStorage) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }
}

impl Retriever for SqliteRetriever {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, AgentError> {
        let storage = self.storage.lock().map_err(|_| AgentError::Retrieval {
            message: "knowledge store lock poisoned".to_string(),
        })?;
        Ok(search_bm25(&storage, query, top_k)?)
    }
}

/// [`Retriever`] over a fixed passage list, matching by case-insensitive word overlap.
///
/// Used for tests and for running the pipeline without a database.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    passages: Vec<Passage>,
}

impl StaticRetriever {
    /// Creates a retriever over `passages`.
    #[must_use]
    pub const fn new(passages: Vec<Passage>) -> Self {
        Self { passages }
    }
}

impl Retriever for StaticRetriever {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, AgentError> {
        let words: Vec<String> = query.unicode_words().map(str::to_lowercase).collect();
        let mut scored: Vec<(usize, &Passage)> = self
            .passages
            .iter()
            .map(|p| {
                let text = p.text.to_lowercase();
                (words.iter().filter(|w| text.contains(w.as_str())).count(), p)
            })
            .filter(|(n, _)| *n > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(n, p)| Passage {
                score: f64::from(u32::try_from(n).unwrap_or(u32::MAX)),
                ..p.clone()
            })
            .collect())
    }
}
