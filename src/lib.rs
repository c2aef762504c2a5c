//! # policy-assistant
//!
//! Multi-agent question answering over an organization's policy manual.
//!
//! A query flows through three agents. Retrieval finds relevant passages in
//! the knowledge base, analysis applies the domain tools (keyword counting,
//! role lookup, calculator) and a coordinator writes the final markdown
//! answer. The answer is streamed to the caller while a separate structured
//! pass feeds the [`crate::core::ResultAggregator`], which always yields a complete
//! [`crate::core::StructuredResult`] even when the model returns malformed JSON.
//!
//! ## Layout
//!
//! - [`crate::core`]: stream classifier, result aggregator, event and result types
//! - [`tools`]: the domain tools, pure and synchronous
//! - [`storage`], [`chunking`], [`search`]: the `SQLite` knowledge base
//! - `agent` (feature `agent`): provider, agents and orchestrator
//! - `server` (feature `server`): HTTP JSON and SSE transport
//! - `mcp` (feature `mcp`): Model Context Protocol transport
//! - [`cli`]: the `policy-assistant` command line
//!
//! ## Example
//!
//! ```
//! use policy_assistant::core::StreamClassifier;
//!
//! let mut classifier = StreamClassifier::new();
//! let shown = classifier.filter(["```json", "{\"answer\": 1}", "## Approval", " steps"]);
//! assert_eq!(shown, ["## Approval", " steps"]);
//! ```

#[cfg(feature = "agent")]
pub mod agent;
pub mod chunking;
pub mod cli;
pub mod core;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod search;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;
pub mod tools;

pub use crate::core::{ResultAggregator, StreamClassifier, StreamEvent, StructuredResult};
pub use error::{AgentError, CommandError, Error, Result, StorageError};
pub use search::{Passage, Retriever};
pub use storage::SqliteStorage;

#[cfg(feature = "agent")]
pub use agent::{AgentConfig, Orchestrator, QueryRequest};
