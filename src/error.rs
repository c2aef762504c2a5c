//! Error types for policy-assistant.
//!
//! Each layer has its own error enum; [`Error`] unifies them for the CLI
//! and library entry points.

use thiserror::Error;

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Knowledge store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// CLI command failure.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Agent pipeline failure.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the SQLite knowledge store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying `SQLite` error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store has not been initialized with `init`.
    #[error("knowledge store not initialized (run `policy-assistant init` first)")]
    NotInitialized,

    /// A document with this name already exists.
    #[error("document already exists: {name}")]
    DuplicateDocument {
        /// Document name.
        name: String,
    },

    /// Metadata could not be (de)serialized.
    #[error("metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errors raised by CLI command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not run to completion.
    #[error("{0}")]
    ExecutionFailed(String),

    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}

/// Errors raised by the agent pipeline and its collaborators.
///
/// Any of these terminates a run: the orchestrator surfaces it as a single
/// terminal failure and never retries.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key configured for the generation provider.
    #[error("API key missing (set LLM_MODEL_API_KEY or OPENAI_API_KEY)")]
    ApiKeyMissing,

    /// Provider name not recognised.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// The generation request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The generation stream failed mid-flight.
    #[error("stream error: {message}")]
    Stream {
        /// Provider error message.
        message: String,
    },

    /// A tool call failed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The model kept requesting tools past the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured iteration limit.
        max_iterations: usize,
    },

    /// The retrieval collaborator failed.
    #[error("retrieval failed: {message}")]
    Retrieval {
        /// Failure description.
        message: String,
    },

    /// Pipeline sequencing failure (bad input, join errors).
    #[error("{message}")]
    Orchestration {
        /// Failure description.
        message: String,
    },
}

impl From<StorageError> for AgentError {
    fn from(e: StorageError) -> Self {
        Self::Retrieval {
            message: e.to_string(),
        }
    }
}
