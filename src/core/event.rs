//! Events delivered to callers of the streaming pipeline.
//!
//! Each event is a self-contained record serialized as a JSON object with a
//! `type` tag. Transports frame them (SSE `data:` lines, NDJSON) without
//! inspecting their contents.

use serde::{Deserialize, Serialize};

use super::result::StructuredResult;

/// Progress status of an agent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step has started.
    InProgress,
    /// The step finished.
    Completed,
}

/// A single streamed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Human-readable progress note.
    Thinking {
        /// Note text.
        message: String,
    },
    /// An agent started or finished a pipeline step.
    AgentStep {
        /// Agent display name.
        agent: String,
        /// Step description.
        step: String,
        /// Step status.
        status: StepStatus,
        /// Optional short outcome.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    /// A source discovered by retrieval.
    Source {
        /// Source name.
        source: String,
    },
    /// A user-visible answer chunk.
    Content {
        /// Chunk text, unchanged from the generation stream.
        chunk: String,
    },
    /// Structured metadata from the final aggregation.
    Metadata {
        /// Pipeline steps.
        reasoning_steps: Vec<String>,
        /// Source names.
        sources: Vec<String>,
        /// Tool identifiers.
        tools_used: Vec<String>,
    },
    /// Terminal success event.
    Done {
        /// Concatenation of every emitted content chunk.
        full_response: String,
    },
    /// Terminal failure event.
    Error {
        /// Underlying failure message.
        message: String,
    },
}

impl StreamEvent {
    /// Creates a `thinking` event.
    #[must_use]
    pub fn thinking(message: impl Into<String>) -> Self {
        Self::Thinking {
            message: message.into(),
        }
    }

    /// Creates an in-progress `agent_step` event.
    #[must_use]
    pub fn step_started(agent: &str, step: &str) -> Self {
        Self::AgentStep {
            agent: agent.to_string(),
            step: step.to_string(),
            status: StepStatus::InProgress,
            response: None,
        }
    }

    /// Creates a completed `agent_step` event.
    #[must_use]
    pub fn step_completed(agent: &str, step: &str, response: impl Into<String>) -> Self {
        Self::AgentStep {
            agent: agent.to_string(),
            step: step.to_string(),
            status: StepStatus::Completed,
            response: Some(response.into()),
        }
    }

    /// Creates a `metadata` event from a structured result.
    #[must_use]
    pub fn metadata(result: &StructuredResult) -> Self {
        Self::Metadata {
            reasoning_steps: result.reasoning_steps.clone(),
            sources: result.sources.clone(),
            tools_used: result.tools_used.clone(),
        }
    }

    /// Returns `true` for `done` and `error`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Serializes the event as a single-line JSON object.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"event serialization failed: {e}"}}"#)
        })
    }
}
