//! Multi-agent question answering over the policy knowledge base.
//!
//! Uses a pluggable provider abstraction backed by `OpenAI`-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator
//!   ├── Retriever (knowledge-base search) → passages, sources
//!   ├── RetrievalAgent (condenses passages to JSON)
//!   ├── AnalysisAgent (agentic loop over the domain tools)
//!   ├── CoordinatorAgent, streamed → StreamClassifier → content events
//!   └── CoordinatorAgent, structured → ResultAggregator → StructuredResult
//! ```
//!
//! # Feature Gate
//!
//! This module requires the `agent` feature flag.

pub mod agentic_loop;
pub mod analysis;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retrieval;
pub mod tool;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::AnalysisAgent;
pub use client::create_provider;
pub use config::AgentConfig;
pub use coordinator::CoordinatorAgent;
pub use executor::ToolExecutor;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{EventStream, Orchestrator, QueryRequest};
pub use prompt::PromptSet;
pub use provider::{ChunkStream, LlmProvider};
pub use retrieval::RetrievalAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse, execute_with_tools};
