//! Generation collaborator trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls, so agent logic never depends on a
//! particular LLM vendor.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// Ordered stream of generated text chunks. Chunks may be empty.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>;

/// Trait for LLM provider backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Generates a complete response.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;

    /// Generates a response as incremental text chunks.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the stream cannot be opened; failures
    /// mid-stream arrive as `Err` items.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, AgentError>;
}
