//! Scripted provider for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::provider::{ChunkStream, LlmProvider};
use super::tool::ToolCall;
use crate::error::AgentError;

enum Step {
    Reply(String),
    ToolCalls(Vec<ToolCall>),
    Error(String),
}

/// Provider that replays a fixed script of `chat` outcomes and streams
/// a fixed chunk list.
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    chunks: Vec<Result<String, String>>,
    stream_open_error: Option<String>,
    stall_after_chunks: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, content: &str) -> Self {
        self.push(Step::Reply(content.to_string()))
    }

    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.push(Step::ToolCalls(calls))
    }

    pub fn with_error(self, message: &str) -> Self {
        self.push(Step::Error(message.to_string()))
    }

    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks
            .extend(chunks.iter().map(|c| Ok((*c).to_string())));
        self
    }

    pub fn with_chunk_error(mut self, message: &str) -> Self {
        self.chunks.push(Err(message.to_string()));
        self
    }

    /// Never ends the chunk stream after the scripted chunks.
    pub fn with_stalled_stream(mut self) -> Self {
        self.stall_after_chunks = true;
        self
    }

    pub fn with_stream_open_error(mut self, message: &str) -> Self {
        self.stream_open_error = Some(message.to_string());
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(self, step: Step) -> Self {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
        self
    }

    fn record(&self, request: &ChatRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.record(request);
        let step = self.steps.lock().ok().and_then(|mut s| s.pop_front());
        let (content, tool_calls) = match step {
            Some(Step::Reply(content)) => (content, Vec::new()),
            Some(Step::ToolCalls(calls)) => (String::new(), calls),
            Some(Step::Error(message)) => {
                return Err(AgentError::ApiRequest {
                    message,
                    status: Some(503),
                });
            }
            None => (String::new(), Vec::new()),
        };
        Ok(ChatResponse {
            content,
            usage: TokenUsage::default(),
            tool_calls,
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, AgentError> {
        self.record(request);
        if let Some(message) = &self.stream_open_error {
            return Err(AgentError::ApiRequest {
                message: message.clone(),
                status: None,
            });
        }
        let items: Vec<Result<String, AgentError>> = self
            .chunks
            .iter()
            .map(|c| {
                c.clone()
                    .map_err(|message| AgentError::Stream { message })
            })
            .collect();
        let chunks = stream::iter(items);
        if self.stall_after_chunks {
            Ok(Box::pin(chunks.chain(stream::pending())))
        } else {
            Ok(Box::pin(chunks))
        }
    }
}
