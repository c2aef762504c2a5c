//! Chat types exchanged with the generation provider.
//!
//! Agents build a [`ChatRequest`]; providers translate it to their SDK and
//! answer with a [`ChatResponse`]. The tool loop appends assistant tool-call
//! turns and tool results to the request's message list.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Agent instructions.
    System,
    /// The query or stage context.
    User,
    /// Model output, possibly carrying tool calls.
    Assistant,
    /// Output of a domain tool.
    Tool,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the turn.
    pub role: Role,
    /// Text of the turn. Empty for assistant turns that only call tools.
    pub content: String,
    /// Tool calls requested in an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool turns, the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Agent instructions.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::text(Role::System, content)
    }

    /// A user turn.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::text(Role::User, content)
    }

    /// An assistant turn that only requests tools.
    #[must_use]
    pub const fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// The result of tool call `call_id`.
    #[must_use]
    pub fn tool_result(call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(call_id.to_string()),
            ..Self::text(Role::Tool, content)
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Conversation so far, system turn first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; providers may treat `0.0` as unset.
    pub temperature: Option<f32>,
    /// Completion token cap.
    pub max_tokens: Option<u32>,
    /// Ask for a JSON object response.
    pub json_mode: bool,
    /// Deliver the response incrementally.
    pub stream: bool,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// A request with a system turn followed by one user turn.
    #[must_use]
    pub fn new(model: &str, system: &str, user: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: None,
            max_tokens: None,
            json_mode: false,
            stream: false,
            tools: Vec::new(),
        }
    }

    /// Returns the request with streaming enabled.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// A complete (non-streamed) chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text; empty when the model only called tools.
    pub content: String,
    /// Token accounting.
    pub usage: TokenUsage,
    /// Tool calls the model wants executed.
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped (e.g., `"stop"`, `"toolcalls"`).
    pub finish_reason: Option<String>,
}
