//! `OpenAI` provider backed by the `async-openai` crate.
//!
//! Works against any `OpenAI`-compatible endpoint through the base URL
//! override in [`AgentConfig`]. Streaming yields the text delta of each
//! completion chunk; chunks without text come through as empty strings.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent, ChatCompletionTool,
    ChatCompletionToolType, CompletionUsage, CreateChatCompletionRequest,
    CreateChatCompletionStreamResponse, FunctionCall, FunctionObject, ResponseFormat,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::{ChunkStream, LlmProvider};
use crate::agent::tool::{ToolCall, ToolDefinition};
use crate::error::AgentError;

/// `OpenAI`-compatible chat completion provider.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a provider from the API key and base URL in `config`.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let openai_config = config.base_url.as_deref().map_or_else(
            || OpenAIConfig::new().with_api_key(&config.api_key),
            |base| {
                OpenAIConfig::new()
                    .with_api_key(&config.api_key)
                    .with_api_base(base)
            },
        );
        Self {
            client: Client::with_config(openai_config),
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self
            .client
            .chat()
            .create(to_openai_request(request))
            .await
            .map_err(api_error)?;

        let usage = to_token_usage(response.usage.as_ref());
        let Some(choice) = response.choices.into_iter().next() else {
            debug!(model = %request.model, "completion returned no choices");
            return Ok(ChatResponse {
                content: String::new(),
                usage,
                tool_calls: Vec::new(),
                finish_reason: None,
            });
        };

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .iter()
                .map(from_openai_tool_call)
                .collect(),
            finish_reason: choice
                .finish_reason
                .map(|reason| format!("{reason:?}").to_lowercase()),
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, AgentError> {
        let mut openai_request = to_openai_request(request);
        openai_request.stream = Some(true);

        let stream = self
            .client
            .chat()
            .create_stream(openai_request)
            .await
            .map_err(api_error)?;

        Ok(Box::pin(stream.map(|item| {
            item.map(|chunk| delta_text(&chunk))
                .map_err(|e| AgentError::Stream {
                    message: e.to_string(),
                })
        })))
    }
}

/// Translates a request. A zero temperature is left to the server default,
/// since some models reject any explicit value.
fn to_openai_request(request: &ChatRequest) -> CreateChatCompletionRequest {
    CreateChatCompletionRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(to_openai_message).collect(),
        temperature: request.temperature.filter(|&t| t != 0.0),
        max_completion_tokens: request.max_tokens,
        stream: request.stream.then_some(true),
        response_format: request.json_mode.then_some(ResponseFormat::JsonObject),
        tools: (!request.tools.is_empty())
            .then(|| request.tools.iter().map(to_openai_tool).collect()),
        ..Default::default()
    }
}

fn to_openai_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
    let text = msg.content.clone();
    match msg.role {
        Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(text),
            name: None,
        }),
        Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(text),
            name: None,
        }),
        Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
            content: ChatCompletionRequestToolMessageContent::Text(text),
            tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
        }),
        Role::Assistant => {
            let tool_calls: Vec<ChatCompletionMessageToolCall> = msg
                .tool_calls
                .iter()
                .map(|call| ChatCompletionMessageToolCall {
                    id: call.id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect();

            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: (!text.is_empty())
                    .then_some(ChatCompletionRequestAssistantMessageContent::Text(text)),
                name: None,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                refusal: None,
                audio: None,
                function_call: None,
            })
        }
    }
}

fn to_openai_tool(def: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: def.name.clone(),
            description: Some(def.description.clone()),
            parameters: Some(def.parameters.clone()),
            strict: None,
        },
    }
}

fn from_openai_tool_call(call: &ChatCompletionMessageToolCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments: call.function.arguments.clone(),
    }
}

fn to_token_usage(usage: Option<&CompletionUsage>) -> TokenUsage {
    usage.map_or_else(TokenUsage::default, |u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    })
}

/// Maps a client error, keeping the HTTP status when the transport saw one.
fn api_error(e: OpenAIError) -> AgentError {
    let status = match &e {
        OpenAIError::Reqwest(inner) => inner.status().map(|s| s.as_u16()),
        _ => None,
    };
    AgentError::ApiRequest {
        message: e.to_string(),
        status,
    }
}

/// Text delta of the first choice in a stream chunk.
fn delta_text(chunk: &CreateChatCompletionStreamResponse) -> String {
    chunk
        .choices
        .first()
        .and_then(|c| c.delta.content.clone())
        .unwrap_or_default()
}
