//! The [`Agent`] trait shared by the pipeline stages.
//!
//! An agent is a system prompt plus sampling settings. The orchestrator
//! drives retrieval, analysis and coordination through this one interface.

use async_trait::async_trait;

use super::executor::ToolExecutor;
use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::provider::{ChunkStream, LlmProvider};
use super::tool::ToolDefinition;
use crate::error::AgentError;

/// Text produced by one agent run.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// Final text of the run.
    pub content: String,
    /// Tokens spent, as reported by the provider.
    pub usage: TokenUsage,
    /// Provider stop reason, if any.
    pub finish_reason: Option<String>,
}

impl From<ChatResponse> for AgentResponse {
    fn from(response: ChatResponse) -> Self {
        Self {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        }
    }
}

/// One stage of the policy pipeline.
///
/// Only [`Agent::name`], [`Agent::model`] and [`Agent::system_prompt`] are
/// required. Stages that call tools return them from [`Agent::tools`] and
/// are run with [`execute_with_tools`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name reported in `agent_step` events.
    fn name(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Instructions for this stage.
    fn system_prompt(&self) -> &str;

    /// Request a JSON object response.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Completion token cap.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tools offered to the model.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Upper bound on tool round trips.
    fn max_tool_iterations(&self) -> usize {
        8
    }

    /// The request for `user_msg` under this agent's settings, without tools.
    fn request(&self, user_msg: &str) -> ChatRequest {
        ChatRequest {
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            ..ChatRequest::new(self.model(), self.system_prompt(), user_msg)
        }
    }

    /// Runs one completion.
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`AgentError`].
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        provider
            .chat(&self.request(user_msg))
            .await
            .map(AgentResponse::from)
    }

    /// Opens a streamed completion.
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`AgentError`] when the stream cannot open.
    async fn execute_stream(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<ChunkStream, AgentError> {
        provider
            .chat_stream(&self.request(user_msg).streaming())
            .await
    }
}

/// Runs `agent` through the tool loop when it offers tools, or as a single
/// completion when it does not.
///
/// # Errors
///
/// Provider failures, and [`AgentError`] when the loop runs out of
/// iterations.
pub async fn execute_with_tools(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
    executor: &ToolExecutor,
) -> Result<AgentResponse, AgentError> {
    let tools = agent.tools();
    if tools.is_empty() {
        return agent.execute(provider, user_msg).await;
    }

    let mut request = ChatRequest {
        tools,
        ..agent.request(user_msg)
    };
    super::agentic_loop::agentic_loop(
        provider,
        &mut request,
        executor,
        agent.max_tool_iterations(),
    )
    .await
    .map(AgentResponse::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl Agent for Plain {
        fn name(&self) -> &'static str {
            "Plain"
        }

        fn model(&self) -> &str {
            "gpt-4o-mini"
        }

        fn system_prompt(&self) -> &str {
            "Answer briefly."
        }
    }

    #[test]
    fn test_request_uses_agent_settings() {
        let request = Plain.request("Who signs off on travel?");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, "Answer briefly.");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(2048));
        assert!(!request.json_mode);
        assert!(request.tools.is_empty());
    }

    #[test]
    fn test_response_conversion() {
        let response = AgentResponse::from(ChatResponse {
            content: "Two approvals.".to_string(),
            usage: TokenUsage::default(),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        });
        assert_eq!(response.content, "Two approvals.");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }
}
