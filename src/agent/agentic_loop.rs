//! Bounded tool round trips for agents that call tools.
//!
//! Each iteration sends the conversation, runs the requested tools and
//! appends both the assistant turn and the results. A reply without tool
//! calls ends the loop.

use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{ChatMessage, ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Calls `provider` until it answers without tool calls.
///
/// The exchange is appended to `request.messages`.
///
/// # Errors
///
/// [`AgentError::ToolLoopExceeded`] after `max_iterations` rounds of tool
/// calls, or the provider's own error.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_iterations: usize,
) -> Result<ChatResponse, AgentError> {
    for iteration in 0..max_iterations {
        let response = provider.chat(request).await?;

        if response.tool_calls.is_empty() {
            debug!(iteration, "tool loop finished");
            return Ok(response);
        }

        debug!(iteration, calls = response.tool_calls.len(), "running tools");

        let mut results = Vec::with_capacity(response.tool_calls.len());
        for call in &response.tool_calls {
            let result = executor.execute(call).await;
            results.push(ChatMessage::tool_result(&result.tool_call_id, &result.content));
        }
        request
            .messages
            .push(ChatMessage::tool_calls(response.tool_calls));
        request.messages.extend(results);
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::Role;
    use crate::agent::testing::ScriptedProvider;
    use crate::agent::tool::ToolCall;
    use crate::search::StaticRetriever;
    use std::sync::Arc;

    const LIMIT: usize = 10;

    fn role_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "role_lookup".to_string(),
            arguments: r#"{"role":"manager"}"#.to_string(),
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("test", "You analyze policies.", "What can a manager approve?")
    }

    #[tokio::test]
    async fn test_one_tool_round() {
        let executor = ToolExecutor::new(Arc::new(StaticRetriever::default()), 3);
        let provider = ScriptedProvider::new()
            .with_tool_calls(vec![role_call("call_0")])
            .with_reply("## Manager\nApproves up to 5000.");

        let mut request = request();
        let response = agentic_loop(&provider, &mut request, &executor, LIMIT)
            .await
            .unwrap_or_else(|e| panic!("tool loop failed: {e}"));

        assert_eq!(response.content, "## Manager\nApproves up to 5000.");
        // system + user + assistant(tool_calls) + tool(result)
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[3].role, Role::Tool);
        assert!(request.messages[3].content.contains("5000"));
        assert_eq!(executor.invoked_tools(), vec!["role_lookup"]);
    }

    #[tokio::test]
    async fn test_two_tool_rounds() {
        let executor = ToolExecutor::new(Arc::new(StaticRetriever::default()), 3);
        let provider = ScriptedProvider::new()
            .with_tool_calls(vec![role_call("call_0")])
            .with_tool_calls(vec![role_call("call_1"), role_call("call_2")])
            .with_reply("done");

        let mut request = request();
        let response = agentic_loop(&provider, &mut request, &executor, LIMIT)
            .await
            .unwrap_or_else(|e| panic!("tool loop failed: {e}"));

        assert_eq!(response.content, "done");
        // 2 initial + (assistant + 1 tool) + (assistant + 2 tools)
        assert_eq!(request.messages.len(), 7);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let executor = ToolExecutor::new(Arc::new(StaticRetriever::default()), 3);
        let provider = ScriptedProvider::new()
            .with_tool_calls(vec![role_call("call_0")])
            .with_tool_calls(vec![role_call("call_1")])
            .with_tool_calls(vec![role_call("call_2")]);

        let mut request = request();
        let result = agentic_loop(&provider, &mut request, &executor, 2).await;
        assert!(
            matches!(result, Err(AgentError::ToolLoopExceeded { max_iterations: 2 })),
            "expected ToolLoopExceeded"
        );
    }

    #[tokio::test]
    async fn test_direct_reply() {
        let executor = ToolExecutor::new(Arc::new(StaticRetriever::default()), 3);
        let provider = ScriptedProvider::new().with_reply("plain answer");

        let mut request = request();
        let response = agentic_loop(&provider, &mut request, &executor, LIMIT)
            .await
            .unwrap_or_else(|e| panic!("tool loop failed: {e}"));

        assert_eq!(response.content, "plain answer");
        assert_eq!(request.messages.len(), 2);
        assert!(executor.invoked_tools().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let executor = ToolExecutor::new(Arc::new(StaticRetriever::default()), 3);
        let provider = ScriptedProvider::new().with_error("upstream 503");

        let mut request = request();
        let result = agentic_loop(&provider, &mut request, &executor, LIMIT).await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
    }
}
