//! Analysis agent.
//!
//! Turns retrieved content into a markdown analysis, calling the domain
//! tools through the agentic loop when the answer depends on counts, role
//! permissions or arithmetic.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::tool::{ToolDefinition, ToolSet};
use super::traits::Agent;

/// Tool-calling agent that analyzes retrieved policy content.
pub struct AnalysisAgent {
    model: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
}

impl AnalysisAgent {
    /// Display name reported in progress events.
    pub const NAME: &'static str = "Analysis Agent";

    /// Creates an analysis agent from configuration and the loaded prompts.
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            model: config.analysis_model.clone(),
            max_tokens: config.analysis_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt: prompts.analysis.clone(),
        }
    }
}

#[async_trait]
impl Agent for AnalysisAgent {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        ToolSet::analysis_tools().definitions().to_vec()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::executor::ToolExecutor;
    use crate::agent::testing::ScriptedProvider;
    use crate::agent::tool::ToolCall;
    use crate::agent::traits::execute_with_tools;
    use crate::search::StaticRetriever;
    use std::sync::Arc;

    fn agent() -> AnalysisAgent {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        AnalysisAgent::new(&config, &PromptSet::defaults())
    }

    #[test]
    fn test_exposes_analysis_tools() {
        let names: Vec<String> = agent().tools().into_iter().map(|t| t.name).collect();
        assert!(names.iter().any(|n| n == "step_counter"));
        assert!(names.iter().any(|n| n == "role_lookup"));
        assert!(names.iter().any(|n| n == "calculator"));
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let executor = ToolExecutor::new(Arc::new(StaticRetriever::default()), 3);
        let provider = ScriptedProvider::new()
            .with_tool_calls(vec![ToolCall {
                id: "call_0".to_string(),
                name: "step_counter".to_string(),
                arguments: r#"{"text":"Manager approval\nDirector approval"}"#.to_string(),
            }])
            .with_reply("## Approval Steps\nTwo approvals are required.");

        let response = execute_with_tools(&agent(), &provider, "how many approvals?", &executor)
            .await
            .unwrap_or_else(|e| panic!("execute_with_tools failed: {e}"));

        assert!(response.content.starts_with("## Approval Steps"));
        assert_eq!(executor.invoked_tools(), vec!["step_counter"]);
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].tools.is_empty());
    }
}
