//! Coordinator agent.
//!
//! Writes the final answer from the retrieval and analysis outputs. Runs in
//! two modes: a streamed markdown pass delivered to the user chunk by chunk,
//! and a structured JSON pass that feeds the result aggregator.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::traits::Agent;

/// Agent that produces the final answer.
pub struct CoordinatorAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
    structured: bool,
}

impl CoordinatorAgent {
    /// Display name reported in progress events.
    pub const NAME: &'static str = "Coordinator Agent";

    /// Creates a coordinator that writes plain markdown (streaming pass).
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            model: config.coordinator_model.clone(),
            max_tokens: config.coordinator_max_tokens,
            system_prompt: prompts.coordinator.clone(),
            structured: false,
        }
    }

    /// Creates a coordinator that returns a JSON object with `final_answer`
    /// and metadata arrays.
    #[must_use]
    pub fn structured(config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            model: config.coordinator_model.clone(),
            max_tokens: config.coordinator_max_tokens,
            system_prompt: prompts.coordinator_structured.clone(),
            structured: true,
        }
    }

    /// Whether this coordinator runs in structured mode.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        self.structured
    }
}

#[async_trait]
impl Agent for CoordinatorAgent {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        self.structured
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
