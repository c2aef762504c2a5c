//! Information retrieval agent.
//!
//! Receives the knowledge-base hits for a query and condenses them into a
//! JSON list of relevant passages for the analysis stage.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::traits::Agent;

/// Agent that selects and condenses retrieved policy passages.
pub struct RetrievalAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl RetrievalAgent {
    /// Display name reported in progress events.
    pub const NAME: &'static str = "Information Retrieval Agent";

    /// Creates a retrieval agent from configuration and the loaded prompts.
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            model: config.retrieval_model.clone(),
            max_tokens: config.retrieval_max_tokens,
            system_prompt: prompts.retrieval.clone(),
        }
    }
}

#[async_trait]
impl Agent for RetrievalAgent {
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
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
