//! The structured answer returned for every query.

use serde::{Deserialize, Serialize};

/// Source name used when nothing was discovered by retrieval.
pub const FALLBACK_SOURCE: &str = "Organization Policies & Processes Manual";

/// Reasoning steps reported when the final text carried none.
pub const DEFAULT_REASONING_STEPS: &[&str] = &[
    "Received query and initiated multi-agent workflow",
    "Information Retrieval Agent searched knowledge base",
    "Analysis Agent analyzed retrieved content",
    "Coordinator aggregated results",
    "Generated comprehensive response",
];

/// Reasoning steps reported when the final text looked like JSON but did not parse.
pub const RECOVERY_REASONING_STEPS: &[&str] = &[
    "Delegated query to Information Retrieval Agent",
    "Retrieved relevant policy documents",
    "Passed content to Analysis Agent",
    "Analysis Agent processed content and used tools",
    "Aggregated results into final response",
];

/// Tool identifiers reported when the final text named none.
pub const DEFAULT_TOOLS_USED: &[&str] = &["information_retrieval", "analysis", "knowledge_search"];

/// Normalized answer payload.
///
/// All four fields are always populated; see
/// [`ResultAggregator`](super::aggregator::ResultAggregator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResult {
    /// Markdown answer.
    pub answer: String,
    /// Deduplicated source names.
    pub sources: Vec<String>,
    /// Tool identifiers involved in producing the answer.
    pub tools_used: Vec<String>,
    /// Ordered pipeline steps.
    pub reasoning_steps: Vec<String>,
}

/// Fallback values substituted for missing or malformed fields.
///
/// Defaults come from the constants in this module; deployments override
/// them through configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDefaults {
    /// Source used when retrieval discovered nothing.
    pub source: String,
    /// Steps used when the text carried no reasoning steps.
    pub reasoning_steps: Vec<String>,
    /// Steps used when JSON-looking text failed to parse.
    pub recovery_steps: Vec<String>,
    /// Tools used when the text named none.
    pub tools_used: Vec<String>,
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        Self {
            source: FALLBACK_SOURCE.to_string(),
            reasoning_steps: to_owned_vec(DEFAULT_REASONING_STEPS),
            recovery_steps: to_owned_vec(RECOVERY_REASONING_STEPS),
            tools_used: to_owned_vec(DEFAULT_TOOLS_USED),
        }
    }
}

impl FallbackDefaults {
    /// Overrides the fallback source name. Blank names are ignored.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !source.trim().is_empty() {
            self.source = source;
        }
        self
    }
}

fn to_owned_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
