//! Settings for the agent pipeline.
//!
//! Each field resolves to an explicit builder value first, then its
//! environment variable, then the built-in default.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::ClassifierRules;
use crate::core::result::{FALLBACK_SOURCE, FallbackDefaults};
use crate::error::AgentError;
use crate::search::DEFAULT_TOP_K;

/// Default model for every agent stage.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default retrieval agent max tokens.
const DEFAULT_RETRIEVAL_MAX_TOKENS: u32 = 2048;
/// Default analysis agent max tokens.
const DEFAULT_ANALYSIS_MAX_TOKENS: u32 = 2048;
/// Default coordinator max tokens.
const DEFAULT_COORDINATOR_MAX_TOKENS: u32 = 4096;
/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Tool round trips allowed to the analysis agent.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 8;

/// Configuration for the agent pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Provider key understood by `create_provider`.
    pub provider: String,
    /// Provider API key.
    pub api_key: String,
    /// Endpoint of an `OpenAI`-compatible server, if not `OpenAI` itself.
    pub base_url: Option<String>,
    /// Model for the retrieval agent.
    pub retrieval_model: String,
    /// Model for the analysis agent.
    pub analysis_model: String,
    /// Model for the coordinator agent.
    pub coordinator_model: String,
    /// Maximum tokens for retrieval responses.
    pub retrieval_max_tokens: u32,
    /// Maximum tokens for analysis responses.
    pub analysis_max_tokens: u32,
    /// Maximum tokens for coordinator responses.
    pub coordinator_max_tokens: u32,
    /// Upper bound on a single generation call, streamed or not.
    pub timeout: Duration,
    /// Tool round trips allowed before the analysis stage fails.
    pub max_tool_iterations: usize,
    /// Passages retrieved per search.
    pub search_top_k: usize,
    /// Where prompt overrides are read from.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
    /// Source name reported when retrieval discovers nothing.
    pub fallback_source: String,
    /// Marker substrings added to the stream classifier's denylist.
    pub extra_markers: Vec<String>,
}

impl AgentConfig {
    /// An empty builder.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Environment values over defaults.
    ///
    /// # Errors
    ///
    /// [`AgentError::ApiKeyMissing`] when neither key variable is set.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Fallback values for the result aggregator.
    #[must_use]
    pub fn fallback_defaults(&self) -> FallbackDefaults {
        FallbackDefaults::default().with_source(self.fallback_source.clone())
    }

    /// Classifier rules with any configured extra markers.
    #[must_use]
    pub fn classifier_rules(&self) -> ClassifierRules {
        self.extra_markers
            .iter()
            .fold(ClassifierRules::default(), |rules, marker| {
                rules.with_marker(marker.as_str())
            })
    }
}

/// Collects overrides for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    retrieval_model: Option<String>,
    analysis_model: Option<String>,
    coordinator_model: Option<String>,
    retrieval_max_tokens: Option<u32>,
    analysis_max_tokens: Option<u32>,
    coordinator_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_tool_iterations: Option<usize>,
    search_top_k: Option<usize>,
    prompt_dir: Option<PathBuf>,
    fallback_source: Option<String>,
    extra_markers: Vec<String>,
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Fills every field still unset from its environment variable.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env_var(&["POLICY_PROVIDER"]);
        }
        if self.api_key.is_none() {
            self.api_key = env_var(&["LLM_MODEL_API_KEY", "OPENAI_API_KEY", "POLICY_API_KEY"]);
        }
        if self.base_url.is_none() {
            self.base_url = env_var(&["LLM_MODEL_BASE_URL", "OPENAI_BASE_URL"]);
        }
        if self.retrieval_model.is_none() {
            self.retrieval_model = env_var(&["POLICY_RETRIEVAL_MODEL"]);
        }
        if self.analysis_model.is_none() {
            self.analysis_model = env_var(&["POLICY_ANALYSIS_MODEL"]);
        }
        if self.coordinator_model.is_none() {
            self.coordinator_model = env_var(&["POLICY_COORDINATOR_MODEL"]);
        }
        if self.search_top_k.is_none() {
            self.search_top_k = env_var(&["POLICY_SEARCH_TOP_K"]).and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_var(&["POLICY_PROMPT_DIR"]).map(PathBuf::from);
        }
        if self.fallback_source.is_none() {
            self.fallback_source = env_var(&["POLICY_FALLBACK_SOURCE"]);
        }
        self
    }

    /// Provider key.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Compatible endpoint.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the retrieval agent model.
    #[must_use]
    pub fn retrieval_model(mut self, model: impl Into<String>) -> Self {
        self.retrieval_model = Some(model.into());
        self
    }

    /// Sets the analysis agent model.
    #[must_use]
    pub fn analysis_model(mut self, model: impl Into<String>) -> Self {
        self.analysis_model = Some(model.into());
        self
    }

    /// Sets the coordinator model.
    #[must_use]
    pub fn coordinator_model(mut self, model: impl Into<String>) -> Self {
        self.coordinator_model = Some(model.into());
        self
    }

    /// Sets every stage to the same model.
    #[must_use]
    pub fn model(self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.retrieval_model(model.clone())
            .analysis_model(model.clone())
            .coordinator_model(model)
    }

    /// Sets the retrieval agent max tokens.
    #[must_use]
    pub const fn retrieval_max_tokens(mut self, n: u32) -> Self {
        self.retrieval_max_tokens = Some(n);
        self
    }

    /// Sets the analysis agent max tokens.
    #[must_use]
    pub const fn analysis_max_tokens(mut self, n: u32) -> Self {
        self.analysis_max_tokens = Some(n);
        self
    }

    /// Sets the coordinator max tokens.
    #[must_use]
    pub const fn coordinator_max_tokens(mut self, n: u32) -> Self {
        self.coordinator_max_tokens = Some(n);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Tool round-trip limit.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the number of passages retrieved per search.
    #[must_use]
    pub const fn search_top_k(mut self, n: usize) -> Self {
        self.search_top_k = Some(n);
        self
    }

    /// Prompt override directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the fallback source name.
    #[must_use]
    pub fn fallback_source(mut self, source: impl Into<String>) -> Self {
        self.fallback_source = Some(source.into());
        self
    }

    /// Adds a marker substring to the stream classifier's denylist.
    #[must_use]
    pub fn extra_marker(mut self, marker: impl Into<String>) -> Self {
        self.extra_markers.push(marker.into());
        self
    }

    /// Resolves remaining defaults.
    ///
    /// # Errors
    ///
    /// [`AgentError::ApiKeyMissing`] without an API key.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let model = |m: Option<String>| m.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            retrieval_model: model(self.retrieval_model),
            analysis_model: model(self.analysis_model),
            coordinator_model: model(self.coordinator_model),
            retrieval_max_tokens: self
                .retrieval_max_tokens
                .unwrap_or(DEFAULT_RETRIEVAL_MAX_TOKENS),
            analysis_max_tokens: self
                .analysis_max_tokens
                .unwrap_or(DEFAULT_ANALYSIS_MAX_TOKENS),
            coordinator_max_tokens: self
                .coordinator_max_tokens
                .unwrap_or(DEFAULT_COORDINATOR_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            search_top_k: self.search_top_k.unwrap_or(DEFAULT_TOP_K).max(1),
            prompt_dir: self.prompt_dir,
            fallback_source: self
                .fallback_source
                .unwrap_or_else(|| FALLBACK_SOURCE.to_string()),
            extra_markers: self.extra_markers,
        })
    }
}
