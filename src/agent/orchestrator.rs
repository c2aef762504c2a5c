//! Orchestrator for the retrieval → analysis → coordination pipeline.
//!
//! Runs one query through knowledge-base search, the retrieval agent, the
//! tool-calling analysis agent and the coordinator. [`Orchestrator::query`]
//! returns a single [`StructuredResult`]; [`Orchestrator::stream`] reports
//! progress as [`StreamEvent`]s and forwards the coordinator's markdown
//! through a [`StreamClassifier`] as it arrives.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::analysis::AnalysisAgent;
use super::config::AgentConfig;
use super::coordinator::CoordinatorAgent;
use super::executor::ToolExecutor;
use super::prompt::{
    CoordinatorContext, PromptSet, build_analysis_prompt, build_coordinator_prompt,
    build_retrieval_prompt,
};
use super::provider::{ChunkStream, LlmProvider};
use super::retrieval::RetrievalAgent;
use super::traits::{Agent, execute_with_tools};
use crate::core::{
    ClassifierRules, ResultAggregator, StreamClassifier, StreamEvent, StructuredResult,
};
use crate::error::AgentError;
use crate::search::{Passage, Retriever, unique_sources};

/// Maximum accepted query length in bytes.
const MAX_QUERY_LEN: usize = 10_000;

/// Buffered events between the pipeline task and the consumer.
const EVENT_BUFFER: usize = 64;

/// Boxed stream of pipeline events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// A query submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question.
    pub query: String,
    /// Caller-supplied session identifier, used for log correlation.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl QueryRequest {
    /// Creates a request without a session identifier.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: None,
        }
    }
}

/// Outputs of the retrieval and analysis stages, shared by both modes.
#[derive(Debug, Default)]
struct Findings {
    sources: Vec<String>,
    retrieved: String,
    analysis: String,
    tools_invoked: Vec<String>,
}

impl Findings {
    fn coordinator_prompt(&self, query: &str) -> String {
        build_coordinator_prompt(&CoordinatorContext {
            query,
            retrieved: &self.retrieved,
            analysis: &self.analysis,
            tools_invoked: &self.tools_invoked,
            sources: &self.sources,
        })
    }
}

/// Runs queries through the agent pipeline.
///
/// Cheap to clone; the provider and retriever are shared.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    config: AgentConfig,
    prompts: Arc<PromptSet>,
    rules: ClassifierRules,
    aggregator: ResultAggregator,
}

impl Orchestrator {
    /// Creates an orchestrator over the given provider and retriever.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling back
    /// to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, retriever, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        let rules = config.classifier_rules();
        let aggregator = ResultAggregator::new(config.fallback_defaults());
        Self {
            provider,
            retriever,
            config,
            prompts: Arc::new(prompts),
            rules,
            aggregator,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Runs the full pipeline and returns the structured result.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for invalid queries and
    /// propagates retrieval and provider failures. Malformed model output
    /// is never an error; the aggregator falls back instead.
    pub async fn query(&self, request: &QueryRequest) -> Result<StructuredResult, AgentError> {
        validate_query(&request.query)?;
        let start = Instant::now();
        info!(session = ?request.session_id, "query started");

        let passages = self.retrieve(&request.query).await?;
        let findings = self.analyze(&request.query, &passages).await?;
        let raw = self.coordinate_structured(&request.query, &findings).await?;
        let result = self.aggregator.aggregate(&raw, &findings.sources);

        info!(
            session = ?request.session_id,
            sources = result.sources.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "query completed"
        );
        Ok(result)
    }

    /// Runs the pipeline in the background and returns its event stream.
    ///
    /// The stream always ends with a `done` or a single `error` event. When
    /// the consumer drops the stream, the pipeline stops at its next event.
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn stream(&self, request: QueryRequest) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = self.clone();
        tokio::spawn(async move {
            let sink = EventSink { tx };
            if let Err(e) = this.run_stream(&request, &sink).await {
                if sink.is_closed() {
                    debug!(session = ?request.session_id, "stream consumer went away");
                } else {
                    warn!(session = ?request.session_id, error = %e, "streamed query failed");
                    sink.send_terminal(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                }
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }

    async fn run_stream(&self, request: &QueryRequest, sink: &EventSink) -> Result<(), AgentError> {
        let query = request.query.as_str();
        validate_query(query)?;
        info!(session = ?request.session_id, "streamed query started");

        sink.send(StreamEvent::thinking("Coordinator Agent analyzing query..."))
            .await?;
        sink.send(StreamEvent::step_started(
            CoordinatorAgent::NAME,
            "Received query and initiating multi-agent workflow",
        ))
        .await?;

        sink.send(StreamEvent::thinking("Information Retrieval Agent searching..."))
            .await?;
        sink.send(StreamEvent::step_started(
            RetrievalAgent::NAME,
            "Searching knowledge base for relevant policy documents",
        ))
        .await?;

        let passages = self.retrieve(query).await?;
        let sources = unique_sources(&passages);
        for source in &sources {
            sink.send(StreamEvent::Source {
                source: source.clone(),
            })
            .await?;
        }
        let found = if passages.is_empty() {
            StreamEvent::step_completed(
                RetrievalAgent::NAME,
                "No relevant policy documents found",
                "Proceeding with general knowledge",
            )
        } else {
            StreamEvent::step_completed(
                RetrievalAgent::NAME,
                "Retrieved relevant policy sections",
                format!("Found {} policy sections", passages.len()),
            )
        };
        sink.send(found).await?;
        let retrieved = self.condense(query, &passages).await?;

        sink.send(StreamEvent::thinking("Analysis Agent processing content..."))
            .await?;
        sink.send(StreamEvent::step_started(
            AnalysisAgent::NAME,
            "Analyzing retrieved content and applying tools",
        ))
        .await?;
        sink.send(StreamEvent::thinking("Analysis Agent generating insights..."))
            .await?;
        let (analysis, tools_invoked) = self.run_analysis(query, &retrieved).await?;
        let findings = Findings {
            sources,
            retrieved,
            analysis,
            tools_invoked,
        };

        let full_response = self.stream_answer(query, &findings, sink).await?;
        sink.send(StreamEvent::step_completed(
            AnalysisAgent::NAME,
            "Completed analysis and generated insights",
            "Analysis complete with tool usage and findings",
        ))
        .await?;

        sink.send(StreamEvent::thinking("Coordinator aggregating results..."))
            .await?;
        sink.send(StreamEvent::step_started(
            CoordinatorAgent::NAME,
            "Aggregating results from all agents",
        ))
        .await?;
        let raw = self.coordinate_structured(query, &findings).await?;
        let result = self.aggregator.aggregate(&raw, &findings.sources);
        sink.send(StreamEvent::step_completed(
            CoordinatorAgent::NAME,
            "Generated final comprehensive response",
            "Multi-agent workflow completed successfully",
        ))
        .await?;

        sink.send(StreamEvent::metadata(&result)).await?;
        sink.send(StreamEvent::Done { full_response }).await?;
        info!(session = ?request.session_id, "streamed query completed");
        Ok(())
    }

    /// Streams the coordinator's markdown through the classifier.
    ///
    /// Returns the concatenation of every emitted chunk. The per-call timeout
    /// applies to opening the stream and to each chunk after it.
    async fn stream_answer(
        &self,
        query: &str,
        findings: &Findings,
        sink: &EventSink,
    ) -> Result<String, AgentError> {
        let agent = CoordinatorAgent::new(&self.config, &self.prompts);
        let user_msg = findings.coordinator_prompt(query);
        let mut chunks = self
            .bounded(agent.execute_stream(&*self.provider, &user_msg))
            .await?;

        let mut classifier = StreamClassifier::with_rules(self.rules.clone());
        let mut response_text = String::new();
        while let Some(chunk) = self.next_chunk(&mut chunks).await? {
            if chunk.is_empty() {
                continue;
            }
            if classifier.classify(&chunk).is_emit() {
                response_text.push_str(&chunk);
                sink.send(StreamEvent::Content { chunk }).await?;
            }
        }
        debug!(
            chars = response_text.len(),
            markdown_started = classifier.markdown_started(),
            "coordinator stream finished"
        );
        Ok(response_text)
    }

    async fn next_chunk(&self, chunks: &mut ChunkStream) -> Result<Option<String>, AgentError> {
        self.bounded(async { chunks.next().await.transpose() }).await
    }

    /// Searches the knowledge base off the async executor.
    async fn retrieve(&self, query: &str) -> Result<Vec<Passage>, AgentError> {
        let retriever = Arc::clone(&self.retriever);
        let q = query.to_string();
        let top_k = self.config.search_top_k;
        let passages = tokio::task::spawn_blocking(move || retriever.search(&q, top_k))
            .await
            .map_err(|e| AgentError::Orchestration {
                message: format!("Retrieval task failed: {e}"),
            })??;
        info!(passages = passages.len(), "knowledge base searched");
        Ok(passages)
    }

    /// Runs the retrieval and analysis agents.
    async fn analyze(&self, query: &str, passages: &[Passage]) -> Result<Findings, AgentError> {
        let retrieved = self.condense(query, passages).await?;
        let (analysis, tools_invoked) = self.run_analysis(query, &retrieved).await?;
        Ok(Findings {
            sources: unique_sources(passages),
            retrieved,
            analysis,
            tools_invoked,
        })
    }

    /// Runs the retrieval agent over the search hits.
    async fn condense(&self, query: &str, passages: &[Passage]) -> Result<String, AgentError> {
        let agent = RetrievalAgent::new(&self.config, &self.prompts);
        let user_msg = build_retrieval_prompt(query, passages);
        let response = self
            .bounded(agent.execute(&*self.provider, &user_msg))
            .await?;
        debug!(tokens = response.usage.total_tokens, "retrieval agent finished");
        Ok(response.content)
    }

    /// Runs the analysis agent with tools. Returns its text and the tools that ran.
    async fn run_analysis(
        &self,
        query: &str,
        retrieved: &str,
    ) -> Result<(String, Vec<String>), AgentError> {
        let agent = AnalysisAgent::new(&self.config, &self.prompts);
        let executor = ToolExecutor::new(Arc::clone(&self.retriever), self.config.search_top_k);
        let user_msg = build_analysis_prompt(query, retrieved);
        let response = self
            .bounded(execute_with_tools(
                &agent,
                &*self.provider,
                &user_msg,
                &executor,
            ))
            .await?;
        let tools = executor.invoked_tools();
        info!(tools = ?tools, "analysis agent finished");
        Ok((response.content, tools))
    }

    /// Runs the structured coordinator and returns its raw text.
    async fn coordinate_structured(
        &self,
        query: &str,
        findings: &Findings,
    ) -> Result<String, AgentError> {
        let agent = CoordinatorAgent::structured(&self.config, &self.prompts);
        let user_msg = findings.coordinator_prompt(query);
        let response = self
            .bounded(agent.execute(&*self.provider, &user_msg))
            .await?;
        Ok(response.content)
    }

    /// Applies the configured per-call timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, AgentError>> + Send,
    {
        tokio::time::timeout(self.config.timeout, fut)
            .await
            .map_err(|_| AgentError::ApiRequest {
                message: format!("model call timed out after {:?}", self.config.timeout),
                status: None,
            })?
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Sending half of an event stream.
struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    async fn send(&self, event: StreamEvent) -> Result<(), AgentError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AgentError::Orchestration {
                message: "event stream closed by consumer".to_string(),
            })
    }

    async fn send_terminal(&self, event: StreamEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("terminal event dropped, consumer gone");
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn validate_query(query: &str) -> Result<(), AgentError> {
    if query.trim().is_empty() {
        return Err(AgentError::Orchestration {
            message: "Query cannot be empty".to_string(),
        });
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(AgentError::Orchestration {
            message: format!(
                "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            ),
        });
    }
    Ok(())
}
