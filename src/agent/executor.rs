//! Tool executor that dispatches tool calls to the domain tools.
//!
//! Maps tool names to direct Rust function calls: keyword counting, role
//! lookup, arithmetic and knowledge-base search. Every call is recorded so
//! the pipeline can report which tools actually ran. Searches run on the
//! blocking pool, like the orchestrator's own retrieval.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::tool::{ToolCall, ToolResult, names};
use crate::error::AgentError;
use crate::search::{MAX_TOP_K, Passage, Retriever};
use crate::tools::{Calculation, DEFAULT_KEYWORD, count_keyword, role_lookup};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Executes tool calls for one pipeline run.
pub struct ToolExecutor {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    invoked: Mutex<Vec<String>>,
}

/// Passage as returned to the model by `search_knowledge_base`.
#[derive(Debug, Serialize)]
struct PassageView<'a> {
    source: &'a str,
    content: &'a str,
    score: f64,
}

impl<'a> From<&'a Passage> for PassageView<'a> {
    fn from(p: &'a Passage) -> Self {
        Self {
            source: p.source_name(),
            content: &p.text,
            score: p.score,
        }
    }
}

fn invalid_args(name: &str, e: &serde_json::Error) -> AgentError {
    AgentError::ToolExecution {
        name: name.to_string(),
        message: format!("invalid arguments: {e}"),
    }
}

fn to_json<T: Serialize>(name: &str, value: &T) -> Result<String, AgentError> {
    serde_json::to_string(value).map_err(|e| AgentError::ToolExecution {
        name: name.to_string(),
        message: format!("serialization error: {e}"),
    })
}

impl ToolExecutor {
    /// Creates an executor searching `retriever` with `top_k` passages by default.
    #[must_use]
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self {
            retriever,
            top_k,
            invoked: Mutex::new(Vec::new()),
        }
    }

    /// Names of tools invoked so far, deduplicated, in first-call order.
    #[must_use]
    pub fn invoked_tools(&self) -> Vec<String> {
        self.invoked
            .lock()
            .map(|names| names.clone())
            .unwrap_or_default()
    }

    fn record(&self, name: &str) {
        if let Ok(mut names) = self.invoked.lock()
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }

    /// Dispatches a tool call to the matching tool.
    ///
    /// Failures are returned as error results for the model to read; they
    /// never abort the run.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult {
                tool_call_id: call.id.clone(),
                content: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
                is_error: true,
            };
        }

        let result = match call.name.as_str() {
            names::STEP_COUNTER => Self::tool_step_counter(&call.arguments),
            names::ROLE_LOOKUP => Self::tool_role_lookup(&call.arguments),
            names::CALCULATOR => Self::tool_calculator(&call.arguments),
            names::SEARCH_KNOWLEDGE_BASE => self.tool_search_knowledge_base(&call.arguments).await,
            other => Err(AgentError::ToolExecution {
                name: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        };

        if result.is_ok() {
            self.record(&call.name);
        }
        info!(tool = call.name, ok = result.is_ok(), "tool invoked");

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => ToolResult {
                tool_call_id: call.id.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }

    fn tool_step_counter(args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            text: String,
            keyword: Option<String>,
        }
        let args: Args =
            serde_json::from_str(args).map_err(|e| invalid_args(names::STEP_COUNTER, &e))?;
        let keyword = args.keyword.as_deref().unwrap_or(DEFAULT_KEYWORD);
        to_json(names::STEP_COUNTER, &count_keyword(&args.text, keyword))
    }

    fn tool_role_lookup(args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            role: String,
        }
        let args: Args =
            serde_json::from_str(args).map_err(|e| invalid_args(names::ROLE_LOOKUP, &e))?;
        to_json(names::ROLE_LOOKUP, &role_lookup(&args.role))
    }

    fn tool_calculator(args: &str) -> Result<String, AgentError> {
        let calc: Calculation =
            serde_json::from_str(args).map_err(|e| invalid_args(names::CALCULATOR, &e))?;
        to_json(names::CALCULATOR, &calc.evaluate())
    }

    async fn tool_search_knowledge_base(&self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            top_k: Option<usize>,
        }
        let args: Args = serde_json::from_str(args)
            .map_err(|e| invalid_args(names::SEARCH_KNOWLEDGE_BASE, &e))?;
        let top_k = args.top_k.unwrap_or(self.top_k).clamp(1, MAX_TOP_K);
        let retriever = Arc::clone(&self.retriever);
        let search_failed = |message: String| AgentError::ToolExecution {
            name: names::SEARCH_KNOWLEDGE_BASE.to_string(),
            message,
        };
        let passages = tokio::task::spawn_blocking(move || retriever.search(&args.query, top_k))
            .await
            .map_err(|e| search_failed(format!("search task failed: {e}")))?
            .map_err(|e| search_failed(e.to_string()))?;
        let views: Vec<PassageView<'_>> = passages.iter().map(PassageView::from).collect();
        to_json(names::SEARCH_KNOWLEDGE_BASE, &views)
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("top_k", &self.top_k)
            .field("invoked", &self.invoked_tools())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::StaticRetriever;
    use serde_json::{Map, Value};
    use std::time::{Duration, Instant};

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(retriever()), 3)
    }

    fn retriever() -> StaticRetriever {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::from("Leave Policy"));
        StaticRetriever::new(vec![Passage {
            text: "Leave requests need manager approval.".to_string(),
            metadata,
            score: 0.0,
        }])
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{name}"),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn parse(result: &ToolResult) -> Value {
        serde_json::from_str(&result.content).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_step_counter_default_keyword() {
        let exec = executor();
        let result = exec
            .execute(&call("step_counter", r#"{"text":"a\nApproval here"}"#))
            .await;
        assert!(!result.is_error);
        let v = parse(&result);
        assert_eq!(v["keyword"], "approval");
        assert_eq!(v["count"], 1);
        assert_eq!(v["matching_lines"][0], "Line 2: approval here");
    }

    #[tokio::test]
    async fn test_role_lookup_not_found_is_success() {
        let exec = executor();
        let result = exec
            .execute(&call("role_lookup", r#"{"role":"intern"}"#))
            .await;
        assert!(!result.is_error);
        assert_eq!(parse(&result)["found"], false);
    }

    #[tokio::test]
    async fn test_calculator_error_is_structured() {
        let exec = executor();
        let result = exec
            .execute(&call("calculator", r#"{"operation":"divide","a":1,"b":0}"#))
            .await;
        assert!(!result.is_error);
        assert_eq!(parse(&result)["error"], "Division by zero is undefined");
    }

    #[tokio::test]
    async fn test_search_knowledge_base() {
        let exec = executor();
        let result = exec
            .execute(&call("search_knowledge_base", r#"{"query":"leave"}"#))
            .await;
        assert!(!result.is_error);
        assert_eq!(parse(&result)[0]["source"], "Leave Policy");
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_tool() {
        let exec = executor();
        let bad = exec.execute(&call("role_lookup", "{}")).await;
        assert!(bad.is_error);
        assert!(bad.content.contains("invalid arguments"));
        let unknown = exec.execute(&call("delete_everything", "{}")).await;
        assert!(unknown.is_error);
        assert!(unknown.content.contains("unknown tool"));
        assert!(exec.invoked_tools().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_arguments_rejected() {
        let exec = executor();
        let big = format!(r#"{{"text":"{}"}}"#, "x".repeat(MAX_TOOL_ARGS_LEN));
        let result = exec.execute(&call("step_counter", &big)).await;
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }

    #[tokio::test]
    async fn test_invoked_tools_deduplicated_in_order() {
        let exec = executor();
        let _ = exec.execute(&call("role_lookup", r#"{"role":"hr"}"#)).await;
        let _ = exec.execute(&call("step_counter", r#"{"text":"x"}"#)).await;
        let _ = exec.execute(&call("role_lookup", r#"{"role":"ceo"}"#)).await;
        assert_eq!(exec.invoked_tools(), vec!["role_lookup", "step_counter"]);
    }

    struct SlowRetriever {
        finished: Mutex<Option<Instant>>,
    }

    impl Retriever for SlowRetriever {
        fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, AgentError> {
            std::thread::sleep(Duration::from_millis(200));
            if let Ok(mut finished) = self.finished.lock() {
                *finished = Some(Instant::now());
            }
            Ok(Vec::new())
        }
    }

    struct BrokenRetriever;

    impl Retriever for BrokenRetriever {
        fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, AgentError> {
            Err(AgentError::Retrieval {
                message: "database is locked".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_search_does_not_block_the_runtime() {
        let slow = Arc::new(SlowRetriever {
            finished: Mutex::new(None),
        });
        let exec = ToolExecutor::new(slow.clone(), 3);
        let search = call("search_knowledge_base", r#"{"query":"leave"}"#);

        let (result, ticked) = tokio::join!(exec.execute(&search), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Instant::now()
        });

        assert!(!result.is_error);
        let finished = slow
            .finished
            .lock()
            .ok()
            .and_then(|f| *f)
            .unwrap_or_else(|| unreachable!());
        assert!(ticked < finished, "timer waited for the search to finish");
    }

    #[tokio::test]
    async fn test_search_failure_is_error_result() {
        let exec = ToolExecutor::new(Arc::new(BrokenRetriever), 3);
        let result = exec
            .execute(&call("search_knowledge_base", r#"{"query":"leave"}"#))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("database is locked"));
        assert!(exec.invoked_tools().is_empty());
    }
}
