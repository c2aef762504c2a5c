//! Result aggregation with fallback.
//!
//! Normalizes the coordinator's complete (non-streamed) output into a
//! [`StructuredResult`]. Upstream text may be a JSON object carrying
//! `final_answer` and metadata arrays, a JSON-looking fragment that does
//! not parse, or plain markdown. Every case yields a fully populated result;
//! decode failures are an expected branch, not an error.
//!
//! Only text whose first non-whitespace character is `{` is parsed. A JSON
//! object wrapped in a markdown code fence is treated as prose.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::result::{FallbackDefaults, StructuredResult};

/// Builds [`StructuredResult`]s from raw generation output.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    defaults: FallbackDefaults,
}

/// Fields lifted out of a parsed JSON payload.
#[derive(Debug, Default)]
struct ParsedFields {
    answer: Option<String>,
    reasoning_steps: Vec<String>,
    tools_used: Vec<String>,
    sources: Vec<String>,
}

impl ResultAggregator {
    /// Creates an aggregator with the given fallback values.
    #[must_use]
    pub const fn new(defaults: FallbackDefaults) -> Self {
        Self { defaults }
    }

    /// Returns the configured fallback values.
    #[must_use]
    pub const fn defaults(&self) -> &FallbackDefaults {
        &self.defaults
    }

    /// Aggregates `raw` into a structured result.
    ///
    /// `discovered_sources` are the source names retrieval found for this
    /// run. When the text names no sources they are used instead; when
    /// retrieval found nothing, the fallback source is always included.
    #[must_use]
    pub fn aggregate(&self, raw: &str, discovered_sources: &[String]) -> StructuredResult {
        let mut recovered = false;
        let mut fields = ParsedFields::default();

        if raw.trim_start().starts_with('{') {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(obj)) => fields = Self::lift_fields(&obj),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "final response looked like JSON but did not parse");
                    recovered = true;
                }
            }
        }

        let answer = fields.answer.unwrap_or_else(|| raw.to_string());

        let reasoning_steps = if !fields.reasoning_steps.is_empty() {
            fields.reasoning_steps
        } else if recovered {
            self.defaults.recovery_steps.clone()
        } else {
            self.defaults.reasoning_steps.clone()
        };

        let tools_used = if fields.tools_used.is_empty() {
            self.defaults.tools_used.clone()
        } else {
            fields.tools_used
        };

        let sources = self.resolve_sources(fields.sources, discovered_sources);

        debug!(
            recovered,
            sources = sources.len(),
            tools = tools_used.len(),
            steps = reasoning_steps.len(),
            "aggregated structured result"
        );

        StructuredResult {
            answer,
            sources,
            tools_used,
            reasoning_steps,
        }
    }

    fn resolve_sources(&self, named: Vec<String>, discovered: &[String]) -> Vec<String> {
        let mut sources = Vec::new();
        for s in named {
            push_unique(&mut sources, s);
        }
        if discovered.is_empty() {
            push_unique(&mut sources, self.defaults.source.clone());
        } else if sources.is_empty() {
            for s in discovered {
                push_unique(&mut sources, s.clone());
            }
        }
        sources
    }

    fn lift_fields(obj: &Map<String, Value>) -> ParsedFields {
        let answer = match obj.get("final_answer") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        ParsedFields {
            answer,
            reasoning_steps: string_list(obj.get("reasoning_steps")),
            tools_used: string_list(obj.get("tools_used")),
            sources: string_list(obj.get("sources")),
        }
    }
}

/// Reads a JSON array as strings; scalars are stringified, anything else is dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
