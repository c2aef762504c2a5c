//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or JSON. NDJSON renders
//! one compact object per line, which `stream` uses for one event per line.

use std::fmt::Write;

use serde::Serialize;

use crate::core::{StepStatus, StreamEvent, StructuredResult};
use crate::search::Passage;
use crate::storage::{Document, StoreStats};
use crate::tools::{Evaluation, KeywordCount, RoleLookup};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Newline-delimited compact JSON.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` in this format's JSON flavor.
    ///
    /// Text callers should not reach this; it renders pretty JSON for them.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
    }
}

/// Formats knowledge base statistics.
#[must_use]
pub fn format_status(stats: &StoreStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::from("Policy knowledge base\n");
            if let Some(path) = &stats.path {
                let _ = writeln!(out, "  Path:       {}", path.display());
            }
            let _ = writeln!(out, "  Documents:  {}", stats.documents);
            let _ = writeln!(out, "  Passages:   {}", stats.passages);
            let _ = writeln!(out, "  Total size: {} bytes", stats.total_size);
            if let Some(version) = stats.schema_version {
                let _ = writeln!(out, "  Schema:     v{version}");
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(stats),
    }
}

/// Formats the document list.
#[must_use]
pub fn format_document_list(documents: &[Document], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if documents.is_empty() {
                return "No documents ingested.\n".to_string();
            }
            let mut out = format!("{:<4} {:<32} {:>10} {:>9}\n", "ID", "NAME", "BYTES", "PASSAGES");
            for doc in documents {
                let _ = writeln!(
                    out,
                    "{:<4} {:<32} {:>10} {:>9}",
                    doc.id,
                    truncate(&doc.name, 32),
                    doc.size,
                    doc.passage_count
                );
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(documents),
    }
}

/// Formats search results.
#[must_use]
pub fn format_search_results(query: &str, passages: &[Passage], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if passages.is_empty() {
                return format!("No passages found for: {query}\n");
            }
            let mut out = format!("{} passage(s) for: {query}\n", passages.len());
            for (i, p) in passages.iter().enumerate() {
                let heading = p
                    .metadata
                    .get("heading")
                    .and_then(serde_json::Value::as_str)
                    .map(|h| format!(" > {h}"))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "\n{}. [{:.3}] {}{heading}\n   {}",
                    i + 1,
                    p.score,
                    p.source_name(),
                    truncate(&p.text.replace('\n', " "), 200)
                );
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            #[derive(Serialize)]
            struct Hit<'a> {
                source: &'a str,
                score: f64,
                text: &'a str,
                metadata: &'a serde_json::Map<String, serde_json::Value>,
            }
            let results: Vec<Hit<'_>> = passages
                .iter()
                .map(|p| Hit {
                    source: p.source_name(),
                    score: p.score,
                    text: &p.text,
                    metadata: &p.metadata,
                })
                .collect();
            format.to_json(&serde_json::json!({ "query": query, "results": results }))
        }
    }
}

/// Formats a structured answer.
#[must_use]
pub fn format_result(result: &StructuredResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = result.answer.trim_end().to_string();
            out.push_str("\n\n---\n");
            let _ = writeln!(out, "Sources: {}", result.sources.join(", "));
            let _ = writeln!(out, "Tools:   {}", result.tools_used.join(", "));
            out.push_str("Steps:\n");
            for (i, step) in result.reasoning_steps.iter().enumerate() {
                let _ = writeln!(out, "  {}. {step}", i + 1);
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(result),
    }
}

/// Formats one pipeline event for line-by-line display.
///
/// Text mode renders progress lines and raw content; content chunks carry
/// no trailing newline so the answer prints contiguously.
#[must_use]
pub fn format_event(event: &StreamEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => {
            let mut line = event.to_json();
            line.push('\n');
            line
        }
        OutputFormat::Text => match event {
            StreamEvent::Thinking { message } => format!("... {message}\n"),
            StreamEvent::AgentStep {
                agent,
                step,
                status,
                response,
            } => {
                let marker = match status {
                    StepStatus::InProgress => "->",
                    StepStatus::Completed => "ok",
                };
                match response {
                    Some(r) => format!("[{marker}] {agent}: {step} ({r})\n"),
                    None => format!("[{marker}] {agent}: {step}\n"),
                }
            }
            StreamEvent::Source { source } => format!("[source] {source}\n"),
            StreamEvent::Content { chunk } => chunk.clone(),
            StreamEvent::Metadata {
                sources,
                tools_used,
                reasoning_steps,
            } => format!(
                "\n\n---\nSources: {}\nTools:   {}\nSteps:   {}\n",
                sources.join(", "),
                tools_used.join(", "),
                reasoning_steps.len()
            ),
            StreamEvent::Done { .. } => String::new(),
            StreamEvent::Error { message } => format!("\nerror: {message}\n"),
        },
    }
}

/// Formats a keyword count.
#[must_use]
pub fn format_keyword_count(count: &KeywordCount, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("'{}' appears on {} line(s)\n", count.keyword, count.count);
            for line in &count.matching_lines {
                let _ = writeln!(out, "  {line}");
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(count),
    }
}

/// Formats a role lookup.
#[must_use]
pub fn format_role(lookup: &RoleLookup, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match lookup {
            RoleLookup::Found { role, rules, .. } => {
                let list = |items: &[&str]| {
                    if items.is_empty() {
                        "none".to_string()
                    } else {
                        items.join(", ")
                    }
                };
                format!(
                    "Role: {role}\n  Can request:    {}\n  Can approve:    {}\n  Approval limit: {}\n  Escalates to:   {}\n",
                    list(rules.can_request),
                    list(rules.can_approve),
                    rules.approval_limit,
                    list(rules.requires_approval_from),
                )
            }
            RoleLookup::NotFound {
                error,
                available_roles,
                ..
            } => format!("{error}\nKnown roles: {}\n", available_roles.join(", ")),
        },
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(lookup),
    }
}

/// Formats a calculator evaluation.
#[must_use]
pub fn format_evaluation(evaluation: &Evaluation, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match (&evaluation.result, &evaluation.error) {
            (_, Some(error)) => format!("{}: {error}\n", evaluation.operation),
            (Some(value), None) => format!("{}: {value}\n", evaluation.operation),
            (None, None) => format!("{}: no result\n", evaluation.operation),
        },
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(evaluation),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
