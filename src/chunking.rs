//! Markdown chunking for ingestion.
//!
//! Policy manuals are split at section headers so each passage stays on one
//! topic. Sections longer than the chunk size are split further at sentence
//! boundaries.

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Default maximum passage size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1500;

/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 100;

/// ATX heading; `None` only if the pattern fails to compile.
static HEADER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*\s*$").ok());

/// A passage ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageDraft {
    /// Nearest preceding section header, if any.
    pub heading: Option<String>,
    /// Passage text.
    pub content: String,
}

/// Splits a markdown document into passages of at most `max_chars` characters.
///
/// `max_chars` is clamped to [`MIN_CHUNK_SIZE`]. Sections with no text are
/// dropped. Header lines are kept at the start of their first passage.
#[must_use]
pub fn chunk_markdown(text: &str, max_chars: usize) -> Vec<PassageDraft> {
    let max_chars = max_chars.max(MIN_CHUNK_SIZE);
    let mut passages = Vec::new();

    for (heading, body) in sections(text) {
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        if body.chars().count() <= max_chars {
            passages.push(PassageDraft {
                heading: heading.clone(),
                content: body.to_string(),
            });
            continue;
        }
        for piece in split_sentences(body, max_chars) {
            passages.push(PassageDraft {
                heading: heading.clone(),
                content: piece,
            });
        }
    }

    passages
}

/// Groups lines under their nearest header.
fn sections(text: &str) -> Vec<(Option<String>, String)> {
    let mut out: Vec<(Option<String>, String)> = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence
            && let Some(caps) = HEADER_RE.as_ref().and_then(|re| re.captures(line))
        {
            if !body.trim().is_empty() {
                out.push((heading.take(), std::mem::take(&mut body)));
            }
            body.clear();
            heading = caps.get(1).map(|m| m.as_str().to_string());
        }
        body.push_str(line);
        body.push('\n');
    }
    if !body.trim().is_empty() {
        out.push((heading, body));
    }
    out
}

/// Packs sentences into pieces no longer than `max_chars`.
fn split_sentences(body: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in body.split_sentence_bounds() {
        let len = sentence.chars().count();
        if current_len + len > max_chars && !current.trim().is_empty() {
            pieces.push(current.trim().to_string());
            current.clear();
            current_len = 0;
        }
        if len > max_chars {
            for hard in hard_split(sentence, max_chars) {
                pieces.push(hard);
            }
            continue;
        }
        current.push_str(sentence);
        current_len += len;
    }
    if !current.trim().is_empty() {
        pieces.push(current.trim().to_string());
    }
    pieces
}

fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
