//! Keyword occurrence counting over multiline policy text.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Keyword used when a caller does not name one.
pub const DEFAULT_KEYWORD: &str = "approval";

/// Maximum number of matching lines reported.
pub const MAX_MATCHING_LINES: usize = 5;

/// Result of a keyword count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    /// The keyword as supplied.
    pub keyword: String,
    /// Number of lines containing the keyword.
    pub count: usize,
    /// Up to [`MAX_MATCHING_LINES`] matches, as `"Line <n>: <trimmed line>"`.
    pub matching_lines: Vec<String>,
}

/// Counts the lines of `text` that contain `keyword`, case-insensitively.
///
/// Lines are numbered from 1 and reported lower-cased. An empty keyword
/// matches nothing.
#[must_use]
pub fn count_keyword(text: &str, keyword: &str) -> KeywordCount {
    let needle = keyword.to_lowercase();
    let haystack = text.to_lowercase();

    let mut count = 0;
    let mut matching_lines = Vec::new();

    if !needle.is_empty() {
        for (i, line) in haystack.lines().enumerate() {
            if line.contains(&needle) {
                count += 1;
                if matching_lines.len() < MAX_MATCHING_LINES {
                    matching_lines.push(format!("Line {}: {}", i + 1, line.trim()));
                }
            }
        }
    }

    info!(keyword, count, "counted keyword occurrences");

    KeywordCount {
        keyword: keyword.to_string(),
        count,
        matching_lines,
    }
}
