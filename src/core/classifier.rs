//! Incremental stream classifier.
//!
//! The coordinator's token stream interleaves machine-oriented payload
//! (tool-call echoes, JSON scratch state, filler while waiting on other
//! agents) with the human-facing markdown answer. [`StreamClassifier`]
//! decides, one whole chunk at a time, whether a chunk is forwarded to the
//! caller or dropped. It never splits, buffers, or reorders chunks.
//!
//! The classifier is a heuristic, not a parser: it prefers dropping a short
//! piece of genuine content over leaking payload text. The final answer is
//! always re-derived by the aggregator, so the live stream is a preview.
//!
//! # State machine
//!
//! ```text
//!                 header chunk                      payload chunk
//! AwaitingContent ───────────► EmittingContent ◄──────────────► InStructuredPayload
//!       ▲    │ payload chunk        ▲                   header chunk
//!       └────┘                      └───────────────────────────┘
//! ```
//!
//! Only `EmittingContent` forwards chunks. Payload signals come from a
//! declarative [`ClassifierRules`] table.

use tracing::debug;

/// Lower-cased marker substrings that identify machine-oriented payload.
pub const DEFAULT_PAYLOAD_MARKERS: &[&str] = &[
    "search_knowledge_base",
    "completed in",
    "retrieved_content",
    "\"reasoning_steps\"",
    "\"tools_used\"",
    "\"key_findings\"",
    "\"analysis\":",
    "\"final_answer\":",
    "```json",
    "ready to analyze",
    "once it is retrieved",
    "provide the necessary details",
    "provide the document",
    "waiting for",
    "analyze the content",
];

/// Leading characters (after trimming) that mark a JSON fragment.
pub const DEFAULT_PAYLOAD_PREFIXES: &[char] = &['{', '}', '[', ']', '"'];

/// Raw substrings that mark JSON-encoded text: a key-quote and an escaped newline.
pub const DEFAULT_PAYLOAD_FRAGMENTS: &[&str] = &["\":", "\\n"];

/// Trimmed chunks with this many characters or fewer are never emitted.
pub const DEFAULT_NOISE_THRESHOLD: usize = 2;

/// Declarative pattern table driving the classifier.
///
/// The defaults reproduce the production denylist; deployments can extend
/// the marker list without touching the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    markers: Vec<String>,
    payload_prefixes: Vec<char>,
    payload_fragments: Vec<String>,
    header_prefix: char,
    noise_threshold: usize,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            markers: DEFAULT_PAYLOAD_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
            payload_prefixes: DEFAULT_PAYLOAD_PREFIXES.to_vec(),
            payload_fragments: DEFAULT_PAYLOAD_FRAGMENTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            header_prefix: '#',
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

impl ClassifierRules {
    /// Adds a denylist marker. Matching is case-insensitive.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into().to_lowercase();
        if !marker.is_empty() && !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    /// Sets the noise threshold (trimmed length that must be exceeded to emit).
    #[must_use]
    pub const fn with_noise_threshold(mut self, threshold: usize) -> Self {
        self.noise_threshold = threshold;
        self
    }

    /// Returns the denylist markers.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Returns the first payload signal the chunk trips, if any.
    ///
    /// `brace_depth` is the running depth *including* this chunk.
    fn payload_signal(&self, chunk: &str, brace_depth: i64) -> Option<SuppressReason> {
        let lowered = chunk.to_lowercase();
        if self.markers.iter().any(|m| lowered.contains(m.as_str())) {
            return Some(SuppressReason::Marker);
        }
        if brace_depth > 0 {
            return Some(SuppressReason::OpenBrace);
        }
        let trimmed = chunk.trim();
        if trimmed
            .chars()
            .next()
            .is_some_and(|c| self.payload_prefixes.contains(&c))
        {
            return Some(SuppressReason::PayloadPrefix);
        }
        if self
            .payload_fragments
            .iter()
            .any(|f| chunk.contains(f.as_str()))
        {
            return Some(SuppressReason::PayloadFragment);
        }
        None
    }
}

/// Classifier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No markdown header seen yet; nothing is emitted.
    AwaitingContent,
    /// Content had started, then a payload chunk arrived. Waits for the next header.
    InStructuredPayload,
    /// Forwarding clean content.
    EmittingContent,
}

/// Why a chunk was dropped as payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Matched a denylist marker.
    Marker,
    /// Inside unmatched `{`.
    OpenBrace,
    /// Starts with a JSON delimiter.
    PayloadPrefix,
    /// Contains a key-quote or escaped newline.
    PayloadFragment,
}

/// Outcome for a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the chunk unchanged.
    Emit,
    /// Drop the chunk as machine payload.
    Suppress(SuppressReason),
    /// Clean chunk that is still not forwarded (no header yet, recovering
    /// from payload, or below the noise threshold).
    Hold,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Emit`].
    #[must_use]
    pub const fn is_emit(self) -> bool {
        matches!(self, Self::Emit)
    }
}

/// Per-run stream classifier.
///
/// Create one per run and feed it every chunk in arrival order.
#[derive(Debug, Clone)]
pub struct StreamClassifier {
    rules: ClassifierRules,
    phase: Phase,
    brace_depth: i64,
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamClassifier {
    /// Creates a classifier with the default rule table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rules(ClassifierRules::default())
    }

    /// Creates a classifier with a custom rule table.
    #[must_use]
    pub const fn with_rules(rules: ClassifierRules) -> Self {
        Self {
            rules,
            phase: Phase::AwaitingContent,
            brace_depth: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Running `{` minus `}` count over every chunk seen so far.
    #[must_use]
    pub const fn brace_depth(&self) -> i64 {
        self.brace_depth
    }

    /// Whether chunks are currently being dropped.
    #[must_use]
    pub fn suppressing(&self) -> bool {
        self.phase != Phase::EmittingContent
    }

    /// Whether a markdown header has ever been observed.
    #[must_use]
    pub fn markdown_started(&self) -> bool {
        self.phase != Phase::AwaitingContent
    }

    /// Classifies the next chunk and advances the state machine.
    pub fn classify(&mut self, chunk: &str) -> Verdict {
        let opens = count_to_i64(chunk.matches('{').count());
        let closes = count_to_i64(chunk.matches('}').count());
        self.brace_depth = self.brace_depth.saturating_add(opens).saturating_sub(closes);

        if let Some(reason) = self.rules.payload_signal(chunk, self.brace_depth) {
            if self.phase == Phase::EmittingContent {
                self.phase = Phase::InStructuredPayload;
            }
            debug!(?reason, depth = self.brace_depth, "suppressed stream chunk");
            return Verdict::Suppress(reason);
        }

        let trimmed = chunk.trim();
        if trimmed.starts_with(self.rules.header_prefix) {
            self.phase = Phase::EmittingContent;
        }

        if self.phase == Phase::EmittingContent
            && trimmed.chars().count() > self.rules.noise_threshold
        {
            Verdict::Emit
        } else {
            Verdict::Hold
        }
    }

    /// Classifies a sequence and returns the emitted chunks in order.
    pub fn filter<'a, I>(&mut self, chunks: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        chunks
            .into_iter()
            .filter(|c| self.classify(c).is_emit())
            .collect()
    }
}

fn count_to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nothing_emitted_before_header() {
        let mut c = StreamClassifier::new();
        assert_eq!(c.classify("Some preamble text"), Verdict::Hold);
        assert_eq!(c.phase(), Phase::AwaitingContent);
        assert!(c.suppressing());
        assert!(!c.markdown_started());
    }

    #[test]
    fn test_header_starts_emission() {
        let mut c = StreamClassifier::new();
        let out = c.filter(["## Leave Policy", "\n\nEmployees may request", " leave."]);
        assert_eq!(out, vec!["## Leave Policy", "\n\nEmployees may request", " leave."]);
        assert_eq!(c.phase(), Phase::EmittingContent);
    }

    #[test]
    fn test_noise_chunks_dropped() {
        let mut c = StreamClassifier::new();
        assert!(c.classify("## Title").is_emit());
        assert_eq!(c.classify("  "), Verdict::Hold);
        assert_eq!(c.classify("."), Verdict::Hold);
        assert_eq!(c.classify("**"), Verdict::Hold);
        assert!(c.classify("abc").is_emit());
        // Holding noise does not leave the emitting phase.
        assert_eq!(c.phase(), Phase::EmittingContent);
    }

    #[test]
    fn test_marker_suppresses_and_latches_until_header() {
        let mut c = StreamClassifier::new();
        assert!(c.classify("## Answer").is_emit());
        assert_eq!(
            c.classify("Waiting For the document"),
            Verdict::Suppress(SuppressReason::Marker)
        );
        assert_eq!(c.phase(), Phase::InStructuredPayload);
        assert_eq!(c.classify("plain text again"), Verdict::Hold);
        assert!(c.classify("### Next section").is_emit());
        assert!(c.classify("plain text again").is_emit());
    }

    #[test]
    fn test_open_brace_suppresses_until_closed() {
        let mut c = StreamClassifier::new();
        assert!(c.classify("## Answer").is_emit());
        assert_eq!(
            c.classify("note {"),
            Verdict::Suppress(SuppressReason::OpenBrace)
        );
        assert_eq!(
            c.classify("## inside payload"),
            Verdict::Suppress(SuppressReason::OpenBrace)
        );
        assert_eq!(
            c.classify("}"),
            Verdict::Suppress(SuppressReason::PayloadPrefix)
        );
        assert_eq!(c.brace_depth(), 0);
        assert!(c.classify("## Back").is_emit());
    }

    #[test]
    fn test_json_prefix_and_fragments() {
        let mut c = StreamClassifier::new();
        c.classify("## Start");
        assert_eq!(
            c.classify("  [1, 2]"),
            Verdict::Suppress(SuppressReason::PayloadPrefix)
        );
        c.classify("## Start");
        assert_eq!(
            c.classify("\"quoted"),
            Verdict::Suppress(SuppressReason::PayloadPrefix)
        );
        c.classify("## Start");
        assert_eq!(
            c.classify("key\": value"),
            Verdict::Suppress(SuppressReason::PayloadFragment)
        );
        c.classify("## Start");
        assert_eq!(
            c.classify(r"line one\nline two"),
            Verdict::Suppress(SuppressReason::PayloadFragment)
        );
    }

    #[test]
    fn test_real_newline_is_not_payload() {
        let mut c = StreamClassifier::new();
        c.classify("## Start");
        assert!(c.classify("line one\nline two").is_emit());
    }

    #[test]
    fn test_negative_depth_does_not_suppress() {
        let mut c = StreamClassifier::new();
        assert_eq!(
            c.classify("}"),
            Verdict::Suppress(SuppressReason::PayloadPrefix)
        );
        assert_eq!(c.brace_depth(), -1);
        assert!(c.classify("## Header").is_emit());
    }

    #[test]
    fn test_tool_echo_before_answer() {
        let chunks = [
            "search_knowledge_base(query=leave)",
            "completed in 0.4s",
            "{\"retrieved_content\": [",
            "{\"content\": \"x\"}",
            "]}",
            "## Leave Policy",
            "\n\nFull-time staff accrue",
            " 20 days per year.",
        ];
        let mut c = StreamClassifier::new();
        assert_eq!(
            c.filter(chunks),
            vec!["## Leave Policy", "\n\nFull-time staff accrue", " 20 days per year."]
        );
    }

    #[test]
    fn test_custom_marker() {
        let rules = ClassifierRules::default().with_marker("INTERNAL NOTE");
        let mut c = StreamClassifier::with_rules(rules);
        c.classify("## Hi");
        assert_eq!(
            c.classify("internal note: skip"),
            Verdict::Suppress(SuppressReason::Marker)
        );
    }

    #[test]
    fn test_empty_chunk_is_held() {
        let mut c = StreamClassifier::new();
        c.classify("## Hi");
        assert_eq!(c.classify(""), Verdict::Hold);
    }

    fn clean_chunk() -> impl Strategy<Value = String> {
        let words = prop::sample::select(vec![
            "policy", "approval", "leave", "budget", "manager", "request", "training",
            "hardware", "annual", "limit",
        ]);
        prop::collection::vec(words, 1..6).prop_map(|w| format!(" {}", w.join(" ")))
    }

    proptest! {
        #[test]
        fn prop_clean_content_after_header_passes_through(
            chunks in prop::collection::vec(clean_chunk(), 0..30)
        ) {
            let mut c = StreamClassifier::new();
            let header = "## Policy Summary".to_string();
            let mut input = vec![header.clone()];
            input.extend(chunks.iter().cloned());
            let emitted = c.filter(input.iter().map(String::as_str));
            let expected: Vec<&str> = input.iter().map(String::as_str).collect();
            prop_assert_eq!(emitted, expected);
        }

        #[test]
        fn prop_emitted_chunks_never_inside_open_brace(
            chunks in prop::collection::vec("[a-z #{}]{0,12}", 0..40)
        ) {
            let mut c = StreamClassifier::new();
            let mut depth: i64 = 0;
            for chunk in &chunks {
                depth += i64::try_from(chunk.matches('{').count()).unwrap_or(0);
                depth -= i64::try_from(chunk.matches('}').count()).unwrap_or(0);
                let verdict = c.classify(chunk);
                prop_assert_eq!(c.brace_depth(), depth);
                if verdict.is_emit() {
                    prop_assert!(depth <= 0);
                }
            }
        }

        #[test]
        fn prop_emission_preserves_order(
            chunks in prop::collection::vec("[a-z #{}\":]{0,10}", 0..40)
        ) {
            let mut c = StreamClassifier::new();
            let emitted = c.filter(chunks.iter().map(String::as_str));
            // Emitted chunks form a subsequence of the input.
            let mut it = chunks.iter();
            for e in emitted {
                prop_assert!(it.any(|x| x == e));
            }
        }
    }
}
