//! Response Extractor
//!
//! Locates a structured JSON payload inside free-form assistant output.
//! Assistants are asked for raw JSON but routinely wrap it in markdown
//! fences, preamble prose, or log noise, or garble it outright. Four
//! strategies are tried in order; the first candidate that validates as a
//! JSON object wins. The last strategy synthesizes a payload, so
//! `extract` is total: any non-empty input yields a structurally valid
//! payload and semantic failure handling lives in the interpreter.

use serde_json::{json, Value};
use tracing::debug;

use codegauge_core::CoreError;

use crate::models::ExtractionStrategy;

/// Score carried by a synthesized default payload. A midpoint rather than
/// zero: a failed extraction is not a failed analysis.
pub const DEFAULT_SCORE: f64 = 50.0;

/// How much raw text a synthesized payload preserves for diagnostics
const RAW_EXCERPT_CHARS: usize = 500;

/// Line prefixes that are log or preamble noise, never payload
const NOISE_PREFIXES: &[&str] = &[
    "[INFO]",
    "[WARN]",
    "[WARNING]",
    "[ERROR]",
    "[DEBUG]",
    "INFO:",
    "WARN:",
    "WARNING:",
    "ERROR:",
    "DEBUG:",
    "Let me",
    "I'll",
    "I will",
    "I've",
    "I have",
    "Here is",
    "Here's",
    "Sure",
    "Okay",
    "Note:",
    "First,",
    "Looking at",
];

/// A validated payload plus the strategy that produced it
#[derive(Debug, Clone)]
pub struct ExtractedPayload {
    /// The parsed JSON object
    pub value: Value,
    /// Which strategy produced it
    pub strategy: ExtractionStrategy,
}

impl ExtractedPayload {
    /// Whether this payload was synthesized because extraction failed
    pub fn is_synthesized(&self) -> bool {
        self.strategy == ExtractionStrategy::DefaultStructure
    }
}

/// Extract a structured payload from raw assistant output.
///
/// Never fails: if no strategy finds valid JSON, a minimal default payload
/// is synthesized carrying a neutral score and a truncated excerpt of the
/// raw text.
pub fn extract(raw: &str) -> ExtractedPayload {
    let strategies: [(ExtractionStrategy, fn(&str) -> Option<String>); 3] = [
        (ExtractionStrategy::FencedBlock, extract_fenced),
        (ExtractionStrategy::LineFiltered, extract_line_filtered),
        (ExtractionStrategy::Naive, extract_naive),
    ];

    for (strategy, candidate_fn) in strategies {
        let Some(candidate) = candidate_fn(raw) else {
            debug!(%strategy, "extraction strategy produced no candidate");
            continue;
        };
        match validate(&candidate) {
            Ok(value) => {
                debug!(%strategy, len = candidate.len(), "payload extracted");
                return ExtractedPayload { value, strategy };
            }
            Err(reason) => {
                debug!(%strategy, %reason, "candidate rejected");
            }
        }
    }

    debug!("all extraction strategies exhausted, synthesizing default payload");
    ExtractedPayload {
        value: default_structure(raw),
        strategy: ExtractionStrategy::DefaultStructure,
    }
}

/// Validate a candidate: trimmed text must start with `{`, end with `}`,
/// and parse to a JSON object. Rejections carry the reason.
fn validate(candidate: &str) -> Result<Value, CoreError> {
    let trimmed = candidate.trim();
    if !trimmed.starts_with('{') {
        return Err(CoreError::unextractable("candidate does not start with '{'"));
    }
    if !trimmed.ends_with('}') {
        return Err(CoreError::unextractable("candidate does not end with '}'"));
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(CoreError::unextractable(
            "candidate parses but is not an object",
        )),
        Err(e) => Err(CoreError::unextractable(format!(
            "candidate is not well-formed JSON: {}",
            e
        ))),
    }
}

// ============================================================================
// Strategy 1: fenced block
// ============================================================================

/// Prefer a ```json (or bare ```) fenced block; if none exists, take a
/// brace-depth-balanced span starting at the first `{`.
fn extract_fenced(raw: &str) -> Option<String> {
    if let Some(block) = fenced_block(raw) {
        // The fence content may still carry prose around the object
        if let Some(span) = balanced_span(&block) {
            return Some(span);
        }
        return Some(block);
    }
    balanced_span(raw)
}

/// Content of the first fenced code block, if any
fn fenced_block(raw: &str) -> Option<String> {
    let start = raw.find("```")?;
    let after_fence = &raw[start + 3..];
    // Skip the info string ("json", "JSON", ...) up to the first newline
    let content_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
    let content = &after_fence[content_start..];
    let end = content.find("```")?;
    Some(content[..end].trim().to_string())
}

/// Span from the first `{` until brace depth returns to zero. Depth tracking
/// is string-aware so braces inside JSON strings don't derail it.
fn balanced_span(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Strategy 2: line-filtered
// ============================================================================

/// Drop noise lines, then accumulate from the first line containing `{`
/// until brace depth balances.
fn extract_line_filtered(raw: &str) -> Option<String> {
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !NOISE_PREFIXES
                .iter()
                .any(|prefix| trimmed.starts_with(prefix))
        })
        .collect();

    let filtered = kept.join("\n");
    balanced_span(&filtered)
}

// ============================================================================
// Strategy 3: naive
// ============================================================================

/// Substring between the first `{` and the last `}`, balance ignored
fn extract_naive(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if start > end {
        return None;
    }
    Some(raw[start..=end].to_string())
}

// ============================================================================
// Strategy 4: default structure
// ============================================================================

/// Synthesize a minimal valid payload carrying the raw text for diagnostics
fn default_structure(raw: &str) -> Value {
    let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
    json!({
        "score": DEFAULT_SCORE,
        "summary": "Structured payload extraction failed; heuristic default applied.",
        "violations": [],
        "rawExcerpt": excerpt,
    })
}
