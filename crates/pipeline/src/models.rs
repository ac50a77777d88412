//! Pipeline Models
//!
//! Data structures for analysis passes, per-pass results, and the aggregate
//! report produced by a full pipeline run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status of a single analysis pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    /// Pass completed and met the quality bar
    Pass,
    /// Pass completed below the quality bar (or timed out)
    Fail,
    /// Pass was not executed (disabled, or tool unavailable with AI skipped)
    Skipped,
    /// Pass raised an error that was isolated at the pass boundary
    Error,
}

impl PassStatus {
    /// Check if this status counts as a failure for aggregation.
    /// `Error` is treated as failing; `Skipped` is excluded entirely.
    pub fn is_failure(&self) -> bool {
        matches!(self, PassStatus::Fail | PassStatus::Error)
    }

    /// Status glyph for progress lines
    pub fn glyph(&self) -> &'static str {
        match self {
            PassStatus::Pass => "✓",
            PassStatus::Fail => "✗",
            PassStatus::Skipped => "○",
            PassStatus::Error => "✗",
        }
    }
}

impl std::fmt::Display for PassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassStatus::Pass => write!(f, "pass"),
            PassStatus::Fail => write!(f, "fail"),
            PassStatus::Skipped => write!(f, "skipped"),
            PassStatus::Error => write!(f, "error"),
        }
    }
}

/// Violation severity, ordered by rank: error < warning < info < other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Other,
}

impl Severity {
    /// Sort rank (lower sorts first)
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
            Severity::Other => 3,
        }
    }

    /// Parse a severity from free text, defaulting to `Other`
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "error" | "critical" | "high" => Severity::Error,
            "warning" | "warn" | "medium" => Severity::Warning,
            "info" | "low" | "note" => Severity::Info,
            _ => Severity::Other,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Other => write!(f, "other"),
        }
    }
}

/// A single code violation reported by a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Severity of the violation
    pub severity: Severity,
    /// File path the violation refers to (may be empty for project-level findings)
    pub file: String,
    /// Line number, if known
    pub line: Option<u32>,
    /// Human-readable message
    pub message: String,
    /// Violation category/type tag, if reported
    pub category: Option<String>,
}

impl Violation {
    /// Create a new violation
    pub fn new(severity: Severity, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            file: file.into(),
            line: None,
            message: message.into(),
            category: None,
        }
    }

    /// Set the line number
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the category tag
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Result of running a single analysis pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassResult {
    /// Pass name
    pub pass_name: String,
    /// Pass category tag
    pub category: String,
    /// Status of the pass
    pub status: PassStatus,
    /// Numeric score 0-100, absent for skipped/errored passes
    pub score: Option<f64>,
    /// Narrative summary assembled from the assistant's response
    pub narrative: String,
    /// Named metrics reported by the pass
    pub metrics: BTreeMap<String, f64>,
    /// Violations reported by the pass
    pub violations: Vec<Violation>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl PassResult {
    /// Create an empty result shell for a pass
    pub fn new(pass_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pass_name: pass_name.into(),
            category: category.into(),
            status: PassStatus::Pass,
            score: None,
            narrative: String::new(),
            metrics: BTreeMap::new(),
            violations: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Create a result for a skipped pass. Skipped results carry no score.
    pub fn skipped(
        pass_name: impl Into<String>,
        category: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(pass_name, category);
        result.status = PassStatus::Skipped;
        result.narrative = reason.into();
        result
    }

    /// Create a result for a pass that raised an isolated error
    pub fn error(
        pass_name: impl Into<String>,
        category: impl Into<String>,
        message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        let mut result = Self::new(pass_name, category);
        result.status = PassStatus::Error;
        result.narrative = message.into();
        result.duration_ms = duration_ms;
        result
    }

    /// Create a failed result for a timed-out pass
    pub fn timed_out(
        pass_name: impl Into<String>,
        category: impl Into<String>,
        timeout_secs: u64,
        duration_ms: u64,
    ) -> Self {
        let mut result = Self::new(pass_name, category);
        result.status = PassStatus::Fail;
        result.score = Some(0.0);
        result.narrative = format!(
            "Analysis timed out after {} seconds; the assistant process was terminated.",
            timeout_secs
        );
        result.duration_ms = duration_ms;
        result
    }

    /// Count violations at a given severity
    pub fn violation_count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

/// Aggregate report for a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    /// Project path that was analyzed
    pub project_path: String,
    /// Overall status: fail iff any non-skipped pass failed or errored
    pub overall_status: PassStatus,
    /// Number of passed passes
    pub passed: usize,
    /// Number of failed passes
    pub failed: usize,
    /// Number of skipped passes
    pub skipped: usize,
    /// Number of errored passes
    pub errored: usize,
    /// Total duration in milliseconds
    pub total_duration_ms: u64,
    /// Mean score per category over scored passes
    pub category_scores: BTreeMap<String, f64>,
    /// Combined narrative with a per-pass header for each entry
    pub narrative: String,
    /// Individual pass results in execution order
    pub results: Vec<PassResult>,
    /// Timestamp when the run started
    pub started_at: i64,
    /// Timestamp when the run finished
    pub finished_at: Option<i64>,
}

impl AggregateReport {
    /// Create a new empty report
    pub fn new(project_path: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            overall_status: PassStatus::Pass,
            passed: 0,
            failed: 0,
            skipped: 0,
            errored: 0,
            total_duration_ms: 0,
            category_scores: BTreeMap::new(),
            narrative: String::new(),
            results: Vec::new(),
            started_at: chrono::Utc::now().timestamp(),
            finished_at: None,
        }
    }

    /// Append a pass result and update counts
    pub fn add_result(&mut self, result: PassResult) {
        self.total_duration_ms += result.duration_ms;
        match result.status {
            PassStatus::Pass => self.passed += 1,
            PassStatus::Fail => self.failed += 1,
            PassStatus::Skipped => self.skipped += 1,
            PassStatus::Error => self.errored += 1,
        }
        self.results.push(result);
    }

    /// Finalize the report: overall status, category scores, combined narrative
    pub fn finalize(&mut self) {
        self.finished_at = Some(chrono::Utc::now().timestamp());

        self.overall_status = if self
            .results
            .iter()
            .any(|r| r.status.is_failure())
        {
            PassStatus::Fail
        } else {
            PassStatus::Pass
        };

        // Mean score per category over scored passes
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for result in &self.results {
            if let Some(score) = result.score {
                let entry = sums.entry(result.category.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        self.category_scores = sums
            .into_iter()
            .map(|(category, (sum, count))| (category, sum / count as f64))
            .collect();

        // Combined narrative embeds each pass's narrative verbatim
        let mut narrative = String::new();
        for result in &self.results {
            narrative.push_str(&format!(
                "## [{}] {} ({})\n\n",
                result.category, result.pass_name, result.status
            ));
            if !result.narrative.is_empty() {
                narrative.push_str(&result.narrative);
                narrative.push_str("\n\n");
            }
        }
        self.narrative = narrative.trim_end().to_string();
    }
}

/// Which extraction strategy produced a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Code-fenced JSON block, or brace-depth span from the first `{`
    FencedBlock,
    /// Noise lines dropped, then brace-depth accumulation
    LineFiltered,
    /// Substring between first `{` and last `}`
    Naive,
    /// Synthesized minimal payload; always succeeds
    DefaultStructure,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStrategy::FencedBlock => write!(f, "fenced_block"),
            ExtractionStrategy::LineFiltered => write!(f, "line_filtered"),
            ExtractionStrategy::Naive => write!(f, "naive"),
            ExtractionStrategy::DefaultStructure => write!(f, "default_structure"),
        }
    }
}

/// Metrics accumulator for one or more pipeline runs.
///
/// Passed into the orchestrator by value reference and mutated there; the
/// caller owns it and may merge accumulators across runs if it wants
/// historical totals. No global counters exist anywhere in the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// Passes executed (including fallback-served ones, excluding skipped)
    pub passes_run: u64,
    /// Assistant CLI invocations attempted
    pub ai_invocations: u64,
    /// Passes served by the heuristic fallback analyzer
    pub fallback_runs: u64,
    /// Child processes forcibly terminated on timeout
    pub timeouts: u64,
    /// Payload count per extraction strategy
    pub extractions: BTreeMap<String, u64>,
}

impl RunMetrics {
    /// Record which strategy produced a payload
    pub fn record_extraction(&mut self, strategy: ExtractionStrategy) {
        *self.extractions.entry(strategy.to_string()).or_insert(0) += 1;
    }

    /// Merge another accumulator into this one
    pub fn merge(&mut self, other: &RunMetrics) {
        self.passes_run += other.passes_run;
        self.ai_invocations += other.ai_invocations;
        self.fallback_runs += other.fallback_runs;
        self.timeouts += other.timeouts;
        for (strategy, count) in &other.extractions {
            *self.extractions.entry(strategy.clone()).or_insert(0) += count;
        }
    }
}
