//! CodeGauge Pipeline
//!
//! Sequential AI-assisted analysis pipeline. An assistant CLI is driven
//! through a series of analysis passes; each pass's free-form output is
//! mined for a structured payload and normalized into a `PassResult`. The
//! crate is built around failure isolation, so one hung or garbled pass
//! never takes down the run:
//!
//! - `models` - Result data types (PassStatus, Violation, PassResult, AggregateReport, RunMetrics)
//! - `invoker` - Timeout-bounded subprocess invocation with full stream capture
//! - `extractor` - Multi-strategy JSON payload extraction from free-form output
//! - `interpreter` - Payload to `PassResult` normalization with safe defaults
//! - `fallback` - Structural heuristic analyzer for when the assistant is unusable
//! - `aggregator` - Weighted folding of multi-stage groups into one result
//! - `orchestrator` - Sequential pass execution with per-pass isolation

pub mod aggregator;
pub mod extractor;
pub mod fallback;
pub mod interpreter;
pub mod invoker;
pub mod models;
pub mod orchestrator;

// Re-export core model types
pub use models::{
    AggregateReport, ExtractionStrategy, PassResult, PassStatus, RunMetrics, Severity, Violation,
};

// Re-export the invocation layer
pub use invoker::{InvokerConfig, ProcessInvocation, ProcessInvoker};

// Re-export extraction and interpretation
pub use extractor::{extract, ExtractedPayload, DEFAULT_SCORE};
pub use interpreter::{interpret, FAIL_THRESHOLD};

// Re-export the fallback analyzer
pub use fallback::FallbackAnalyzer;

// Re-export orchestration types
pub use orchestrator::{
    AnalysisPass, AssistantConfig, MultiStagePlan, PromptBuilder, RunPlan, SequentialOrchestrator,
    UnavailableMode,
};
