//! CodeGauge
//!
//! AI-assisted code analysis with a heuristic fallback. The heavy lifting
//! lives in the workspace crates; this crate supplies the built-in pass
//! catalog, report rendering, and the CLI binary.
//!
//! - `catalog` - Built-in analysis passes and their prompt templates
//! - `report` - Text and JSON rendering of run results

pub mod catalog;
pub mod report;

pub use catalog::{build_plan, deep_review_group, standard_passes};
pub use report::{exit_code, render_json, render_text};

// Re-export the pipeline surface so binary consumers need one import
pub use codegauge_pipeline::{
    AggregateReport, AnalysisPass, AssistantConfig, MultiStagePlan, PassResult, PassStatus,
    RunMetrics, RunPlan, SequentialOrchestrator, UnavailableMode,
};
