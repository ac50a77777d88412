//! Sequential Orchestrator
//!
//! Drives the ordered list of analysis passes strictly one at a time:
//! pre-flights the assistant once per run, executes each pass through the
//! invoker → extractor → interpreter chain, substitutes the heuristic
//! fallback when the assistant is unusable, and isolates every per-pass
//! failure so one bad pass never aborts the run.
//!
//! Sequential execution is a design mandate, not an accident: passes share
//! an external assistant and a working directory, and their child processes
//! are fully released before the next pass starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::time::Duration;
use tracing::{info, warn};

use codegauge_core::{CoreError, CoreResult};

use crate::aggregator;
use crate::extractor;
use crate::fallback::FallbackAnalyzer;
use crate::interpreter;
use crate::invoker::ProcessInvoker;
use crate::models::{AggregateReport, PassResult, RunMetrics};

/// Builds the prompt for one pass from the project path and contextual text
pub type PromptBuilder = Box<dyn Fn(&Path, &str) -> CoreResult<String> + Send + Sync>;

/// One unit of analysis work: identity, prompt, timeout.
/// Created once per run from the catalog and immutable thereafter.
pub struct AnalysisPass {
    /// Pass name
    pub name: String,
    /// Category tag
    pub category: String,
    /// Catalog order (informational; the catalog's vec order is what runs)
    pub order: u32,
    /// Whether the pass runs at all
    pub enabled: bool,
    /// Bounded wait for the assistant process
    pub timeout: Duration,
    /// Prompt construction
    pub prompt: PromptBuilder,
}

impl AnalysisPass {
    /// Create a pass with a prompt builder
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        prompt: PromptBuilder,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            order: 0,
            enabled: true,
            timeout: Duration::from_secs(300),
            prompt,
        }
    }

    /// Set catalog order
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Enable or disable the pass
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the bounded wait
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for AnalysisPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPass")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("order", &self.order)
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A weighted group of sub-passes folded into a single result
pub struct MultiStagePlan {
    /// Name of the folded result
    pub name: String,
    /// Category of the folded result
    pub category: String,
    /// Stage passes with their aggregation weights
    pub stages: Vec<(AnalysisPass, f64)>,
}

/// Everything one orchestrator run executes, in order
#[derive(Default)]
pub struct RunPlan {
    /// Single-shot passes
    pub passes: Vec<AnalysisPass>,
    /// Optional weighted stage groups, each occupying one slot of the run
    pub stage_groups: Vec<MultiStagePlan>,
}

impl RunPlan {
    /// Number of progress slots in this plan
    pub fn slot_count(&self) -> usize {
        self.passes.len() + self.stage_groups.len()
    }
}

/// How the run treats AI passes when the assistant pre-flight fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnavailableMode {
    /// Substitute the heuristic fallback analyzer for every pass
    #[default]
    Fallback,
    /// Record every AI pass as skipped
    Skip,
}

/// External assistant CLI configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Command name, e.g. "claude"
    pub command: String,
    /// Model selector passed as `--model`
    pub model: Option<String>,
    /// Extra CLI arguments prepended before the prompt
    pub extra_args: Vec<String>,
    /// Bound for the pre-flight version probe
    pub preflight_timeout: Duration,
}

impl AssistantConfig {
    /// Create a config for the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            model: None,
            extra_args: Vec::new(),
            preflight_timeout: Duration::from_secs(5),
        }
    }

    /// Set the model selector
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add extra CLI arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Full argument list for one analysis invocation
    pub fn build_args(&self, prompt: &str) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if let Some(ref model) = self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push("-p".to_string());
        args.push(prompt.to_string());
        args
    }
}

/// The orchestrator. `run` is fully synchronous from the caller's point of
/// view: it does not return until every enabled pass has completed or been
/// isolated.
pub struct SequentialOrchestrator {
    project_path: PathBuf,
    context: String,
    assistant: AssistantConfig,
    invoker: ProcessInvoker,
    unavailable_mode: UnavailableMode,
}

impl SequentialOrchestrator {
    /// Create an orchestrator for a project
    pub fn new(project_path: impl AsRef<Path>, assistant: AssistantConfig) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            context: String::new(),
            assistant,
            invoker: ProcessInvoker::new(),
            unavailable_mode: UnavailableMode::default(),
        }
    }

    /// Set the contextual text handed to every prompt builder
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Set the behavior when the assistant pre-flight fails
    pub fn with_unavailable_mode(mut self, mode: UnavailableMode) -> Self {
        self.unavailable_mode = mode;
        self
    }

    /// Run the full plan and produce the aggregate report.
    ///
    /// `metrics` is mutated in place; the caller owns the accumulator and
    /// may merge it across runs.
    pub async fn run(&self, plan: &RunPlan, metrics: &mut RunMetrics) -> AggregateReport {
        let mut report = AggregateReport::new(self.project_path.to_string_lossy());
        let total = plan.slot_count();

        // Pre-flight once: a failed probe converts the entire run, not
        // individual passes
        let available = self.preflight().await;
        if !available {
            warn!(
                command = %self.assistant.command,
                mode = ?self.unavailable_mode,
                "assistant unavailable for this run"
            );
        }

        let mut slot = 0usize;
        for pass in &plan.passes {
            slot += 1;
            info!("[{}/{}] {}…", slot, total, pass.name);
            let start = Instant::now();
            let result = self.execute_pass(pass, available, metrics).await;
            info!(
                "[{}/{}] {} {} ({:.1}s)",
                slot,
                total,
                pass.name,
                result.status.glyph(),
                start.elapsed().as_secs_f64()
            );
            report.add_result(result);
        }

        for group in &plan.stage_groups {
            slot += 1;
            info!("[{}/{}] {}…", slot, total, group.name);
            let start = Instant::now();
            let result = self.execute_stage_group(group, available, metrics).await;
            info!(
                "[{}/{}] {} {} ({:.1}s)",
                slot,
                total,
                group.name,
                result.status.glyph(),
                start.elapsed().as_secs_f64()
            );
            report.add_result(result);
        }

        report.finalize();
        report
    }

    /// Execute one pass end to end. Every failure is converted into a
    /// `PassResult` here; this function never returns an error upward.
    async fn execute_pass(
        &self,
        pass: &AnalysisPass,
        assistant_available: bool,
        metrics: &mut RunMetrics,
    ) -> PassResult {
        if !pass.enabled {
            return PassResult::skipped(&pass.name, &pass.category, "Pass disabled");
        }

        if !assistant_available {
            return match self.unavailable_mode {
                UnavailableMode::Skip => PassResult::skipped(
                    &pass.name,
                    &pass.category,
                    CoreError::tool_unavailable(&self.assistant.command).to_string(),
                ),
                UnavailableMode::Fallback => {
                    metrics.passes_run += 1;
                    metrics.fallback_runs += 1;
                    self.run_fallback(pass, None)
                }
            };
        }

        metrics.passes_run += 1;
        let start = Instant::now();

        let prompt = match (pass.prompt)(&self.project_path, &self.context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(pass = %pass.name, error = %e, "prompt construction failed");
                return PassResult::error(
                    &pass.name,
                    &pass.category,
                    format!("Prompt construction failed: {}", e),
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        metrics.ai_invocations += 1;
        let args = self.assistant.build_args(&prompt);
        let invocation = match self
            .invoker
            .invoke(&self.assistant.command, &args, &self.project_path, pass.timeout)
            .await
        {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(pass = %pass.name, error = %e, "assistant invocation failed, using fallback");
                metrics.fallback_runs += 1;
                return self.run_fallback(pass, None);
            }
        };

        if invocation.timed_out {
            metrics.timeouts += 1;
            let err = CoreError::Timeout(pass.timeout.as_secs());
            warn!(pass = %pass.name, error = %err, "assistant process killed on timeout");
            return PassResult::timed_out(
                &pass.name,
                &pass.category,
                pass.timeout.as_secs(),
                invocation.duration_ms,
            );
        }

        let Some(text) = invocation.analysis_text() else {
            let err = CoreError::empty_output(format!(
                "'{}' wrote nothing usable to either stream",
                self.assistant.command
            ));
            warn!(pass = %pass.name, error = %err, "using fallback");
            metrics.fallback_runs += 1;
            return self.run_fallback(pass, None);
        };

        let payload = extractor::extract(text);
        metrics.record_extraction(payload.strategy);
        interpreter::interpret(&payload, &pass.name, &pass.category, invocation.duration_ms)
    }

    /// Run one weighted stage group sequentially and fold it into a single
    /// result. Absent stages (errored sub-passes) are excluded from the
    /// weighted average rather than counted as zero.
    async fn execute_stage_group(
        &self,
        group: &MultiStagePlan,
        assistant_available: bool,
        metrics: &mut RunMetrics,
    ) -> PassResult {
        let mut expected = Vec::new();
        let mut results = BTreeMap::new();

        for (stage, weight) in &group.stages {
            expected.push((stage.name.clone(), *weight));
            let result = self.execute_pass(stage, assistant_available, metrics).await;
            info!(
                "  · stage {} {} (score {:?})",
                stage.name,
                result.status.glyph(),
                result.score
            );
            results.insert(stage.name.clone(), result);
        }

        aggregator::aggregate(&group.name, &group.category, &expected, &results)
    }

    /// Heuristic substitute for a pass whose assistant leg failed
    fn run_fallback(&self, pass: &AnalysisPass, salvaged: Option<&str>) -> PassResult {
        FallbackAnalyzer::new(&self.project_path).analyze_structure(
            &pass.name,
            &pass.category,
            salvaged,
        )
    }

    /// Short version probe; a failure marks the assistant unavailable for
    /// the entire run
    async fn preflight(&self) -> bool {
        self.invoker
            .preflight(
                &self.assistant.command,
                &["--version".to_string()],
                self.assistant.preflight_timeout,
            )
            .await
    }
}
