//! CodeGauge CLI
//!
//! Runs the sequential analysis pipeline against a project directory and
//! prints the aggregate report. Exits nonzero when the report fails overall.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use codegauge::{
    build_plan, exit_code, render_json, render_text, AssistantConfig, RunMetrics,
    SequentialOrchestrator, UnavailableMode,
};

#[derive(Parser, Debug)]
#[command(name = "codegauge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI-assisted code analysis pipeline with heuristic fallback", long_about = None)]
struct Cli {
    /// Project directory to analyze
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Assistant CLI command to drive
    #[arg(long, env = "CODEGAUGE_ASSISTANT", default_value = "claude")]
    assistant: String,

    /// Model selector passed to the assistant as --model
    #[arg(long, env = "CODEGAUGE_MODEL")]
    model: Option<String>,

    /// Per-pass timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Also run the weighted deep review stage group
    #[arg(long)]
    deep: bool,

    /// Skip AI passes entirely when the assistant is unavailable,
    /// instead of substituting the heuristic analyzer
    #[arg(long)]
    skip_unavailable: bool,

    /// Extra context prepended to every prompt
    #[arg(long, default_value = "")]
    context: String,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let project = cli
        .project
        .canonicalize()
        .with_context(|| format!("project path {} not found", cli.project.display()))?;
    if !project.is_dir() {
        bail!("project path {} is not a directory", project.display());
    }

    let mut assistant = AssistantConfig::new(&cli.assistant);
    if let Some(ref model) = cli.model {
        assistant = assistant.with_model(model);
    }

    let mode = if cli.skip_unavailable {
        UnavailableMode::Skip
    } else {
        UnavailableMode::Fallback
    };
    debug!(?project, assistant = %cli.assistant, ?mode, "starting analysis run");

    let orchestrator = SequentialOrchestrator::new(&project, assistant)
        .with_context(&cli.context)
        .with_unavailable_mode(mode);

    let plan = build_plan(Duration::from_secs(cli.timeout), cli.deep);
    let mut metrics = RunMetrics::default();
    let report = orchestrator.run(&plan, &mut metrics).await;

    if cli.json {
        println!("{}", render_json(&report, &metrics)?);
    } else {
        print!("{}", render_text(&report, &metrics));
    }

    std::process::exit(exit_code(&report));
}
