//! End-to-end pipeline tests driving a fake assistant CLI.
//!
//! The fake assistant is a shell script that answers the version probe and
//! then responds per prompt keyword, which lets one run mix clean JSON,
//! hangs, and prose responses.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use codegauge::{
    build_plan, render_json, render_text, AnalysisPass, AssistantConfig, PassStatus, RunMetrics,
    RunPlan, SequentialOrchestrator,
};

fn fake_assistant(dir: &Path, body: &str) -> String {
    let path = dir.join("assistant");
    fs::write(
        &path,
        format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 1.0; exit 0; fi\n{}\n",
            body
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn sample_project() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join("Cargo.toml"),
        "[package]\nname = \"sample\"\n",
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n").unwrap();
    fs::create_dir_all(temp.path().join("tests")).unwrap();
    fs::write(temp.path().join("tests/basic.rs"), "#[test]\nfn t() {}\n").unwrap();
    temp
}

fn keyword_pass(name: &str, keyword: &'static str, timeout: Duration) -> AnalysisPass {
    AnalysisPass::new(
        name,
        "quality",
        Box::new(move |_, _| Ok(format!("please {}", keyword))),
    )
    .with_timeout(timeout)
}

/// One run mixing a clean pass, a hang, and a prose-only response: the hang
/// is terminated and recorded, the prose pass degrades to the synthesized
/// neutral payload, and neither disturbs the passes around them.
#[tokio::test]
async fn test_mixed_run_isolates_each_failure() {
    let project = sample_project();
    let tools = tempfile::tempdir().unwrap();
    let cmd = fake_assistant(
        tools.path(),
        r#"case "$*" in
  *hang*) sleep 60 ;;
  *prose*) echo 'The code looks quite reasonable overall, nice work.' ;;
  *) echo '{"score":92,"summary":"clean","violations":[]}' ;;
esac"#,
    );

    let plan = RunPlan {
        passes: vec![
            keyword_pass("alpha", "analyze", Duration::from_secs(10)),
            keyword_pass("bravo", "hang", Duration::from_millis(500)),
            keyword_pass("charlie", "prose", Duration::from_secs(10)),
        ],
        stage_groups: vec![],
    };

    let orchestrator = SequentialOrchestrator::new(project.path(), AssistantConfig::new(&cmd));
    let mut metrics = RunMetrics::default();
    let start = Instant::now();
    let report = orchestrator.run(&plan, &mut metrics).await;

    // Execution order is the plan order
    let names: Vec<&str> = report.results.iter().map(|r| r.pass_name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);

    assert_eq!(report.results[0].status, PassStatus::Pass);
    assert_eq!(report.results[0].score, Some(92.0));

    assert_eq!(report.results[1].status, PassStatus::Fail);
    assert!(report.results[1].narrative.contains("timed out"));
    assert_eq!(report.results[1].score, Some(0.0));

    // Prose degrades to the synthesized neutral payload, an informational pass
    assert_eq!(report.results[2].status, PassStatus::Pass);
    assert_eq!(report.results[2].score, Some(50.0));

    assert_eq!(report.overall_status, PassStatus::Fail);
    assert_eq!(metrics.ai_invocations, 3);
    assert_eq!(metrics.timeouts, 1);
    assert_eq!(metrics.extractions.get("default_structure"), Some(&1));

    // The hang was killed at its own timeout, not waited out
    assert!(start.elapsed() < Duration::from_secs(30));
}

/// A crashing assistant on one pass leaves the following pass untouched;
/// the crashed pass degrades to a neutral synthesized result.
#[tokio::test]
async fn test_crash_output_degrades_and_next_pass_runs() {
    let project = sample_project();
    let tools = tempfile::tempdir().unwrap();
    let cmd = fake_assistant(
        tools.path(),
        r#"case "$*" in
  *crash*) echo 'internal error' >&2; exit 1 ;;
  *) echo '{"score":85,"violations":[]}' ;;
esac"#,
    );

    let plan = RunPlan {
        passes: vec![
            keyword_pass("crashy", "crash", Duration::from_secs(10)),
            keyword_pass("steady", "analyze", Duration::from_secs(10)),
        ],
        stage_groups: vec![],
    };

    let orchestrator = SequentialOrchestrator::new(project.path(), AssistantConfig::new(&cmd));
    let mut metrics = RunMetrics::default();
    let report = orchestrator.run(&plan, &mut metrics).await;

    // A nonzero exit with stderr text is still output: the invoker hands the
    // stderr text to extraction, which synthesizes a neutral payload
    assert_eq!(report.results[0].score, Some(50.0));
    assert_eq!(report.results[1].status, PassStatus::Pass);
    assert_eq!(report.results[1].score, Some(85.0));
}

/// The built-in catalog runs end to end against the fake assistant,
/// including the deep review stage group.
#[tokio::test]
async fn test_builtin_plan_with_deep_review() {
    let project = sample_project();
    let tools = tempfile::tempdir().unwrap();
    let cmd = fake_assistant(
        tools.path(),
        r#"echo '{"score":88,"summary":"solid","violations":[]}'"#,
    );

    let plan = build_plan(Duration::from_secs(10), true);
    assert_eq!(plan.slot_count(), 4);

    let orchestrator = SequentialOrchestrator::new(project.path(), AssistantConfig::new(&cmd));
    let mut metrics = RunMetrics::default();
    let report = orchestrator.run(&plan, &mut metrics).await;

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.overall_status, PassStatus::Pass);

    let deep = report
        .results
        .iter()
        .find(|r| r.pass_name == "deep-review")
        .unwrap();
    assert_eq!(deep.score, Some(88.0));
    assert_eq!(deep.metrics.get("stage.security"), Some(&88.0));

    // 3 single-shot passes + 4 deep stages
    assert_eq!(metrics.ai_invocations, 7);
}

/// Whole-run degradation: with no assistant binary at all, every pass is
/// served heuristically and the report still renders.
#[tokio::test]
async fn test_report_renders_after_full_fallback_run() {
    let project = sample_project();
    let orchestrator = SequentialOrchestrator::new(
        project.path(),
        AssistantConfig::new("no-such-assistant-2718"),
    );

    let plan = build_plan(Duration::from_secs(10), false);
    let mut metrics = RunMetrics::default();
    let report = orchestrator.run(&plan, &mut metrics).await;

    assert_eq!(metrics.fallback_runs, 3);
    assert_eq!(metrics.ai_invocations, 0);

    let text = render_text(&report, &metrics);
    assert!(text.contains("style-review"));
    assert!(text.contains("3 fallback(s)"));

    let json = render_json(&report, &metrics).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["metrics"]["fallbackRuns"], 3);
    assert_eq!(value["report"]["results"].as_array().unwrap().len(), 3);
}
