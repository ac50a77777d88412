//! Report rendering
//!
//! Turns an `AggregateReport` plus run metrics into the two output shapes
//! the binary supports: a human-readable text summary and a machine-readable
//! JSON document.

use codegauge_core::CoreResult;
use codegauge_pipeline::{AggregateReport, PassStatus, RunMetrics, Severity};

/// Render the human-readable run summary
pub fn render_text(report: &AggregateReport, metrics: &RunMetrics) -> String {
    let mut out = String::new();

    out.push_str(&format!("Analysis report for {}\n", report.project_path));
    out.push_str(&format!(
        "Overall: {} ({} passed, {} failed, {} errored, {} skipped) in {:.1}s\n",
        report.overall_status,
        report.passed,
        report.failed,
        report.errored,
        report.skipped,
        report.total_duration_ms as f64 / 1000.0
    ));

    if !report.category_scores.is_empty() {
        out.push_str("\nCategory scores:\n");
        for (category, score) in &report.category_scores {
            out.push_str(&format!("  {:<14} {:>5.1}/100\n", category, score));
        }
    }

    out.push_str("\nPasses:\n");
    for result in &report.results {
        let score = result
            .score
            .map(|s| format!("{:.0}/100", s))
            .unwrap_or_else(|| "-".to_string());
        let errors = result.violation_count(Severity::Error);
        let error_note = if errors > 0 {
            format!("  {} error finding(s)", errors)
        } else {
            String::new()
        };
        out.push_str(&format!(
            "  {} {:<22} [{}] {:>7}  {:.1}s{}\n",
            result.status.glyph(),
            result.pass_name,
            result.category,
            score,
            result.duration_ms as f64 / 1000.0,
            error_note
        ));
    }

    let violations: Vec<_> = report
        .results
        .iter()
        .flat_map(|r| r.violations.iter().map(move |v| (r.pass_name.as_str(), v)))
        .collect();
    if !violations.is_empty() {
        out.push_str(&format!(
            "\nViolations ({} total, {} error-severity):\n",
            violations.len(),
            error_violation_count(report)
        ));
        for (pass_name, violation) in violations {
            let location = match violation.line {
                Some(line) => format!("{}:{}", violation.file, line),
                None if violation.file.is_empty() => "-".to_string(),
                None => violation.file.clone(),
            };
            out.push_str(&format!(
                "  [{}] {} ({}): {}\n",
                violation.severity, location, pass_name, violation.message
            ));
        }
    }

    out.push_str(&format!(
        "\nRun: {} pass(es), {} assistant call(s), {} fallback(s), {} timeout(s)\n",
        metrics.passes_run, metrics.ai_invocations, metrics.fallback_runs, metrics.timeouts
    ));
    if !metrics.extractions.is_empty() {
        let strategies: Vec<String> = metrics
            .extractions
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect();
        out.push_str(&format!("Extraction strategies: {}\n", strategies.join(", ")));
    }

    out
}

/// Render the machine-readable JSON document
pub fn render_json(report: &AggregateReport, metrics: &RunMetrics) -> CoreResult<String> {
    let document = serde_json::json!({
        "report": report,
        "metrics": metrics,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Exit code for the run: nonzero iff the report failed overall
pub fn exit_code(report: &AggregateReport) -> i32 {
    match report.overall_status {
        PassStatus::Pass | PassStatus::Skipped => 0,
        PassStatus::Fail | PassStatus::Error => 1,
    }
}

/// Count error-severity violations across the whole report
pub fn error_violation_count(report: &AggregateReport) -> usize {
    report
        .results
        .iter()
        .flat_map(|r| r.violations.iter())
        .filter(|v| v.severity == Severity::Error)
        .count()
}
