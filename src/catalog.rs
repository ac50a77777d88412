//! Built-in analysis pass catalog
//!
//! Prompt templates and pass definitions for the standard run. Every prompt
//! demands raw JSON with a fixed shape; the extractor copes when the
//! assistant ignores that instruction.

use std::path::Path;
use std::time::Duration;

use codegauge_pipeline::{aggregator, AnalysisPass, MultiStagePlan, RunPlan};

// ============================================================================
// Prompt templates
// ============================================================================

const STYLE_PROMPT: &str = r#"Review the code style and readability of the project at {path}.

{context}

Examine naming, formatting consistency, idiom usage, and comment quality.

Respond with ONLY raw JSON, no markdown fences, no prose, in this shape:
{"score": <0-100>, "summary": "<one paragraph>", "violations": [{"severity": "error|warning|info", "file": "<path>", "line": <number>, "message": "<text>"}], "strengths": ["<text>"], "recommendations": ["<text>"]}"#;

const BUG_PATTERNS_PROMPT: &str = r#"Analyze the project at {path} for likely bug patterns.

{context}

Look for error-handling gaps, unchecked boundary conditions, resource leaks, and concurrency hazards.

Respond with ONLY raw JSON, no markdown fences, no prose, in this shape:
{"score": <0-100>, "summary": "<one paragraph>", "violations": [{"severity": "error|warning|info", "file": "<path>", "line": <number>, "message": "<text>"}], "recommendations": ["<text>"]}"#;

const ARCHITECTURE_PROMPT: &str = r#"Assess the architecture of the project at {path}.

{context}

Consider module boundaries, dependency direction, layering, and coupling.

Respond with ONLY raw JSON, no markdown fences, no prose, in this shape:
{"score": <0-100>, "summary": "<one paragraph>", "violations": [{"severity": "error|warning|info", "file": "<path>", "line": <number>, "message": "<text>"}], "categoryScores": {"<aspect>": <0-100>}, "recommendations": ["<text>"]}"#;

const DEEP_QUALITY_PROMPT: &str = r#"Deep review, stage 1 of 4: code quality of the project at {path}.

{context}

Judge correctness risks, clarity, and maintainability.

Respond with ONLY raw JSON: {"score": <0-100>, "summary": "<text>", "violations": []}"#;

const DEEP_ARCHITECTURE_PROMPT: &str = r#"Deep review, stage 2 of 4: architecture of the project at {path}.

{context}

Judge module boundaries and dependency structure.

Respond with ONLY raw JSON: {"score": <0-100>, "summary": "<text>", "violations": []}"#;

const DEEP_TESTING_PROMPT: &str = r#"Deep review, stage 3 of 4: test coverage and quality of the project at {path}.

{context}

Judge test presence, depth, and the ratio of tests to behavior.

Respond with ONLY raw JSON: {"score": <0-100>, "summary": "<text>", "violations": []}"#;

const DEEP_SECURITY_PROMPT: &str = r#"Deep review, stage 4 of 4: security posture of the project at {path}.

{context}

Judge input validation, secrets handling, and unsafe constructs.

Respond with ONLY raw JSON: {"score": <0-100>, "summary": "<text>", "violations": [{"severity": "error|warning|info", "file": "<path>", "message": "<text>"}]}"#;

/// Fill a template's `{path}` and `{context}` slots
fn render(template: &'static str, path: &Path, context: &str) -> String {
    template
        .replace("{path}", &path.to_string_lossy())
        .replace("{context}", context)
}

fn pass(
    name: &str,
    category: &str,
    order: u32,
    timeout: Duration,
    template: &'static str,
) -> AnalysisPass {
    AnalysisPass::new(
        name,
        category,
        Box::new(move |path, context| Ok(render(template, path, context))),
    )
    .with_order(order)
    .with_timeout(timeout)
}

/// The standard single-shot passes, in execution order.
///
/// Single-shot passes read the whole project in one go, so they carry long
/// timeouts.
pub fn standard_passes(timeout: Duration) -> Vec<AnalysisPass> {
    vec![
        pass("style-review", "quality", 1, timeout, STYLE_PROMPT),
        pass("bug-patterns", "quality", 2, timeout, BUG_PATTERNS_PROMPT),
        pass(
            "architecture-review",
            "architecture",
            3,
            timeout,
            ARCHITECTURE_PROMPT,
        ),
    ]
}

/// The deep review group: four weighted stages folded into one result.
/// Each stage has a narrow focus, so stage timeouts are a fraction of the
/// single-shot timeout.
pub fn deep_review_group(timeout: Duration) -> MultiStagePlan {
    let stage_timeout = timeout / 2;
    let templates: [(&str, &'static str); 4] = [
        ("quality", DEEP_QUALITY_PROMPT),
        ("architecture", DEEP_ARCHITECTURE_PROMPT),
        ("testing", DEEP_TESTING_PROMPT),
        ("security", DEEP_SECURITY_PROMPT),
    ];

    let mut stages = Vec::new();
    for (order, (name, weight)) in aggregator::default_stage_weights().into_iter().enumerate() {
        let template = templates
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
            .unwrap_or(DEEP_QUALITY_PROMPT);
        stages.push((
            pass(name, name, order as u32 + 1, stage_timeout, template),
            weight,
        ));
    }

    MultiStagePlan {
        name: "deep-review".to_string(),
        category: "quality".to_string(),
        stages,
    }
}

/// Build the full run plan
pub fn build_plan(timeout: Duration, deep: bool) -> RunPlan {
    RunPlan {
        passes: standard_passes(timeout),
        stage_groups: if deep {
            vec![deep_review_group(timeout)]
        } else {
            vec![]
        },
    }
}
