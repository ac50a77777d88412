//! Result Interpreter
//!
//! Maps a validated payload into a normalized `PassResult`. Every recognized
//! field has a safe default so any object-shaped payload interprets cleanly:
//! a missing score reads as 100, malformed violation entries are skipped,
//! unknown fields are ignored.

use serde_json::Value;
use tracing::debug;

use crate::extractor::ExtractedPayload;
use crate::models::{PassResult, PassStatus, Severity, Violation};

/// Score below which a pass fails. Fixed, not configurable per pass.
pub const FAIL_THRESHOLD: f64 = 70.0;

/// Interpret a payload into a `PassResult` for the named pass.
///
/// Status derivation: fail when score < 70 or any violation is present.
/// A synthesized payload (extraction gave up) is informational by design:
/// it always reads as a pass at the neutral midpoint, because a failed
/// assistant response is not a failed analysis.
pub fn interpret(
    payload: &ExtractedPayload,
    pass_name: &str,
    category: &str,
    duration_ms: u64,
) -> PassResult {
    let mut result = PassResult::new(pass_name, category);
    result.duration_ms = duration_ms;

    let score = read_score(&payload.value).unwrap_or(100.0);
    let summary = payload.value["summary"].as_str().unwrap_or("").trim();
    result.violations = read_violations(&payload.value);
    let strengths = read_string_list(&payload.value, "strengths");
    let recommendations = read_string_list(&payload.value, "recommendations");
    let category_scores = read_category_scores(&payload.value);

    for (name, value) in &category_scores {
        result.metrics.insert(format!("score.{}", name), *value);
    }
    result.metrics.insert(
        "violations.total".to_string(),
        result.violations.len() as f64,
    );

    result.narrative = build_narrative(
        score,
        summary,
        &category_scores,
        &strengths,
        &recommendations,
    );
    result.score = Some(score);

    result.status = if payload.is_synthesized() {
        // Informational, never a hard failure
        PassStatus::Pass
    } else if score < FAIL_THRESHOLD || !result.violations.is_empty() {
        PassStatus::Fail
    } else {
        PassStatus::Pass
    };

    result
}

/// Read `score` as a number or a numeric string, clamped to 0-100
fn read_score(value: &Value) -> Option<f64> {
    let raw = match &value["score"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    Some(raw.clamp(0.0, 100.0))
}

/// Read the violations array, skipping malformed entries
fn read_violations(value: &Value) -> Vec<Violation> {
    let Some(entries) = value["violations"].as_array() else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    for entry in entries {
        match read_violation(entry) {
            Some(violation) => violations.push(violation),
            None => debug!(?entry, "skipping malformed violation entry"),
        }
    }
    violations
}

/// A violation entry needs at least a severity and a message
fn read_violation(entry: &Value) -> Option<Violation> {
    let severity = Severity::parse(entry["severity"].as_str()?);
    let message = entry["message"].as_str()?.to_string();
    let file = entry["file"].as_str().unwrap_or("").to_string();
    let line = entry["line"]
        .as_u64()
        .and_then(|l| u32::try_from(l).ok())
        .or_else(|| entry["line"].as_str().and_then(|s| s.parse().ok()));
    let category = entry["type"]
        .as_str()
        .or_else(|| entry["category"].as_str())
        .map(String::from);

    Some(Violation {
        severity,
        file,
        line,
        message,
        category,
    })
}

/// Read a list of free-text entries, skipping non-strings
fn read_string_list(value: &Value, field: &str) -> Vec<String> {
    value[field]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Read the nested per-category score map, accepting both naming styles
fn read_category_scores(value: &Value) -> Vec<(String, f64)> {
    let map = value["categoryScores"]
        .as_object()
        .or_else(|| value["category_scores"].as_object());

    let Some(map) = map else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(name, raw)| {
            let score = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((name.clone(), score.clamp(0.0, 100.0)))
        })
        .collect()
}

/// Narrative: score line, summary, category compliance, strengths,
/// recommendations. Empty sections are omitted.
fn build_narrative(
    score: f64,
    summary: &str,
    category_scores: &[(String, f64)],
    strengths: &[String],
    recommendations: &[String],
) -> String {
    let mut sections: Vec<String> = vec![format!("Score: {:.0}/100", score)];

    if !summary.is_empty() {
        sections.push(summary.to_string());
    }

    if !category_scores.is_empty() {
        let mut block = String::from("Category compliance:");
        for (name, value) in category_scores {
            block.push_str(&format!("\n- {}: {:.0}", name, value));
        }
        sections.push(block);
    }

    if !strengths.is_empty() {
        let mut block = String::from("Strengths:");
        for item in strengths {
            block.push_str(&format!("\n- {}", item));
        }
        sections.push(block);
    }

    if !recommendations.is_empty() {
        let mut block = String::from("Recommendations:");
        for item in recommendations {
            block.push_str(&format!("\n- {}", item));
        }
        sections.push(block);
    }

    sections.join("\n\n")
}
