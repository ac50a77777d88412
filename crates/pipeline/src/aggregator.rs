//! Multi-Stage Aggregator
//!
//! Folds the results of a weighted stage group into one `PassResult`.
//! Stages that produced no usable result are excluded from both sides of
//! the weighted average, so a missing stage never craters the mean; it
//! counts against the group only through the failed-stage majority rule.

use std::collections::BTreeMap;

use crate::interpreter::FAIL_THRESHOLD;
use crate::models::{PassResult, PassStatus, Severity, Violation};

/// Default stage weights for a deep review group
pub fn default_stage_weights() -> Vec<(&'static str, f64)> {
    vec![
        ("quality", 0.4),
        ("architecture", 0.3),
        ("testing", 0.2),
        ("security", 0.1),
    ]
}

/// Combine weighted stage results into a single result.
///
/// `expected` lists every stage the group was supposed to run, with its
/// weight; `results` holds whatever actually came back, keyed by stage name.
///
/// - Score: Σ(stage score × weight) / Σ(weights of stages with a score).
/// - Violations: union over all stages, sorted by severity rank.
/// - Status: skipped stages are excluded entirely (a group whose stages all
///   skipped is itself skipped); otherwise fail when more than half the
///   expected stages failed outright (errored or absent), else fail when the
///   aggregate score is below the threshold or any error-severity violation
///   exists, else pass.
pub fn aggregate(
    name: &str,
    category: &str,
    expected: &[(String, f64)],
    results: &BTreeMap<String, PassResult>,
) -> PassResult {
    let mut result = PassResult::new(name, category);

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut failed_outright = 0usize;
    let mut skipped = 0usize;
    let mut violations: Vec<Violation> = Vec::new();
    let mut narrative_lines: Vec<String> = Vec::new();

    for (stage_name, weight) in expected {
        match results.get(stage_name) {
            Some(stage) if stage.status == PassStatus::Skipped => {
                skipped += 1;
                narrative_lines.push(format!("- {}: skipped ({})", stage_name, stage.narrative));
            }
            Some(stage) if stage.status != PassStatus::Error => {
                if let Some(score) = stage.score {
                    weighted_sum += score * weight;
                    weight_total += weight;
                    result
                        .metrics
                        .insert(format!("stage.{}", stage_name), score);
                    narrative_lines.push(format!(
                        "- {} ({}): {:.0}/100, {} violation(s)",
                        stage_name,
                        stage.status,
                        score,
                        stage.violations.len()
                    ));
                } else {
                    failed_outright += 1;
                    narrative_lines.push(format!("- {}: no score produced", stage_name));
                }
                violations.extend(stage.violations.iter().cloned());
                result.duration_ms += stage.duration_ms;
            }
            Some(stage) => {
                failed_outright += 1;
                narrative_lines.push(format!("- {}: errored ({})", stage_name, stage.narrative));
                result.duration_ms += stage.duration_ms;
            }
            None => {
                failed_outright += 1;
                narrative_lines.push(format!("- {}: did not run", stage_name));
            }
        }
    }

    if skipped == expected.len() {
        return PassResult::skipped(
            name,
            category,
            format!("All {} stage(s) skipped.", expected.len()),
        );
    }

    violations.sort_by_key(|v| v.severity.rank());
    let has_error_violation = violations.iter().any(|v| v.severity == Severity::Error);
    result.violations = violations;

    let score = if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    };
    result.score = score;

    // Skipped stages do not dilute the majority rule
    let majority_failed = failed_outright * 2 > expected.len() - skipped;
    result.status = if majority_failed {
        PassStatus::Fail
    } else {
        match score {
            Some(score) if score < FAIL_THRESHOLD => PassStatus::Fail,
            Some(_) if has_error_violation => PassStatus::Fail,
            Some(_) => PassStatus::Pass,
            None => PassStatus::Fail,
        }
    };

    result.narrative = format!(
        "Weighted aggregate over {} stage(s), {} unavailable, {} skipped. Score: {}.\n{}",
        expected.len(),
        failed_outright,
        skipped,
        score
            .map(|s| format!("{:.0}/100", s))
            .unwrap_or_else(|| "n/a".to_string()),
        narrative_lines.join("\n")
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(name: &str, score: f64) -> PassResult {
        let mut result = PassResult::new(name, "quality");
        result.score = Some(score);
        result.status = if score < FAIL_THRESHOLD {
            PassStatus::Fail
        } else {
            PassStatus::Pass
        };
        result
    }

    fn expected(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    #[test]
    fn test_missing_stage_excluded_from_both_sides() {
        // quality scored 80 at weight .4; architecture absent entirely.
        // The aggregate must be 80, not 80 × 0.4.
        let exp = expected(&[("quality", 0.4), ("architecture", 0.3)]);
        let mut results = BTreeMap::new();
        results.insert("quality".to_string(), scored("quality", 80.0));

        let folded = aggregate("deep", "quality", &exp, &results);
        assert_eq!(folded.score, Some(80.0));
    }

    #[test]
    fn test_weighted_mean_over_present_stages() {
        let exp = expected(&[("quality", 0.4), ("testing", 0.2)]);
        let mut results = BTreeMap::new();
        results.insert("quality".to_string(), scored("quality", 90.0));
        results.insert("testing".to_string(), scored("testing", 60.0));

        let folded = aggregate("deep", "quality", &exp, &results);
        // (90*.4 + 60*.2) / .6 = 80
        assert_eq!(folded.score, Some(80.0));
        assert_eq!(folded.metrics.get("stage.quality"), Some(&90.0));
    }

    #[test]
    fn test_majority_failed_stages_fail_the_group() {
        let exp = expected(&[("a", 0.4), ("b", 0.3), ("c", 0.3)]);
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), scored("a", 95.0));
        results.insert(
            "b".to_string(),
            PassResult::error("b", "quality", "boom", 5),
        );
        // c absent

        let folded = aggregate("deep", "quality", &exp, &results);
        assert_eq!(folded.status, PassStatus::Fail);
        // The one good stage still carries the score
        assert_eq!(folded.score, Some(95.0));
    }

    #[test]
    fn test_error_violation_fails_the_group() {
        let exp = expected(&[("a", 0.5), ("b", 0.5)]);
        let mut a = scored("a", 90.0);
        a.violations
            .push(Violation::new(Severity::Error, "x.rs", "hardcoded secret"));
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), a);
        results.insert("b".to_string(), scored("b", 95.0));

        let folded = aggregate("deep", "quality", &exp, &results);
        assert_eq!(folded.status, PassStatus::Fail);
        assert_eq!(folded.score, Some(92.5));
    }

    #[test]
    fn test_violations_union_sorted_by_severity() {
        let exp = expected(&[("a", 0.5), ("b", 0.5)]);
        let mut a = scored("a", 75.0);
        a.violations
            .push(Violation::new(Severity::Info, "a.rs", "nit"));
        let mut b = scored("b", 75.0);
        b.violations
            .push(Violation::new(Severity::Error, "b.rs", "bad"));
        b.violations
            .push(Violation::new(Severity::Warning, "b.rs", "meh"));
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), a);
        results.insert("b".to_string(), b);

        let folded = aggregate("deep", "quality", &exp, &results);
        let severities: Vec<Severity> =
            folded.violations.iter().map(|v| v.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Error, Severity::Warning, Severity::Info]
        );
    }

    #[test]
    fn test_skipped_stage_is_not_counted_as_failed() {
        let exp = expected(&[("a", 0.4), ("b", 0.3), ("c", 0.3)]);
        let mut results = BTreeMap::new();
        results.insert("a".to_string(), scored("a", 90.0));
        results.insert(
            "b".to_string(),
            PassResult::skipped("b", "quality", "assistant unavailable"),
        );
        results.insert(
            "c".to_string(),
            PassResult::skipped("c", "quality", "assistant unavailable"),
        );

        let folded = aggregate("deep", "quality", &exp, &results);
        assert_eq!(folded.status, PassStatus::Pass);
        assert_eq!(folded.score, Some(90.0));
        assert!(folded.narrative.contains("2 skipped"));
    }

    #[test]
    fn test_all_skipped_group_is_skipped() {
        let exp = expected(&[("a", 0.5), ("b", 0.5)]);
        let mut results = BTreeMap::new();
        for name in ["a", "b"] {
            results.insert(
                name.to_string(),
                PassResult::skipped(name, "quality", "assistant unavailable"),
            );
        }

        let folded = aggregate("deep", "quality", &exp, &results);
        assert_eq!(folded.status, PassStatus::Skipped);
        assert!(folded.score.is_none());
    }

    #[test]
    fn test_all_stages_absent_is_scoreless_failure() {
        let exp = expected(&[("a", 0.5), ("b", 0.5)]);
        let folded = aggregate("deep", "quality", &exp, &BTreeMap::new());
        assert_eq!(folded.score, None);
        assert_eq!(folded.status, PassStatus::Fail);
    }

    #[test]
    fn test_default_stage_weights_sum_to_one() {
        let total: f64 = default_stage_weights().iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
