//! Fallback Heuristic Analyzer
//!
//! Produces a `PassResult` from static project-structure signals when the
//! assistant cannot be used: pre-flight failed, the invocation itself
//! errored, or the process completed with empty output. When partial raw
//! text exists (process ran but nothing was extractable), a keyword scan
//! nudges the structural score and any numeric score salvaged from the text
//! is blended in at a fixed 70/30 structural/textual weighting.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ignore::WalkBuilder;
use regex::Regex;
use tracing::debug;

use crate::interpreter::FAIL_THRESHOLD;
use crate::models::{PassResult, PassStatus, Severity, Violation};

/// Base score every project starts from
const BASE_SCORE: f64 = 40.0;
/// Bonus for having any source files at all
const SOURCE_PRESENCE_BONUS: f64 = 10.0;
/// Cap on the test-ratio bonus
const TEST_RATIO_BONUS_CAP: f64 = 15.0;
/// Bonus for a build descriptor / guide document
const DESCRIPTOR_BONUS: f64 = 5.0;
/// Bonus for reasonable (neither flat nor cavernous) nesting
const NESTING_BONUS: f64 = 5.0;
/// Structural weight in the structural/textual score blend
const STRUCTURAL_WEIGHT: f64 = 0.7;

/// Source file extensions the census recognizes
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "ts", "tsx", "js", "jsx", "go", "java", "kt", "rb", "c", "cc", "cpp", "h", "hpp",
    "cs", "swift", "scala",
];

/// Build descriptors that mark a configured project
const BUILD_DESCRIPTORS: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "Makefile",
];

/// Project guide documents
const GUIDE_DOCUMENTS: &[&str] = &["README.md", "README.rst", "CONTRIBUTING.md", "AGENTS.md", "CLAUDE.md"];

const POSITIVE_KEYWORDS: &[&str] = &[
    "good",
    "excellent",
    "clean",
    "well-structured",
    "well structured",
    "solid",
    "robust",
    "maintainable",
    "idiomatic",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bug",
    "error",
    "broken",
    "vulnerab",
    "missing",
    "poor",
    "smell",
    "duplicat",
    "unsafe",
    "fragile",
];

const SUGGESTION_KEYWORDS: &[&str] = &[
    "should",
    "consider",
    "recommend",
    "improve",
    "refactor",
    "suggest",
];

/// Static structure signals gathered by one walk of the project tree
#[derive(Debug, Clone, Default)]
pub struct StructureSignals {
    /// Count of recognized source files
    pub source_files: usize,
    /// Count of files that look like tests
    pub test_files: usize,
    /// A build descriptor exists at the project root
    pub has_build_descriptor: bool,
    /// A guide document exists at the project root
    pub has_guide_document: bool,
    /// Deepest directory level holding a source file
    pub max_nesting_depth: usize,
}

impl StructureSignals {
    /// Test files per source file, zero when there are no sources
    pub fn test_ratio(&self) -> f64 {
        if self.source_files == 0 {
            0.0
        } else {
            self.test_files as f64 / self.source_files as f64
        }
    }
}

/// Heuristic non-AI analyzer over a project tree
pub struct FallbackAnalyzer {
    project_path: PathBuf,
}

impl FallbackAnalyzer {
    /// Create an analyzer for the given project root
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Produce a heuristic `PassResult` for the named pass.
    ///
    /// `salvaged_text` is whatever raw output the assistant produced before
    /// extraction gave up; `None` when the assistant never ran or produced
    /// nothing.
    pub fn analyze_structure(
        &self,
        pass_name: &str,
        category: &str,
        salvaged_text: Option<&str>,
    ) -> PassResult {
        let start = Instant::now();
        let signals = self.collect_signals();
        let structural = structural_score(&signals);

        let (score, text_note) = match salvaged_text {
            Some(text) if !text.trim().is_empty() => {
                let nudged = apply_keyword_nudge(structural, text);
                match salvage_numeric_score(text) {
                    Some(textual) => {
                        let blended =
                            STRUCTURAL_WEIGHT * nudged + (1.0 - STRUCTURAL_WEIGHT) * textual;
                        (
                            blended.clamp(0.0, 100.0),
                            format!(
                                " Partial assistant output was salvaged (textual score {:.0} blended at {:.0}%).",
                                textual,
                                (1.0 - STRUCTURAL_WEIGHT) * 100.0
                            ),
                        )
                    }
                    None => (nudged, " Partial assistant output informed the score.".to_string()),
                }
            }
            _ => (structural, String::new()),
        };

        let mut result = PassResult::new(pass_name, category);
        result.score = Some(score);
        result.violations = fundamentals_violations(&signals);
        // Advisory census findings: status comes from the score alone here,
        // unlike AI-interpreted results
        result.status = if score < FAIL_THRESHOLD {
            PassStatus::Fail
        } else {
            PassStatus::Pass
        };
        result.duration_ms = start.elapsed().as_millis() as u64;

        result
            .metrics
            .insert("files.source".to_string(), signals.source_files as f64);
        result
            .metrics
            .insert("files.test".to_string(), signals.test_files as f64);
        result
            .metrics
            .insert("files.testRatio".to_string(), signals.test_ratio());
        result.metrics.insert(
            "structure.nestingDepth".to_string(),
            signals.max_nesting_depth as f64,
        );

        result.narrative = format!(
            "Heuristic structural analysis (assistant unavailable or output unusable). \
             Score: {:.0}/100. {} source files, {} test files (ratio {:.2}), \
             build descriptor: {}, guide document: {}, nesting depth: {}.{}",
            score,
            signals.source_files,
            signals.test_files,
            signals.test_ratio(),
            if signals.has_build_descriptor { "yes" } else { "no" },
            if signals.has_guide_document { "yes" } else { "no" },
            signals.max_nesting_depth,
            text_note,
        );

        debug!(
            pass_name,
            score,
            source_files = signals.source_files,
            test_files = signals.test_files,
            "fallback analysis complete"
        );
        result
    }

    /// One gitignore-aware walk collecting every structural signal
    fn collect_signals(&self) -> StructureSignals {
        let mut signals = StructureSignals::default();

        signals.has_build_descriptor = BUILD_DESCRIPTORS
            .iter()
            .any(|name| self.project_path.join(name).exists());
        signals.has_guide_document = GUIDE_DOCUMENTS
            .iter()
            .any(|name| self.project_path.join(name).exists());

        let walker = WalkBuilder::new(&self.project_path).build();
        for entry in walker.flatten() {
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !SOURCE_EXTENSIONS.contains(&extension) {
                continue;
            }

            let relative = path.strip_prefix(&self.project_path).unwrap_or(path);
            let depth = relative.components().count().saturating_sub(1);
            signals.max_nesting_depth = signals.max_nesting_depth.max(depth);

            if is_test_file(relative) {
                signals.test_files += 1;
            } else {
                signals.source_files += 1;
            }
        }

        signals
    }
}

/// Is this path a test file by location or naming convention?
fn is_test_file(relative: &Path) -> bool {
    let in_test_dir = relative.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("test") | Some("tests") | Some("spec") | Some("__tests__")
        )
    });
    if in_test_dir {
        return true;
    }

    let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    lower.starts_with("test_")
        || lower.contains("_test.")
        || lower.contains(".test.")
        || lower.contains(".spec.")
}

/// Additive structural score: base floor plus bonuses
fn structural_score(signals: &StructureSignals) -> f64 {
    let mut score = BASE_SCORE;

    if signals.source_files > 0 {
        score += SOURCE_PRESENCE_BONUS;
    }
    // Tiered file-count buckets
    if signals.source_files >= 10 {
        score += 3.0;
    }
    if signals.source_files >= 50 {
        score += 5.0;
    }
    // Test-to-source ratio, capped
    score += (signals.test_ratio() * 30.0).min(TEST_RATIO_BONUS_CAP);

    if signals.has_build_descriptor {
        score += DESCRIPTOR_BONUS;
    }
    if signals.has_guide_document {
        score += DESCRIPTOR_BONUS;
    }
    // Neither flat nor excessively deep
    if (2..=6).contains(&signals.max_nesting_depth) {
        score += NESTING_BONUS;
    }

    score.clamp(0.0, 100.0)
}

/// Count occurrences of the keyword families and nudge the score
fn apply_keyword_nudge(score: f64, text: &str) -> f64 {
    let lower = text.to_lowercase();
    let count = |keywords: &[&str]| -> f64 {
        keywords
            .iter()
            .map(|k| lower.matches(k).count())
            .sum::<usize>() as f64
    };

    let positive = count(POSITIVE_KEYWORDS).min(10.0);
    let negative = count(NEGATIVE_KEYWORDS).min(10.0);
    let suggestions = count(SUGGESTION_KEYWORDS).min(5.0);

    (score + positive - 2.0 * negative - suggestions).clamp(0.0, 100.0)
}

/// Salvage a numeric score from free text: `score: 85`, `"score" = 85`,
/// or `85/100` shapes.
fn salvage_numeric_score(text: &str) -> Option<f64> {
    let labeled = Regex::new(r#"(?i)"?score"?\s*[:=]\s*"?(\d{1,3})"#).ok()?;
    if let Some(captures) = labeled.captures(text) {
        if let Ok(value) = captures[1].parse::<f64>() {
            if value <= 100.0 {
                return Some(value);
            }
        }
    }

    let out_of_hundred = Regex::new(r"(\d{1,3})\s*/\s*100").ok()?;
    if let Some(captures) = out_of_hundred.captures(text) {
        if let Ok(value) = captures[1].parse::<f64>() {
            if value <= 100.0 {
                return Some(value);
            }
        }
    }

    None
}

/// Violations for clearly missing fundamentals, so a fallback result is
/// never purely cosmetic
fn fundamentals_violations(signals: &StructureSignals) -> Vec<Violation> {
    let mut violations = Vec::new();

    if signals.source_files == 0 {
        violations.push(
            Violation::new(Severity::Error, "", "No source files found in project")
                .with_category("structure"),
        );
    }
    if signals.test_files == 0 {
        violations.push(
            Violation::new(Severity::Warning, "", "No test files found")
                .with_category("testing"),
        );
    }
    if !signals.has_build_descriptor {
        violations.push(
            Violation::new(Severity::Warning, "", "No build descriptor found")
                .with_category("structure"),
        );
    }
    if signals.source_files > 0 && signals.test_files > 0 && signals.test_ratio() < 0.2 {
        violations.push(
            Violation::new(
                Severity::Info,
                "",
                format!("Low test-to-source ratio ({:.2})", signals.test_ratio()),
            )
            .with_category("testing"),
        );
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn empty_project() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn small_project() -> TempDir {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("Cargo.toml"), "[package]\nname = \"x\"").unwrap();
        fs::write(temp.path().join("README.md"), "# x").unwrap();
        fs::create_dir_all(temp.path().join("src/inner")).unwrap();
        fs::write(temp.path().join("src/lib.rs"), "pub fn a() {}").unwrap();
        fs::write(temp.path().join("src/inner/b.rs"), "pub fn b() {}").unwrap();
        fs::create_dir_all(temp.path().join("tests")).unwrap();
        fs::write(temp.path().join("tests/a.rs"), "#[test] fn t() {}").unwrap();
        temp
    }

    #[test]
    fn test_fallback_floor_on_empty_project() {
        let temp = empty_project();
        let analyzer = FallbackAnalyzer::new(temp.path());
        let result = analyzer.analyze_structure("deep", "quality", None);

        let score = result.score.unwrap();
        assert!(score <= 60.0, "empty project scored {}", score);
        assert_eq!(result.status, PassStatus::Fail);
        assert!(result
            .violations
            .iter()
            .any(|v| v.severity == Severity::Error && v.message.contains("No source files")));
    }

    #[test]
    fn test_structured_project_scores_higher() {
        let empty = empty_project();
        let small = small_project();
        let low = FallbackAnalyzer::new(empty.path())
            .analyze_structure("p", "c", None)
            .score
            .unwrap();
        let high = FallbackAnalyzer::new(small.path())
            .analyze_structure("p", "c", None)
            .score
            .unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_signals_census() {
        let temp = small_project();
        let analyzer = FallbackAnalyzer::new(temp.path());
        let signals = analyzer.collect_signals();
        assert_eq!(signals.source_files, 2);
        assert_eq!(signals.test_files, 1);
        assert!(signals.has_build_descriptor);
        assert!(signals.has_guide_document);
        assert_eq!(signals.max_nesting_depth, 2);
    }

    #[test]
    fn test_advisory_violations_do_not_fail_a_decent_score() {
        let temp = small_project();
        let result = FallbackAnalyzer::new(temp.path()).analyze_structure("p", "c", None);
        // Ratio is 0.5 so the score lands above the threshold despite any
        // advisory findings
        assert_eq!(result.status, PassStatus::Pass, "score {:?}", result.score);
    }

    #[test]
    fn test_keyword_nudge_direction() {
        let base = 70.0;
        let up = apply_keyword_nudge(base, "clean, solid, robust work");
        let down = apply_keyword_nudge(base, "bug bug broken unsafe poor");
        assert!(up > base);
        assert!(down < base);
    }

    #[test]
    fn test_salvage_numeric_score_shapes() {
        assert_eq!(salvage_numeric_score("overall score: 85 here"), Some(85.0));
        assert_eq!(salvage_numeric_score("\"score\" = 60"), Some(60.0));
        assert_eq!(salvage_numeric_score("I'd rate this 72/100"), Some(72.0));
        assert_eq!(salvage_numeric_score("no numbers of note"), None);
        assert_eq!(salvage_numeric_score("score: 999"), None);
    }

    #[test]
    fn test_textual_blend_moves_score_toward_salvaged_value() {
        let temp = small_project();
        let analyzer = FallbackAnalyzer::new(temp.path());
        let pure = analyzer.analyze_structure("p", "c", None).score.unwrap();
        let blended = analyzer
            .analyze_structure("p", "c", Some("the work rates 20/100 overall"))
            .score
            .unwrap();
        assert!(blended < pure);
    }

    #[test]
    fn test_test_file_detection() {
        assert!(is_test_file(Path::new("tests/it.rs")));
        assert!(is_test_file(Path::new("src/__tests__/x.ts")));
        assert!(is_test_file(Path::new("pkg/handler_test.go")));
        assert!(is_test_file(Path::new("test_util.py")));
        assert!(is_test_file(Path::new("app/button.spec.tsx")));
        assert!(!is_test_file(Path::new("src/main.rs")));
        assert!(!is_test_file(Path::new("src/attested.rs")));
    }
}
