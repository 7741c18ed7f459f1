//! Best-effort parsing of static-analysis, test and coverage tool output.
//!
//! Each chain is an ordered list of named extractors. The first extractor that
//! recognizes the output wins, even when a later one would also match: an ESLint
//! summary line is trusted over the generic "N errors" scan of the same text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::models::IssueCounts;

/// A named extractor in a fallback chain
pub struct OutputPattern<T> {
    pub name: &'static str,
    pub extract: fn(&str) -> Option<T>,
}

/// Run a chain in priority order and return the first match with its pattern name.
pub fn first_match<T>(chain: &[OutputPattern<T>], output: &str) -> Option<(&'static str, T)> {
    chain
        .iter()
        .find_map(|pattern| (pattern.extract)(output).map(|value| (pattern.name, value)))
}

/// Pass/fail counts recovered from a test run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounts {
    pub passed: u32,
    pub failed: u32,
}

impl TestCounts {
    pub const fn total(self) -> u32 {
        self.passed.saturating_add(self.failed)
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid output pattern regex")
}

/// Count from captured digits; values beyond `u32::MAX` saturate.
fn parse_u32(text: &str) -> u32 {
    match text.parse::<u64>() {
        Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
        Err(_) if text.bytes().all(|b| b.is_ascii_digit()) => u32::MAX,
        Err(_) => 0,
    }
}

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Value of group 1 in the last match of `re`.
fn last_count(re: &Regex, output: &str) -> Option<u32> {
    re.captures_iter(output)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| parse_u32(m.as_str()))
}

/// Sum of group 1 over every match of `re`.
fn sum_counts(re: &Regex, output: &str) -> Option<u32> {
    let mut matched = false;
    let total = re
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .inspect(|_| matched = true)
        .map(|m| parse_u32(m.as_str()))
        .fold(0u32, u32::saturating_add);
    matched.then_some(total)
}

// ---------------------------------------------------------------------------
// Static analysis
// ---------------------------------------------------------------------------

static ESLINT_SUMMARY: Lazy<Regex> =
    Lazy::new(|| regex(r"✖\s+\d+\s+problems?\s+\((\d+)\s+errors?,\s+(\d+)\s+warnings?\)"));
static FOUND_N_ERRORS: Lazy<Regex> = Lazy::new(|| regex(r"\bFound (\d+) errors?\b"));
static CARGO_ERRORS: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)^error: could not compile .*?due to (\d+) previous errors?"));
static CARGO_WARNINGS: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)^warning: .*? generated (\d+) warnings?"));
static GENERIC_ERRORS: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\b(\d+)\s+errors?\b"));
static GENERIC_WARNINGS: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\b(\d+)\s+warnings?\b"));
static ERROR_MARKER: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?m)(^\S+:\d+(?::\d+)?:?\s*(?:fatal )?error\b|^error\[E\d+\]|\berror TS\d+:|^\S+:\d+:\d+: [EF]\d{3}\b)")
});
static WARNING_MARKER: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)(^\S+:\d+(?::\d+)?:?\s*warning\b|^\S+:\d+:\d+: W\d{3}\b)"));

fn eslint_summary(output: &str) -> Option<IssueCounts> {
    let caps = ESLINT_SUMMARY.captures_iter(output).last()?;
    Some(IssueCounts {
        errors: parse_u32(&caps[1]),
        warnings: parse_u32(&caps[2]),
    })
}

fn found_n_errors(output: &str) -> Option<IssueCounts> {
    last_count(&FOUND_N_ERRORS, output).map(|errors| IssueCounts { errors, warnings: 0 })
}

fn cargo_summary(output: &str) -> Option<IssueCounts> {
    let errors = sum_counts(&CARGO_ERRORS, output);
    let warnings = sum_counts(&CARGO_WARNINGS, output);
    if errors.is_none() && warnings.is_none() {
        return None;
    }
    Some(IssueCounts {
        errors: errors.unwrap_or(0),
        warnings: warnings.unwrap_or(0),
    })
}

fn generic_errors_warnings(output: &str) -> Option<IssueCounts> {
    let errors = last_count(&GENERIC_ERRORS, output);
    let warnings = last_count(&GENERIC_WARNINGS, output);
    if errors.is_none() && warnings.is_none() {
        return None;
    }
    Some(IssueCounts {
        errors: errors.unwrap_or(0),
        warnings: warnings.unwrap_or(0),
    })
}

fn language_markers(output: &str) -> Option<IssueCounts> {
    let errors = saturating_count(ERROR_MARKER.find_iter(output).count());
    let warnings = saturating_count(WARNING_MARKER.find_iter(output).count());
    (errors.saturating_add(warnings) > 0).then_some(IssueCounts { errors, warnings })
}

fn line_heuristic(output: &str) -> Option<IssueCounts> {
    let mut counts = IssueCounts::default();
    for line in output.lines() {
        let trimmed = line.trim_start().to_lowercase();
        if trimmed.starts_with("error") {
            counts.errors = counts.errors.saturating_add(1);
        } else if trimmed.starts_with("warning") {
            counts.warnings = counts.warnings.saturating_add(1);
        }
    }
    (counts.errors.saturating_add(counts.warnings) > 0).then_some(counts)
}

/// Error/warning extraction, in priority order
pub static ISSUE_PATTERNS: &[OutputPattern<IssueCounts>] = &[
    OutputPattern { name: "eslint-summary", extract: eslint_summary },
    OutputPattern { name: "found-n-errors", extract: found_n_errors },
    OutputPattern { name: "cargo-summary", extract: cargo_summary },
    OutputPattern { name: "generic-errors-warnings", extract: generic_errors_warnings },
    OutputPattern { name: "language-markers", extract: language_markers },
    OutputPattern { name: "line-heuristic", extract: line_heuristic },
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

static JEST_SUMMARY: Lazy<Regex> = Lazy::new(|| regex(r"(?m)^Tests:\s+(.*\btotal)\s*$"));
static CARGO_TEST_RESULT: Lazy<Regex> =
    Lazy::new(|| regex(r"test result: \w+\. (\d+) passed; (\d+) failed"));
static PASSED: Lazy<Regex> = Lazy::new(|| regex(r"\b(\d+) passed\b"));
static FAILED: Lazy<Regex> = Lazy::new(|| regex(r"\b(\d+) failed\b"));
static PASSING: Lazy<Regex> = Lazy::new(|| regex(r"\b(\d+) passing\b"));
static FAILING: Lazy<Regex> = Lazy::new(|| regex(r"\b(\d+) failing\b"));
static TAP_OK: Lazy<Regex> = Lazy::new(|| regex(r"(?m)^ok \d+"));
static TAP_NOT_OK: Lazy<Regex> = Lazy::new(|| regex(r"(?m)^not ok \d+"));

fn jest_summary(output: &str) -> Option<TestCounts> {
    let caps = JEST_SUMMARY.captures_iter(output).last()?;
    let line = caps.get(1)?.as_str();
    Some(TestCounts {
        passed: last_count(&PASSED, line).unwrap_or(0),
        failed: last_count(&FAILED, line).unwrap_or(0),
    })
}

fn cargo_test_summary(output: &str) -> Option<TestCounts> {
    let mut matched = false;
    let mut counts = TestCounts::default();
    for caps in CARGO_TEST_RESULT.captures_iter(output) {
        matched = true;
        counts.passed = counts.passed.saturating_add(parse_u32(&caps[1]));
        counts.failed = counts.failed.saturating_add(parse_u32(&caps[2]));
    }
    matched.then_some(counts)
}

fn passed_failed_summary(output: &str) -> Option<TestCounts> {
    let passed = last_count(&PASSED, output);
    let failed = last_count(&FAILED, output);
    if passed.is_none() && failed.is_none() {
        return None;
    }
    Some(TestCounts {
        passed: passed.unwrap_or(0),
        failed: failed.unwrap_or(0),
    })
}

fn mocha_summary(output: &str) -> Option<TestCounts> {
    let passed = last_count(&PASSING, output);
    let failed = last_count(&FAILING, output);
    if passed.is_none() && failed.is_none() {
        return None;
    }
    Some(TestCounts {
        passed: passed.unwrap_or(0),
        failed: failed.unwrap_or(0),
    })
}

fn tap(output: &str) -> Option<TestCounts> {
    let counts = TestCounts {
        passed: saturating_count(TAP_OK.find_iter(output).count()),
        failed: saturating_count(TAP_NOT_OK.find_iter(output).count()),
    };
    (counts.total() > 0).then_some(counts)
}

/// Name reported when no text pattern matched and only the exit code was used
pub const EXIT_CODE_PATTERN: &str = "exit-code";

/// Pass/fail extraction, in priority order. When none match, callers fall back
/// to the exit code ([`EXIT_CODE_PATTERN`]).
pub static TEST_PATTERNS: &[OutputPattern<TestCounts>] = &[
    OutputPattern { name: "jest-summary", extract: jest_summary },
    OutputPattern { name: "cargo-test-summary", extract: cargo_test_summary },
    OutputPattern { name: "passed-failed-summary", extract: passed_failed_summary },
    OutputPattern { name: "mocha-summary", extract: mocha_summary },
    OutputPattern { name: "tap", extract: tap },
];

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

static ISTANBUL_ALL_FILES: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)^\s*All files\s*\|\s*(\d+(?:\.\d+)?)"));
static STATEMENTS_LINE: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)^\s*Statements\s*:\s*(\d+(?:\.\d+)?)%"));
static PYTEST_COV_TOTAL: Lazy<Regex> =
    Lazy::new(|| regex(r"(?m)^TOTAL\s+.*?(\d+(?:\.\d+)?)%\s*$"));
static TARPAULIN: Lazy<Regex> = Lazy::new(|| regex(r"(\d+(?:\.\d+)?)% coverage,"));
static GENERIC_COVERAGE: Lazy<Regex> =
    Lazy::new(|| regex(r"(?i)coverage[^\d\n]*?(\d+(?:\.\d+)?)\s*%"));

fn last_percent(re: &Regex, output: &str) -> Option<f64> {
    re.captures_iter(output)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|p| p.clamp(0.0, 100.0))
}

fn istanbul_all_files(output: &str) -> Option<f64> {
    last_percent(&ISTANBUL_ALL_FILES, output)
}

fn statements_line(output: &str) -> Option<f64> {
    last_percent(&STATEMENTS_LINE, output)
}

fn pytest_cov_total(output: &str) -> Option<f64> {
    last_percent(&PYTEST_COV_TOTAL, output)
}

fn tarpaulin(output: &str) -> Option<f64> {
    last_percent(&TARPAULIN, output)
}

fn generic_coverage(output: &str) -> Option<f64> {
    last_percent(&GENERIC_COVERAGE, output)
}

/// Coverage percentage extraction, in priority order
pub static COVERAGE_PATTERNS: &[OutputPattern<f64>] = &[
    OutputPattern { name: "istanbul-all-files", extract: istanbul_all_files },
    OutputPattern { name: "statements-line", extract: statements_line },
    OutputPattern { name: "pytest-cov-total", extract: pytest_cov_total },
    OutputPattern { name: "tarpaulin", extract: tarpaulin },
    OutputPattern { name: "generic-coverage", extract: generic_coverage },
];
