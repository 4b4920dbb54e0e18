//! Expected-outcome classification and pass/fail evaluation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const TRUNCATION_MARKER: &str = "\n...<truncated>";

static EXIT_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn exit_code_re() -> &'static Regex {
    EXIT_CODE_RE
        .get_or_init(|| Regex::new(r"(?i)\bexit(?:\s*code|code)?\s*[:=]?\s*([0-9]+)\b").unwrap())
}

// ---------------------------------------------------------------------------
// ExpectedOutcome
// ---------------------------------------------------------------------------

/// What an `Expected:` clause asserts about a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedOutcome {
    /// The clause embeds an explicit exit code, e.g. `exit code: 2`.
    ExitCode(i32),
    /// The clause text must appear verbatim in combined output.
    Output(String),
}

impl ExpectedOutcome {
    pub fn classify(raw: &str) -> Self {
        let cleaned = raw.trim();
        let code = exit_code_re()
            .captures(cleaned)
            .and_then(|caps| caps[1].parse::<i32>().ok());
        match code {
            Some(code) => ExpectedOutcome::ExitCode(code),
            None => ExpectedOutcome::Output(cleaned.to_string()),
        }
    }

    /// `"exit"` or `"output"`, as written to reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            ExpectedOutcome::ExitCode(_) => "exit",
            ExpectedOutcome::Output(_) => "output",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExpectedOutcome::ExitCode(code) => Some(*code),
            ExpectedOutcome::Output(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ExpectedOutcome::ExitCode(_) => None,
            ExpectedOutcome::Output(text) => Some(text),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ExitCodeMismatch,
    MissingOutput,
    NonZeroExit,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Short reason, e.g. `exit=1 expected=exit code: 0`.
    pub reason: String,
}

/// Decide whether an observed run satisfies `expected`.
///
/// `raw_expected` is the clause as written and only feeds the reason text.
/// A non-zero exit fails an output expectation even when the text is present.
pub fn evaluate(
    expected: &ExpectedOutcome,
    raw_expected: &str,
    exit_code: i32,
    output: &str,
) -> Option<Failure> {
    match expected {
        ExpectedOutcome::ExitCode(want) if exit_code != *want => Some(Failure {
            kind: FailureKind::ExitCodeMismatch,
            reason: format!("exit={exit_code} expected={}", raw_expected.trim()),
        }),
        ExpectedOutcome::ExitCode(_) => None,
        ExpectedOutcome::Output(text) => {
            let text = text.trim();
            if !text.is_empty() && !output.contains(text) {
                return Some(Failure {
                    kind: FailureKind::MissingOutput,
                    reason: format!("missing expected output: {text}"),
                });
            }
            if exit_code != 0 {
                return Some(Failure {
                    kind: FailureKind::NonZeroExit,
                    reason: format!("exit={exit_code} expected={}", raw_expected.trim()),
                });
            }
            None
        }
    }
}

/// Trim `output` and cap it at `limit` characters, marking truncation.
pub fn snippet(output: &str, limit: usize) -> String {
    let trimmed = output.trim();
    match trimmed.char_indices().nth(limit) {
        None => trimmed.to_string(),
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &trimmed[..cut]),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_exit_code_forms() {
        for (raw, code) in [
            ("exit code: 2", 2),
            ("Exit Code 0", 0),
            ("exit 1", 1),
            ("exitcode=3", 3),
            ("command succeeds (exit code: 0)", 0),
        ] {
            assert_eq!(
                ExpectedOutcome::classify(raw),
                ExpectedOutcome::ExitCode(code),
                "{raw}"
            );
        }
    }

    #[test]
    fn classifies_output_text() {
        assert_eq!(
            ExpectedOutcome::classify("  hello world "),
            ExpectedOutcome::Output("hello world".to_string())
        );
        assert_eq!(
            ExpectedOutcome::classify("exited cleanly"),
            ExpectedOutcome::Output("exited cleanly".to_string())
        );
    }

    #[test]
    fn type_name_and_accessors() {
        let exit = ExpectedOutcome::ExitCode(2);
        assert_eq!(exit.type_name(), "exit");
        assert_eq!(exit.exit_code(), Some(2));
        assert_eq!(exit.text(), None);

        let out = ExpectedOutcome::Output("ok".to_string());
        assert_eq!(out.type_name(), "output");
        assert_eq!(out.exit_code(), None);
        assert_eq!(out.text(), Some("ok"));
    }

    #[test]
    fn exit_code_match_passes() {
        let expected = ExpectedOutcome::classify("exit code: 2");
        assert_eq!(evaluate(&expected, "exit code: 2", 2, ""), None);
    }

    #[test]
    fn exit_code_mismatch_fails() {
        let expected = ExpectedOutcome::classify("exit code: 2");
        let failure = evaluate(&expected, "exit code: 2", 0, "").unwrap();
        assert_eq!(failure.kind, FailureKind::ExitCodeMismatch);
        assert_eq!(failure.reason, "exit=0 expected=exit code: 2");
    }

    #[test]
    fn output_substring_present_passes() {
        let expected = ExpectedOutcome::classify("hello");
        assert_eq!(evaluate(&expected, "hello", 0, "say hello\n"), None);
    }

    #[test]
    fn output_substring_missing_fails() {
        let expected = ExpectedOutcome::classify("goodbye");
        let failure = evaluate(&expected, "goodbye", 0, "hello\n").unwrap();
        assert_eq!(failure.kind, FailureKind::MissingOutput);
        assert_eq!(failure.reason, "missing expected output: goodbye");
    }

    #[test]
    fn output_present_but_non_zero_exit_fails() {
        let expected = ExpectedOutcome::classify("hello");
        let failure = evaluate(&expected, "hello", 3, "hello\n").unwrap();
        assert_eq!(failure.kind, FailureKind::NonZeroExit);
        assert_eq!(failure.reason, "exit=3 expected=hello");
    }

    #[test]
    fn empty_output_expectation_asserts_only_completion() {
        let expected = ExpectedOutcome::Output("   ".to_string());
        assert_eq!(evaluate(&expected, "", 0, "anything"), None);
        let failure = evaluate(&expected, "", 1, "").unwrap();
        assert_eq!(failure.kind, FailureKind::NonZeroExit);
    }

    #[test]
    fn snippet_at_cap_is_verbatim() {
        let output = "x".repeat(2000);
        let s = snippet(&output, 2000);
        assert_eq!(s, output);
        assert!(!s.contains("<truncated>"));
    }

    #[test]
    fn snippet_one_past_cap_is_truncated() {
        let output = "y".repeat(2001);
        let s = snippet(&output, 2000);
        assert_eq!(s, format!("{}{TRUNCATION_MARKER}", "y".repeat(2000)));
    }

    #[test]
    fn snippet_counts_characters_not_bytes() {
        let output = "é".repeat(5);
        assert_eq!(snippet(&output, 5), output);
        assert_eq!(snippet(&output, 3), format!("ééé{TRUNCATION_MARKER}"));
    }

    #[test]
    fn snippet_trims_surrounding_whitespace() {
        assert_eq!(snippet("\n  hello \n\n", 100), "hello");
    }
}
