//! Run results and their JSON form.

use crate::error::Result;
use crate::expected::FailureKind;
use crate::io::atomic_write;
use crate::story::AcceptanceCriterion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const TOOL_NAME: &str = "story-runner";

pub const EXIT_PASSED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_STRUCTURAL: i32 = 2;

// ---------------------------------------------------------------------------
// VerificationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub story_id: String,
    pub ac_id: String,
    pub command: String,
    pub expected: String,
    /// `"exit"` or `"output"`.
    pub expected_type: String,
    pub expected_exit_code: Option<i32>,
    pub expected_text: Option<String>,
    pub cwd: String,
    pub exit_code: i32,
    pub output_snippet: String,
    pub ok: bool,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub duration_ms: u64,
}

impl VerificationResult {
    /// A result for `criterion` with the outcome fields left for the engine.
    pub fn for_criterion(criterion: &AcceptanceCriterion, exit_code: i32, snippet: String) -> Self {
        let outcome = criterion.outcome();
        Self {
            story_id: criterion.story_id().to_string(),
            ac_id: criterion.ac_id().to_string(),
            command: criterion.command().to_string(),
            expected: criterion.expected().to_string(),
            expected_type: outcome.type_name().to_string(),
            expected_exit_code: outcome.exit_code(),
            expected_text: outcome.text().map(str::to_string),
            cwd: criterion.working_directory().display().to_string(),
            exit_code,
            output_snippet: snippet,
            ok: true,
            error: None,
            failure_kind: None,
            duration_ms: 0,
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.story_id, self.ac_id)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub tool: String,
    pub repo_root: String,
    pub process: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<VerificationResult>,
    pub failures: Vec<String>,
    pub exit_code: i32,
}

impl Report {
    pub fn new(
        repo_root: &Path,
        process: &Path,
        results: Vec<VerificationResult>,
        failures: Vec<String>,
    ) -> Self {
        let exit_code = if results.iter().all(|r| r.ok) {
            EXIT_PASSED
        } else {
            EXIT_FAILED
        };
        Self {
            tool: TOOL_NAME.to_string(),
            repo_root: repo_root.display().to_string(),
            process: process.display().to_string(),
            generated_at: Utc::now(),
            results,
            failures,
            exit_code,
        }
    }

    pub fn passed(&self) -> bool {
        self.exit_code == EXIT_PASSED
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }

    /// Human-readable summary: "3/4 passed, 1 failed"
    pub fn summary(&self) -> String {
        format!(
            "{}/{} passed, {} failed",
            self.passed_count(),
            self.results.len(),
            self.failed_count()
        )
    }
}

/// Written instead of a [`Report`] when no execution plan could be built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub tool: String,
    pub repo_root: String,
    pub process: String,
    pub error: String,
    pub exit_code: i32,
}

impl ErrorReport {
    pub fn new(repo_root: &Path, process: &Path, error: impl Into<String>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            repo_root: repo_root.display().to_string(),
            process: process.display().to_string(),
            error: error.into(),
            exit_code: EXIT_STRUCTURAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Serialize `document` as pretty JSON and write it atomically to `dest`.
pub fn write<T: Serialize>(document: &T, dest: &Path) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(document)?;
    data.push(b'\n');
    atomic_write(dest, &data)?;
    tracing::debug!(path = %dest.display(), "wrote report");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
