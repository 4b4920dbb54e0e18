use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The half of an acceptance criterion that was never seen before it was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionPart {
    Verification,
    Expected,
}

impl fmt::Display for CriterionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionPart::Verification => f.write_str("Verification"),
            CriterionPart::Expected => f.write_str("Expected"),
        }
    }
}

/// Malformed process or story document. Always fatal to a run.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no stories found in process file: {}", path.display())]
    EmptyProcess { path: PathBuf },

    #[error("no AC verifications found in story {story_id}: {}", path.display())]
    NoCriteria { path: PathBuf, story_id: String },

    #[error(
        "multiple Verification lines for {ac_id} (lines {first}, {second}) in {}",
        path.display()
    )]
    DuplicateVerification {
        path: PathBuf,
        ac_id: String,
        first: usize,
        second: usize,
    },

    #[error(
        "multiple Expected lines for {ac_id} (lines {first}, {second}) in {}",
        path.display()
    )]
    DuplicateExpected {
        path: PathBuf,
        ac_id: String,
        first: usize,
        second: usize,
    },

    #[error("Expected without Verification for {ac_id} (line {line}) in {}", path.display())]
    ExpectedWithoutVerification {
        path: PathBuf,
        ac_id: String,
        line: usize,
    },

    #[error("missing {missing} for {ac_id} (line {line}) in {}", path.display())]
    IncompleteCriterion {
        path: PathBuf,
        ac_id: String,
        line: usize,
        missing: CriterionPart,
    },

    #[error("empty {part} value for {ac_id} (line {line}) in {}", path.display())]
    EmptyValue {
        path: PathBuf,
        ac_id: String,
        line: usize,
        part: CriterionPart,
    },
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run `{command}` in {}: {source}", cwd.display())]
    HostExecution {
        command: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
