//! Story documents: acceptance criteria bound to verification commands.
//!
//! Three line families matter; everything else is prose:
//!
//! ```text
//! - **AC1**: The tool prints a greeting
//!   - **Verification (cwd=tools/greeter)**: `./greet`
//!   - **Expected**: `hello`
//! ```
//!
//! [`classify_line`] recognises a line; [`StoryScanner`] decides what it means
//! given the criterion in progress.

use crate::error::{CriterionPart, ParseError, Result};
use crate::expected::ExpectedOutcome;
use crate::io::read_document;
use crate::paths::resolve_cwd;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// AcceptanceCriterion
// ---------------------------------------------------------------------------

/// One fully parsed criterion. Only the scanner constructs these, and only
/// once both a command and an expected clause have been captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceCriterion {
    story_id: String,
    ac_id: String,
    command: String,
    working_directory: PathBuf,
    expected: String,
    outcome: ExpectedOutcome,
    line: usize,
}

impl AcceptanceCriterion {
    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    pub fn ac_id(&self) -> &str {
        &self.ac_id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The expected clause as written, backticks removed.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn outcome(&self) -> &ExpectedOutcome {
        &self.outcome
    }

    /// Line of the AC header in the story document.
    pub fn line(&self) -> usize {
        self.line
    }

    /// `"<story_id> <ac_id>"`, the prefix of every progress line.
    pub fn label(&self) -> String {
        format!("{} {}", self.story_id, self.ac_id)
    }
}

// ---------------------------------------------------------------------------
// Line recognition
// ---------------------------------------------------------------------------

static AC_RE: OnceLock<Regex> = OnceLock::new();
static VERIFICATION_CWD_RE: OnceLock<Regex> = OnceLock::new();
static VERIFICATION_REPO_RE: OnceLock<Regex> = OnceLock::new();
static VERIFICATION_RE: OnceLock<Regex> = OnceLock::new();
static EXPECTED_RE: OnceLock<Regex> = OnceLock::new();

fn ac_re() -> &'static Regex {
    AC_RE.get_or_init(|| Regex::new(r"^\s*-\s+\*\*(AC[0-9]+):?\*\*:?").unwrap())
}

fn verification_cwd_re() -> &'static Regex {
    VERIFICATION_CWD_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:-\s+)?(?:\*\*)?Verification\s*\(cwd=([^)]+)\)(?:\*\*)?:\s+(.+?)\s*$",
        )
        .unwrap()
    })
}

fn verification_repo_re() -> &'static Regex {
    VERIFICATION_REPO_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:-\s+)?(?:\*\*)?Verification\s*\(repo-root\)(?:\*\*)?:\s+(.+?)\s*$")
            .unwrap()
    })
}

fn verification_re() -> &'static Regex {
    VERIFICATION_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:-\s+)?(?:\*\*)?Verification(?:\*\*)?:\s+(.+?)\s*$").unwrap()
    })
}

fn expected_re() -> &'static Regex {
    EXPECTED_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:-\s+)?(?:\*\*)?Expected(?:\s*\([^)]*\))?(?:\*\*)?:\s+(.+?)\s*$")
            .unwrap()
    })
}

/// Where a verification command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CwdSpec<'a> {
    RepoRoot,
    Override(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryLine<'a> {
    AcHeader(&'a str),
    Verification { cwd: CwdSpec<'a>, value: &'a str },
    Expected(&'a str),
    Other,
}

pub fn classify_line(line: &str) -> StoryLine<'_> {
    if let Some(caps) = ac_re().captures(line) {
        return StoryLine::AcHeader(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = verification_cwd_re().captures(line) {
        let (Some(dir), Some(value)) = (caps.get(1), caps.get(2)) else {
            return StoryLine::Other;
        };
        return StoryLine::Verification {
            cwd: CwdSpec::Override(dir.as_str()),
            value: value.as_str(),
        };
    }
    if let Some(m) = verification_repo_re()
        .captures(line)
        .or_else(|| verification_re().captures(line))
        .and_then(|caps| caps.get(1))
    {
        return StoryLine::Verification {
            cwd: CwdSpec::RepoRoot,
            value: m.as_str(),
        };
    }
    if let Some(m) = expected_re().captures(line).and_then(|caps| caps.get(1)) {
        return StoryLine::Expected(m.as_str());
    }
    StoryLine::Other
}

/// Strip one pair of surrounding backticks; unquoted text is returned trimmed.
pub fn strip_backticks(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('`') && trimmed.ends_with('`') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

// ---------------------------------------------------------------------------
// StoryScanner
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Header {
    ac_id: String,
    line: usize,
}

#[derive(Debug)]
struct Verification {
    command: String,
    cwd: PathBuf,
    line: usize,
}

#[derive(Debug)]
struct Expected {
    text: String,
    line: usize,
}

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    NoCriterion,
    /// An AC header was seen; its Verification line has not.
    AwaitingVerification(Header),
    /// A Verification line was captured; `expected` fills in at most once.
    HaveVerification {
        header: Header,
        verification: Verification,
        expected: Option<Expected>,
    },
}

/// Line-at-a-time state machine over one story document.
pub struct StoryScanner<'a> {
    path: &'a Path,
    story_id: &'a str,
    repo_root: &'a Path,
    state: ScanState,
    criteria: Vec<AcceptanceCriterion>,
}

impl<'a> StoryScanner<'a> {
    pub fn new(path: &'a Path, story_id: &'a str, repo_root: &'a Path) -> Self {
        Self {
            path,
            story_id,
            repo_root,
            state: ScanState::NoCriterion,
            criteria: Vec::new(),
        }
    }

    /// Feed one line (1-indexed `line_no`).
    pub fn feed(&mut self, line_no: usize, line: &str) -> std::result::Result<(), ParseError> {
        match classify_line(line) {
            StoryLine::AcHeader(ac_id) => {
                self.flush()?;
                self.state = ScanState::AwaitingVerification(Header {
                    ac_id: ac_id.to_string(),
                    line: line_no,
                });
                Ok(())
            }
            StoryLine::Verification { cwd, value } => self.on_verification(line_no, cwd, value),
            StoryLine::Expected(value) => self.on_expected(line_no, value),
            StoryLine::Other => Ok(()),
        }
    }

    /// Flush the last criterion and return everything parsed, in document order.
    pub fn finish(mut self) -> std::result::Result<Vec<AcceptanceCriterion>, ParseError> {
        self.flush()?;
        if self.criteria.is_empty() {
            return Err(ParseError::NoCriteria {
                path: self.path.to_path_buf(),
                story_id: self.story_id.to_string(),
            });
        }
        Ok(self.criteria)
    }

    fn on_verification(
        &mut self,
        line_no: usize,
        cwd: CwdSpec<'_>,
        value: &str,
    ) -> std::result::Result<(), ParseError> {
        match std::mem::take(&mut self.state) {
            ScanState::NoCriterion => Ok(()),
            ScanState::AwaitingVerification(header) => {
                let command = strip_backticks(value);
                if command.is_empty() {
                    return Err(self.empty_value(&header, line_no, CriterionPart::Verification));
                }
                let cwd = match cwd {
                    CwdSpec::RepoRoot => self.repo_root.to_path_buf(),
                    CwdSpec::Override(dir) => resolve_cwd(self.repo_root, dir),
                };
                self.state = ScanState::HaveVerification {
                    header,
                    verification: Verification {
                        command: command.to_string(),
                        cwd,
                        line: line_no,
                    },
                    expected: None,
                };
                Ok(())
            }
            ScanState::HaveVerification {
                header,
                verification,
                ..
            } => Err(ParseError::DuplicateVerification {
                path: self.path.to_path_buf(),
                ac_id: header.ac_id,
                first: verification.line,
                second: line_no,
            }),
        }
    }

    fn on_expected(&mut self, line_no: usize, value: &str) -> std::result::Result<(), ParseError> {
        match std::mem::take(&mut self.state) {
            ScanState::NoCriterion => Ok(()),
            ScanState::AwaitingVerification(header) => {
                Err(ParseError::ExpectedWithoutVerification {
                    path: self.path.to_path_buf(),
                    ac_id: header.ac_id,
                    line: line_no,
                })
            }
            ScanState::HaveVerification {
                header,
                expected: Some(previous),
                ..
            } => Err(ParseError::DuplicateExpected {
                path: self.path.to_path_buf(),
                ac_id: header.ac_id,
                first: previous.line,
                second: line_no,
            }),
            ScanState::HaveVerification {
                header,
                verification,
                expected: None,
            } => {
                let text = strip_backticks(value);
                if text.is_empty() {
                    return Err(self.empty_value(&header, line_no, CriterionPart::Expected));
                }
                self.state = ScanState::HaveVerification {
                    header,
                    verification,
                    expected: Some(Expected {
                        text: text.to_string(),
                        line: line_no,
                    }),
                };
                Ok(())
            }
        }
    }

    fn flush(&mut self) -> std::result::Result<(), ParseError> {
        match std::mem::take(&mut self.state) {
            ScanState::NoCriterion => Ok(()),
            ScanState::AwaitingVerification(header) => Err(ParseError::IncompleteCriterion {
                path: self.path.to_path_buf(),
                ac_id: header.ac_id,
                line: header.line,
                missing: CriterionPart::Verification,
            }),
            ScanState::HaveVerification {
                header,
                verification,
                expected: None,
            } => Err(ParseError::IncompleteCriterion {
                path: self.path.to_path_buf(),
                ac_id: header.ac_id,
                line: verification.line,
                missing: CriterionPart::Expected,
            }),
            ScanState::HaveVerification {
                header,
                verification,
                expected: Some(expected),
            } => {
                let outcome = ExpectedOutcome::classify(&expected.text);
                self.criteria.push(AcceptanceCriterion {
                    story_id: self.story_id.to_string(),
                    ac_id: header.ac_id,
                    command: verification.command,
                    working_directory: verification.cwd,
                    expected: expected.text,
                    outcome,
                    line: header.line,
                });
                Ok(())
            }
        }
    }

    fn empty_value(&self, header: &Header, line: usize, part: CriterionPart) -> ParseError {
        ParseError::EmptyValue {
            path: self.path.to_path_buf(),
            ac_id: header.ac_id.clone(),
            line,
            part,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Read a story document and return its criteria in document order.
pub fn parse_story(
    path: &Path,
    story_id: &str,
    repo_root: &Path,
) -> Result<Vec<AcceptanceCriterion>> {
    let text = read_document(path)?;
    let criteria = parse_story_text(&text, path, story_id, repo_root)?;
    tracing::debug!(story = story_id, criteria = criteria.len(), "parsed story");
    Ok(criteria)
}

pub fn parse_story_text(
    text: &str,
    path: &Path,
    story_id: &str,
    repo_root: &Path,
) -> std::result::Result<Vec<AcceptanceCriterion>, ParseError> {
    let mut scanner = StoryScanner::new(path, story_id, repo_root);
    for (idx, line) in text.lines().enumerate() {
        scanner.feed(idx + 1, line)?;
    }
    scanner.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
