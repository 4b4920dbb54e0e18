//! Process documents: an ordered list of story ids, one per numbered line.
//!
//! ```text
//! 1. OPS-001 - Bootstrap the toolchain
//! 2) OPS-002: Wire up CI
//! ```

use crate::error::{ParseError, Result};
use crate::io::read_document;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static PROCESS_STORY_RE: OnceLock<Regex> = OnceLock::new();

fn process_story_re() -> &'static Regex {
    PROCESS_STORY_RE.get_or_init(|| {
        Regex::new(r"^\s*[0-9]+[.)]\s+([A-Z][A-Z0-9_]+[.-][0-9]{3})\b").unwrap()
    })
}

/// Read a process document and return its story ids in document order.
pub fn parse_process(path: &Path) -> Result<Vec<String>> {
    let text = read_document(path)?;
    Ok(parse_process_text(&text, path)?)
}

/// Extract story ids from process text. Non-matching lines are ignored.
pub fn parse_process_text(text: &str, path: &Path) -> std::result::Result<Vec<String>, ParseError> {
    let story_ids: Vec<String> = text
        .lines()
        .filter_map(|line| process_story_re().captures(line))
        .map(|caps| caps[1].to_string())
        .collect();

    if story_ids.is_empty() {
        return Err(ParseError::EmptyProcess {
            path: path.to_path_buf(),
        });
    }
    Ok(story_ids)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
