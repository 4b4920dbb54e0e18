use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STORIES_DIR: &str = "stories";
pub const STORY_EXT: &str = "md";

// ---------------------------------------------------------------------------
// StoryLocator
// ---------------------------------------------------------------------------

/// Resolves story documents for one process document.
///
/// Stories live at `<repo_root>/<stories_dir>/<process_name>/<story_id>.md`,
/// where `process_name` is the directory that holds the process document.
#[derive(Debug, Clone)]
pub struct StoryLocator {
    stories_root: PathBuf,
}

impl StoryLocator {
    pub fn new(repo_root: &Path, stories_dir: &Path, process_path: &Path) -> Self {
        let name = process_name(process_path);
        Self {
            stories_root: repo_root.join(stories_dir).join(name),
        }
    }

    pub fn story_path(&self, story_id: &str) -> PathBuf {
        self.stories_root.join(format!("{story_id}.{STORY_EXT}"))
    }
}

/// Name of the directory containing the process document.
///
/// Relative paths are anchored at the current directory first so that
/// `PROCESS.md` run from inside `docs/processes/ops` still yields `ops`.
pub fn process_name(process_path: &Path) -> String {
    let absolute = absolutize(process_path);
    absolute
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolve a verification `cwd=` override against the repository root.
pub fn resolve_cwd(repo_root: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw.trim());
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        repo_root.join(candidate)
    }
}

pub fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
