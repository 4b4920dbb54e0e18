use crate::paths::STORIES_DIR;
use std::path::PathBuf;
use std::time::Duration;

/// Default cap, in characters, on the output snippet kept per result.
pub const DEFAULT_SNIPPET_LIMIT: usize = 2000;

/// Settings for one verification run, resolved once by the caller.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub repo_root: PathBuf,
    /// Directory under `repo_root` holding one sub-directory of stories per process.
    pub stories_dir: PathBuf,
    pub fail_fast: bool,
    pub snippet_limit: usize,
    /// `None` waits for every command indefinitely.
    pub command_timeout: Option<Duration>,
}

impl RunnerConfig {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            stories_dir: PathBuf::from(STORIES_DIR),
            fail_fast: true,
            snippet_limit: DEFAULT_SNIPPET_LIMIT,
            command_timeout: None,
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_snippet_limit(mut self, limit: usize) -> Self {
        self.snippet_limit = limit;
        self
    }
}
