use std::path::{Path, PathBuf};
use story_runner_core::paths::absolutize;

/// Marker that identifies a repository root.
const ROOT_MARKER: &str = ".git";

/// Resolve the repository root.
///
/// Priority:
/// 1. `--root` flag (passed in as `explicit`)
/// 2. Walk upward from the process document's directory looking for `.git`
/// 3. Walk upward from `cwd` looking for `.git`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>, process: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return absolutize(p);
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let process_dir = absolutize(process).parent().map(Path::to_path_buf);
    if let Some(found) = process_dir.as_deref().and_then(find_marker_upward) {
        return found;
    }
    if let Some(found) = find_marker_upward(&cwd) {
        return found;
    }
    cwd
}

fn find_marker_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(ROOT_MARKER).exists())
        .map(Path::to_path_buf)
}
