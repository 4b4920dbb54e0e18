use crate::output::{print_summary, ConsoleObserver};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;
use story_runner_core::config::RunnerConfig;
use story_runner_core::engine::Engine;
use story_runner_core::report::{self, ErrorReport};

pub struct VerifyArgs {
    pub process: PathBuf,
    pub fail_fast: bool,
    pub json_output: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Run every criterion of the process and return the process exit code
/// (0 all passed, 1 some failed).
///
/// Structural failures come back as `Err`; the error document is still
/// written to `--json-output` first.
pub fn run(root: &Path, args: VerifyArgs) -> anyhow::Result<i32> {
    let config = RunnerConfig::new(root)
        .with_fail_fast(args.fail_fast)
        .with_timeout(args.timeout_secs.map(Duration::from_secs));
    let engine = Engine::new(config);

    let report = match engine.verify(&args.process, &mut ConsoleObserver) {
        Ok(report) => report,
        Err(e) => {
            if let Some(dest) = &args.json_output {
                let doc = ErrorReport::new(root, &args.process, e.to_string());
                report::write(&doc, dest)
                    .with_context(|| format!("failed to write {}", dest.display()))?;
            }
            return Err(e).context("verification aborted");
        }
    };

    print_summary(&report);
    if let Some(dest) = &args.json_output {
        report::write(&report, dest)
            .with_context(|| format!("failed to write {}", dest.display()))?;
    }
    Ok(report.exit_code)
}
