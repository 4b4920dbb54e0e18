use serde::Serialize;
use story_runner_core::engine::RunObserver;
use story_runner_core::report::{Report, VerificationResult};
use story_runner_core::story::AcceptanceCriterion;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Prints progress as criteria run: `RUN`/`OK` lines on stdout, `FAIL` lines
/// and the captured output on stderr at the moment a failure is detected.
pub struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_start(&mut self, criterion: &AcceptanceCriterion) {
        println!("RUN {}: {}", criterion.label(), criterion.command());
    }

    fn on_pass(&mut self, result: &VerificationResult) {
        println!("OK  {}", result.label());
    }

    fn on_fail(&mut self, result: &VerificationResult) {
        eprintln!(
            "FAIL {}: {}",
            result.label(),
            result.error.as_deref().unwrap_or("failed")
        );
        eprintln!("OUTPUT:\n{}", result.output_snippet);
    }
}

/// Final summary, printed once after the run: the failure list on stderr,
/// then the pass/fail counts on stdout.
pub fn print_summary(report: &Report) {
    if !report.failures.is_empty() {
        eprintln!("FAILED ACs:");
        for failure in &report.failures {
            eprintln!("- {failure}");
        }
    }
    println!("{}", report.summary());
}
