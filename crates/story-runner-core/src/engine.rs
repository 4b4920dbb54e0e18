//! Verification engine: process → stories → commands → report.

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::executor;
use crate::expected::{evaluate, snippet, Failure, FailureKind};
use crate::paths::StoryLocator;
use crate::process::parse_process;
use crate::report::{Report, VerificationResult};
use crate::story::{parse_story, AcceptanceCriterion};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// RunObserver
// ---------------------------------------------------------------------------

/// Live progress hooks, called at criterion boundaries.
pub trait RunObserver {
    fn on_start(&mut self, _criterion: &AcceptanceCriterion) {}
    fn on_pass(&mut self, _result: &VerificationResult) {}
    fn on_fail(&mut self, _result: &VerificationResult) {}
}

/// Observer that ignores every event.
pub struct NullObserver;

impl RunObserver for NullObserver {}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Every criterion of every story, flattened in execution order.
#[derive(Debug, Clone)]
pub struct Plan {
    pub process: PathBuf,
    pub story_ids: Vec<String>,
    pub criteria: Vec<AcceptanceCriterion>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    config: RunnerConfig,
}

impl Engine {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn locator(&self, process_path: &Path) -> StoryLocator {
        StoryLocator::new(
            &self.config.repo_root,
            &self.config.stories_dir,
            process_path,
        )
    }

    /// Parse the process document and every story it names.
    ///
    /// Any parse failure aborts; a partial plan is never returned.
    pub fn plan(&self, process_path: &Path) -> Result<Plan> {
        let story_ids = parse_process(process_path)?;
        let locator = self.locator(process_path);

        let mut criteria = Vec::new();
        for story_id in &story_ids {
            let story_path = locator.story_path(story_id);
            criteria.extend(parse_story(
                &story_path,
                story_id,
                &self.config.repo_root,
            )?);
        }

        Ok(Plan {
            process: process_path.to_path_buf(),
            story_ids,
            criteria,
        })
    }

    /// Build the plan and run it.
    pub fn verify(&self, process_path: &Path, observer: &mut dyn RunObserver) -> Result<Report> {
        let plan = self.plan(process_path)?;
        self.execute(&plan, observer)
    }

    /// Run `plan` strictly in order, stopping at the first failure when
    /// `fail_fast` is set.
    pub fn execute(&self, plan: &Plan, observer: &mut dyn RunObserver) -> Result<Report> {
        let mut results = Vec::with_capacity(plan.criteria.len());
        let mut failures = Vec::new();

        for criterion in &plan.criteria {
            observer.on_start(criterion);
            let result = self.run_criterion(criterion)?;

            if result.ok {
                observer.on_pass(&result);
                results.push(result);
                continue;
            }

            failures.push(failure_summary(criterion, &result));
            observer.on_fail(&result);
            results.push(result);
            if self.config.fail_fast {
                tracing::debug!(label = %criterion.label(), "stopping after first failure");
                break;
            }
        }

        Ok(Report::new(
            &self.config.repo_root,
            &plan.process,
            results,
            failures,
        ))
    }

    fn run_criterion(&self, criterion: &AcceptanceCriterion) -> Result<VerificationResult> {
        let exec = executor::run(
            criterion.command(),
            criterion.working_directory(),
            self.config.command_timeout,
        )?;

        let mut result = VerificationResult::for_criterion(
            criterion,
            exec.exit_code,
            snippet(&exec.output, self.config.snippet_limit),
        );
        result.duration_ms = exec.duration.as_millis() as u64;

        let failure = if exec.timed_out {
            let secs = self
                .config
                .command_timeout
                .map(|t| t.as_secs_f64())
                .unwrap_or_default();
            Some(Failure {
                kind: FailureKind::TimedOut,
                reason: format!("timed out after {secs}s"),
            })
        } else {
            evaluate(
                criterion.outcome(),
                criterion.expected(),
                exec.exit_code,
                &exec.output,
            )
        };

        if let Some(failure) = failure {
            result.ok = false;
            result.error = Some(failure.reason);
            result.failure_kind = Some(failure.kind);
        }
        Ok(result)
    }
}

/// One line for the report's `failures` list.
fn failure_summary(criterion: &AcceptanceCriterion, result: &VerificationResult) -> String {
    let label = criterion.label();
    let reason = result.error.as_deref().unwrap_or_default();
    match result.failure_kind {
        Some(FailureKind::MissingOutput) | Some(FailureKind::TimedOut) => {
            format!("{label} {reason}")
        }
        _ => format!(
            "{label} failed (exit={}) expected={}",
            result.exit_code,
            criterion.expected()
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::{ParseError, RunnerError};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        process: PathBuf,
    }

    impl Fixture {
        fn new(stories: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            let process_dir = dir.path().join("docs/processes/ops");
            std::fs::create_dir_all(&process_dir).unwrap();
            let story_dir = dir.path().join("stories/ops");
            std::fs::create_dir_all(&story_dir).unwrap();

            let mut process = String::from("# Ops\n\n");
            for (idx, (id, body)) in stories.iter().enumerate() {
                process.push_str(&format!("{}. {id} - story\n", idx + 1));
                std::fs::write(story_dir.join(format!("{id}.md")), body).unwrap();
            }
            let process_path = process_dir.join("PROCESS.md");
            std::fs::write(&process_path, process).unwrap();

            Self {
                dir,
                process: process_path,
            }
        }

        fn engine(&self, fail_fast: bool) -> Engine {
            Engine::new(RunnerConfig::new(self.dir.path()).with_fail_fast(fail_fast))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl RunObserver for Recorder {
        fn on_start(&mut self, criterion: &AcceptanceCriterion) {
            self.events.push(format!("start {}", criterion.label()));
        }
        fn on_pass(&mut self, result: &VerificationResult) {
            self.events.push(format!("pass {}", result.label()));
        }
        fn on_fail(&mut self, result: &VerificationResult) {
            self.events.push(format!("fail {}", result.label()));
        }
    }

    const HELLO_THEN_EXIT_1: &str = "- **AC1**: greets\n\
        - **Verification**: `echo hello`\n\
        - **Expected**: `hello`\n\
        - **AC2**: fails on purpose\n\
        - **Verification**: `exit 1`\n\
        - **Expected**: exit code: 1\n";

    const GOODBYE_THEN_EXIT_1: &str = "- **AC1**: greets\n\
        - **Verification**: `echo hello`\n\
        - **Expected**: `goodbye`\n\
        - **AC2**: fails on purpose\n\
        - **Verification**: `exit 1`\n\
        - **Expected**: exit code: 1\n";

    #[test]
    fn passing_story_yields_exit_zero() {
        let fx = Fixture::new(&[("OPS-001", HELLO_THEN_EXIT_1)]);
        let report = fx.engine(true).verify(&fx.process, &mut NullObserver).unwrap();
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.ok));
        assert_eq!(report.exit_code, 0);
        assert!(report.failures.is_empty());
        assert_eq!(report.results[1].exit_code, 1);
    }

    #[test]
    fn missing_output_fail_fast_stops_after_first() {
        let fx = Fixture::new(&[("OPS-001", GOODBYE_THEN_EXIT_1)]);
        let report = fx.engine(true).verify(&fx.process, &mut NullObserver).unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(!report.results[0].ok);
        assert_eq!(
            report.results[0].error.as_deref(),
            Some("missing expected output: goodbye")
        );
        assert_eq!(
            report.results[0].failure_kind,
            Some(FailureKind::MissingOutput)
        );
        assert_eq!(report.exit_code, 1);
        assert_eq!(
            report.failures,
            vec!["OPS-001 AC1 missing expected output: goodbye"]
        );
    }

    #[test]
    fn missing_output_without_fail_fast_continues() {
        let fx = Fixture::new(&[("OPS-001", GOODBYE_THEN_EXIT_1)]);
        let report = fx.engine(false).verify(&fx.process, &mut NullObserver).unwrap();
        assert_eq!(report.results.len(), 2);
        assert!(!report.results[0].ok);
        assert!(report.results[1].ok);
        assert_eq!(report.exit_code, 1);
    }

    #[test]
    fn fail_fast_versus_continue_over_three_criteria() {
        let story = "- **AC1**: a\n- Verification: false\n- Expected: exit code: 0\n\
                     - **AC2**: b\n- Verification: true\n- Expected: exit code: 0\n\
                     - **AC3**: c\n- Verification: echo ok\n- Expected: ok\n";
        let fx = Fixture::new(&[("OPS-001", story)]);

        let fast = fx.engine(true).verify(&fx.process, &mut NullObserver).unwrap();
        assert_eq!(fast.results.len(), 1);
        assert_eq!(
            fast.failures,
            vec!["OPS-001 AC1 failed (exit=1) expected=exit code: 0"]
        );

        let slow = fx.engine(false).verify(&fx.process, &mut NullObserver).unwrap();
        assert_eq!(slow.results.len(), 3);
        assert_eq!(slow.failed_count(), 1);
    }

    #[test]
    fn output_match_with_non_zero_exit_fails() {
        let story = "- **AC1**: a\n- Verification: echo found; exit 4\n- Expected: found\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let report = fx.engine(true).verify(&fx.process, &mut NullObserver).unwrap();
        let result = &report.results[0];
        assert!(!result.ok);
        assert_eq!(result.failure_kind, Some(FailureKind::NonZeroExit));
        assert_eq!(result.error.as_deref(), Some("exit=4 expected=found"));
    }

    #[test]
    fn stories_run_in_process_order() {
        let one = "- **AC1**: a\n- Verification: echo one\n- Expected: one\n";
        let two = "- **AC1**: a\n- Verification: echo two\n- Expected: two\n\
                   - **AC2**: b\n- Verification: echo three\n- Expected: three\n";
        let fx = Fixture::new(&[("OPS-002", two), ("OPS-001", one)]);
        let mut recorder = Recorder::default();
        let report = fx.engine(true).verify(&fx.process, &mut recorder).unwrap();
        let labels: Vec<String> = report.results.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["OPS-002 AC1", "OPS-002 AC2", "OPS-001 AC1"]);
        assert_eq!(
            recorder.events,
            vec![
                "start OPS-002 AC1",
                "pass OPS-002 AC1",
                "start OPS-002 AC2",
                "pass OPS-002 AC2",
                "start OPS-001 AC1",
                "pass OPS-001 AC1",
            ]
        );
    }

    #[test]
    fn later_parse_error_prevents_any_execution() {
        let marker_story = "- **AC1**: a\n- Verification: touch ran.txt\n- Expected: exit 0\n";
        let broken = "- **AC1**: a\n- Verification: true\n";
        let fx = Fixture::new(&[("OPS-001", marker_story), ("OPS-002", broken)]);
        let err = fx
            .engine(true)
            .verify(&fx.process, &mut NullObserver)
            .unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Parse(ParseError::IncompleteCriterion { .. })
        ));
        assert!(!fx.dir.path().join("ran.txt").exists());
    }

    #[test]
    fn missing_story_file_is_an_error() {
        let fx = Fixture::new(&[("OPS-001", HELLO_THEN_EXIT_1)]);
        std::fs::remove_file(fx.dir.path().join("stories/ops/OPS-001.md")).unwrap();
        let err = fx.engine(true).plan(&fx.process).unwrap_err();
        assert!(matches!(err, RunnerError::Read { .. }));
    }

    #[test]
    fn commands_run_in_repo_root_or_override() {
        let story = "- **AC1**: a\n- Verification: ls\n- Expected: stories\n\
                     - **AC2**: b\n- Verification (cwd=stories): ls\n- Expected: ops\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let report = fx.engine(false).verify(&fx.process, &mut NullObserver).unwrap();
        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(
            report.results[1].cwd,
            fx.dir.path().join("stories").display().to_string()
        );
    }

    #[test]
    fn long_output_is_truncated_in_snippet() {
        let story = "- **AC1**: a\n- Verification: yes x | head -c 5000\n- Expected: exit 0\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let engine = Engine::new(RunnerConfig::new(fx.dir.path()).with_snippet_limit(100));
        let report = engine.verify(&fx.process, &mut NullObserver).unwrap();
        let snippet = &report.results[0].output_snippet;
        assert!(snippet.ends_with("...<truncated>"));
        assert_eq!(snippet.chars().count(), 100 + "\n...<truncated>".len());
    }

    #[test]
    fn timeout_is_reported_as_failure() {
        let story = "- **AC1**: a\n- Verification: exec sleep 30\n- Expected: exit 0\n\
                     - **AC2**: b\n- Verification: echo after\n- Expected: after\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let engine = Engine::new(
            RunnerConfig::new(fx.dir.path())
                .with_fail_fast(false)
                .with_timeout(Some(Duration::from_millis(200))),
        );
        let report = engine.verify(&fx.process, &mut NullObserver).unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].failure_kind, Some(FailureKind::TimedOut));
        assert_eq!(report.failures, vec!["OPS-001 AC1 timed out after 0.2s"]);
        assert!(report.results[1].ok);
    }

    #[test]
    fn timeout_keeps_output_of_non_exec_command() {
        let story = "- **AC1**: a\n- Verification: echo started; sleep 30\n- Expected: exit 0\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let engine = Engine::new(
            RunnerConfig::new(fx.dir.path()).with_timeout(Some(Duration::from_millis(200))),
        );
        let report = engine.verify(&fx.process, &mut NullObserver).unwrap();
        let result = &report.results[0];
        assert_eq!(result.failure_kind, Some(FailureKind::TimedOut));
        assert_eq!(result.output_snippet, "started");
        assert!(result.duration_ms < 5_000);
    }

    #[test]
    fn background_process_does_not_hide_output() {
        let story = "- **AC1**: a\n- Verification: `sleep 8 & echo hello`\n- Expected: `hello`\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let report = fx.engine(true).verify(&fx.process, &mut NullObserver).unwrap();
        assert!(report.passed(), "{:?}", report.failures);
        assert!(report.results[0].output_snippet.starts_with("hello"));
    }

    #[test]
    fn plan_does_not_execute() {
        let story = "- **AC1**: a\n- Verification: touch ran.txt\n- Expected: exit 0\n";
        let fx = Fixture::new(&[("OPS-001", story)]);
        let plan = fx.engine(true).plan(&fx.process).unwrap();
        assert_eq!(plan.story_ids, vec!["OPS-001"]);
        assert_eq!(plan.criteria.len(), 1);
        assert!(!fx.dir.path().join("ran.txt").exists());
    }
}
