use clap::{Parser, Subcommand};
use std::path::PathBuf;
use story_runner_cli::cmd::{self, verify::VerifyArgs};
use story_runner_cli::root;
use story_runner_core::report::EXIT_STRUCTURAL;

#[derive(Parser)]
#[command(
    name = "story-runner",
    about = "Run acceptance-criteria verification commands for a story process",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: nearest enclosing directory containing .git)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canonical story order and paths
    Show {
        /// Path to the process document (e.g. docs/processes/ops/PROCESS.md)
        #[arg(long)]
        process: PathBuf,
    },

    /// Run all AC verification commands sequentially
    Verify {
        /// Path to the process document
        #[arg(long)]
        process: PathBuf,

        /// Keep going after a failing criterion
        #[arg(long)]
        no_fail_fast: bool,

        /// Write the JSON report here, whatever the outcome
        #[arg(long)]
        json_output: Option<PathBuf>,

        /// Kill any single command running longer than this many seconds
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Show { process } => {
            let root = root::resolve_root(cli.root.as_deref(), &process);
            cmd::show::run(&root, &process, cli.json).map(|()| 0)
        }
        Commands::Verify {
            process,
            no_fail_fast,
            json_output,
            timeout,
        } => {
            let root = root::resolve_root(cli.root.as_deref(), &process);
            cmd::verify::run(
                &root,
                VerifyArgs {
                    process,
                    fail_fast: !no_fail_fast,
                    json_output,
                    timeout_secs: timeout,
                },
            )
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(EXIT_STRUCTURAL);
        }
    }
}
