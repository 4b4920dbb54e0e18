use crate::output::print_json;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use story_runner_core::config::RunnerConfig;
use story_runner_core::engine::Engine;
use story_runner_core::process::parse_process;

#[derive(Serialize)]
struct ShowOutput {
    repo_root: String,
    process: String,
    stories: Vec<StoryEntry>,
}

#[derive(Serialize)]
struct StoryEntry {
    index: usize,
    story_id: String,
    path: String,
}

/// Print the canonical story order and the story files it resolves to.
pub fn run(root: &Path, process: &Path, json: bool) -> anyhow::Result<()> {
    let story_ids = parse_process(process)
        .with_context(|| format!("failed to parse process {}", process.display()))?;
    let locator = Engine::new(RunnerConfig::new(root)).locator(process);

    let stories: Vec<StoryEntry> = story_ids
        .into_iter()
        .enumerate()
        .map(|(idx, story_id)| StoryEntry {
            index: idx + 1,
            path: locator.story_path(&story_id).display().to_string(),
            story_id,
        })
        .collect();

    if json {
        print_json(&ShowOutput {
            repo_root: root.display().to_string(),
            process: process.display().to_string(),
            stories,
        })?;
    } else {
        println!("repo={}", root.display());
        println!("process={}", process.display());
        for entry in &stories {
            println!("{}. {} -> {}", entry.index, entry.story_id, entry.path);
        }
    }
    Ok(())
}
