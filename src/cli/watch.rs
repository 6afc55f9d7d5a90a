// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Watch command - re-run on file changes

use colored::Colorize;
use miette::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use super::run::{run_once, ImageJob};
use super::OutputFormat;
use crate::imaging::{Filter, Source};
use crate::pipeline::{FetchConfig, Scope, StagedPipeline};

/// Run the watch command
pub async fn run(
    file: PathBuf,
    filter: Filter,
    width: usize,
    debounce_ms: u64,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    if !file.is_file() {
        return Err(miette::miette!(
            "Image file not found: {}\n\n\
             Watch mode needs a local file; use 'handoff run' for URLs.",
            file.display()
        ));
    }

    let config = super::load_config(config_path, verbose)?;
    let target = file
        .canonicalize()
        .map_err(|e| miette::miette!("Failed to resolve '{}': {}", file.display(), e))?;
    // Editors often replace the file, so watch its directory instead.
    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| miette::miette!("'{}' has no parent directory", target.display()))?;

    println!("{}", "Starting watch mode...".bold());
    println!(
        "Watching {} (debounce: {}ms)",
        target.display(),
        debounce_ms
    );
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut debouncer = new_debouncer(
        Duration::from_millis(debounce_ms),
        move |result: DebounceEventResult| {
            let _ = tx.send(result);
        },
    )
    .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    let pipeline = super::build_pipeline(&config)?;
    let scope = Scope::new();
    let job = ImageJob {
        source: Source::File(target.clone()),
        filter,
        output: None,
        width,
        format: OutputFormat::Text,
    };

    // Initial run
    run_and_report(&pipeline, &scope, &job, &config.fetch).await;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(Ok(events)) => {
                    let relevant = relevant_events(&events, &target);
                    if relevant.is_empty() {
                        continue;
                    }

                    println!();
                    println!("{}", "─".repeat(50).dimmed());
                    println!("{}: {}", "Change detected".yellow(), target.display());
                    if verbose {
                        for event in &relevant {
                            println!("  {}", event.path.display());
                        }
                    }
                    println!();

                    run_and_report(&pipeline, &scope, &job, &config.fetch).await;
                }
                Some(Err(e)) => {
                    eprintln!("{}: {:?}", "Watch error".red(), e);
                }
                None => {
                    eprintln!("{}", "File watcher stopped".red());
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "Stopping watch mode".dimmed());
                scope.cancel();
                break;
            }
        }
    }

    drop(debouncer);
    tokio::task::spawn_blocking(move || pipeline.shutdown())
        .await
        .map_err(|e| miette::miette!("Failed to shut down pipeline: {}", e))?;

    Ok(())
}

/// Each change runs in its own child scope so Ctrl+C only stops that run
async fn run_and_report(
    pipeline: &StagedPipeline,
    scope: &Scope,
    job: &ImageJob,
    fetch: &FetchConfig,
) {
    let child = scope.child();
    if let Err(e) = run_once(pipeline, &child, job, fetch).await {
        eprintln!("{}: {}", "Run failed".red(), e);
    }
}

fn relevant_events<'a>(events: &'a [DebouncedEvent], target: &Path) -> Vec<&'a DebouncedEvent> {
    events
        .iter()
        .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
        .filter(|e| e.path.file_name() == target.file_name())
        .collect()
}
