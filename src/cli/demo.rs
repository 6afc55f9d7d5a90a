// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Demo command - many concurrent synthetic runs
//!
//! Each run sleeps in its fetch stage and doubles its index in the transform
//! stage. Every delivery is checked for the right value, the right thread,
//! and exactly-once arrival.

use colored::Colorize;
use miette::Result;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::errors::PipelineResult;
use crate::pipeline::{Scope, StagedPipeline};
use crate::utils;

/// One delivered run, as seen on the consumer thread
#[derive(Debug)]
struct Delivery {
    index: u64,
    result: PipelineResult<u64>,
    on_consumer: bool,
}

/// Run the demo command
pub async fn run(runs: u64, delay_ms: u64, config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let config = super::load_config(config_path, verbose)?;
    let pipeline = super::build_pipeline(&config)?;
    let consumer_name = config.consumer.thread_name.clone();

    println!(
        "{} {} runs, {}ms fetch delay, {} compute threads",
        "Launching".bold(),
        runs,
        delay_ms,
        pipeline.compute_pool().threads()
    );

    let progress = utils::create_progress_bar(runs, "Runs");
    let scope = Scope::new();
    let delay = Duration::from_millis(delay_ms);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let start = Instant::now();

    for index in 0..runs {
        let tx = tx.clone();
        let progress = progress.clone();
        let consumer_name = consumer_name.clone();

        pipeline.run(
            &scope,
            move || {
                std::thread::sleep(delay);
                Ok::<_, Infallible>(index)
            },
            |value| Ok::<_, Infallible>(value * 2),
            move |result| {
                progress.inc(1);
                let on_consumer = std::thread::current().name() == Some(consumer_name.as_str());
                let _ = tx.send(Delivery {
                    index,
                    result,
                    on_consumer,
                });
            },
        )?;
    }
    drop(tx);

    let mut deliveries = Vec::new();
    loop {
        tokio::select! {
            delivery = rx.recv() => match delivery {
                Some(delivery) => deliveries.push(delivery),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !scope.is_cancelled() => {
                progress.println("Interrupted, cancelling remaining runs");
                scope.cancel();
            }
        }
    }

    let elapsed = start.elapsed();
    progress.finish_and_clear();

    tokio::task::spawn_blocking(move || pipeline.shutdown())
        .await
        .map_err(|e| miette::miette!("Failed to shut down pipeline: {}", e))?;

    let summary = check_deliveries(runs, &deliveries);
    print_summary(&summary, elapsed, runs, delay);

    if !summary.problems.is_empty() {
        return Err(miette::miette!(
            "{} of {} runs misbehaved",
            summary.problems.len(),
            runs
        ));
    }

    Ok(())
}

#[derive(Debug, Default)]
struct Summary {
    completed: u64,
    cancelled: u64,
    problems: Vec<String>,
}

fn check_deliveries(runs: u64, deliveries: &[Delivery]) -> Summary {
    let mut summary = Summary::default();
    let mut seen: HashMap<u64, usize> = HashMap::new();

    for delivery in deliveries {
        *seen.entry(delivery.index).or_default() += 1;

        if !delivery.on_consumer {
            summary
                .problems
                .push(format!("run {} delivered off the consumer thread", delivery.index));
        }

        match &delivery.result {
            Ok(value) if *value == delivery.index * 2 => summary.completed += 1,
            Ok(value) => summary.problems.push(format!(
                "run {} produced {} (expected {})",
                delivery.index,
                value,
                delivery.index * 2
            )),
            Err(e) if e.is_cancelled() => summary.cancelled += 1,
            Err(e) => summary
                .problems
                .push(format!("run {} failed: {}", delivery.index, e)),
        }
    }

    for index in 0..runs {
        match seen.get(&index).copied().unwrap_or(0) {
            1 => {}
            0 => summary.problems.push(format!("run {} was never delivered", index)),
            n => summary
                .problems
                .push(format!("run {} was delivered {} times", index, n)),
        }
    }

    summary
}

fn print_summary(summary: &Summary, elapsed: Duration, runs: u64, delay: Duration) {
    utils::print_section("Results");
    utils::print_success(&format!("{} completed with the expected value", summary.completed));
    if summary.cancelled > 0 {
        utils::print_warning(&format!("{} cancelled", summary.cancelled));
    }
    for problem in &summary.problems {
        utils::print_error(problem);
    }

    let sequential = delay.as_secs_f64() * runs as f64;
    utils::print_info(&format!(
        "{:.2}s wall clock ({:.2}s if fetched one at a time)",
        elapsed.as_secs_f64(),
        sequential
    ));
}
