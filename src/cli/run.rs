// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Run command - fetch, filter, and display one image

use colored::Colorize;
use indicatif::ProgressBar;
use miette::Result;
use serde::Serialize;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::oneshot;

use super::OutputFormat;
use crate::errors::{PipelineError, PipelineResult};
use crate::imaging::{self, Filter, Rendered, Source};
use crate::pipeline::{FetchConfig, Scope, StagedPipeline};
use crate::utils;

/// Everything needed to start one image run
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub source: Source,
    pub filter: Filter,
    pub output: Option<PathBuf>,
    pub width: usize,
    pub format: OutputFormat,
}

/// Summary of a delivered run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: String,
    pub filter: String,
    pub width: usize,
    pub height: usize,
    pub channels: String,
    pub digest: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Run the run command
pub async fn run(
    source: String,
    filter: Filter,
    output: Option<PathBuf>,
    width: usize,
    format: OutputFormat,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = super::load_config(config_path, verbose)?;
    let source: Source = match source.parse() {
        Ok(source) => source,
        Err(never) => match never {},
    };

    let job = ImageJob {
        source,
        filter,
        output,
        width,
        format,
    };

    let pipeline = super::build_pipeline(&config)?;
    let outcome = run_once(&pipeline, &Scope::new(), &job, &config.fetch).await;

    tokio::task::spawn_blocking(move || pipeline.shutdown())
        .await
        .map_err(|e| miette::miette!("Failed to shut down pipeline: {}", e))?;

    outcome.map(|_| ())
}

/// Start one run and wait for its outcome
///
/// Display happens on the consumer thread as part of delivery. Ctrl+C cancels
/// the run through `scope`.
pub async fn run_once(
    pipeline: &StagedPipeline,
    scope: &Scope,
    job: &ImageJob,
    fetch: &FetchConfig,
) -> Result<RunReport> {
    let spinner = match job.format {
        OutputFormat::Text => utils::create_spinner(&format!("Fetching {}", job.source)),
        OutputFormat::Json => ProgressBar::hidden(),
    };

    let start = Instant::now();
    let (tx, rx) = oneshot::channel();

    let source = job.source.clone();
    let fetch = fetch.clone();
    let (filter, width) = (job.filter, job.width);
    let display_job = job.clone();

    let mut handle = pipeline.run(
        scope,
        move || imaging::load(&source, &fetch),
        move |image| Ok::<_, Infallible>(imaging::render(image, filter, width)),
        move |result: PipelineResult<Rendered>| {
            spinner.finish_and_clear();
            let outcome = result.and_then(|rendered| deliver(&display_job, rendered, start));
            let _ = tx.send(outcome);
        },
    )?;

    tracing::debug!(run = %handle.id(), source = %job.source, "started run");

    tokio::select! {
        _ = handle.finished() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(run = %handle.id(), "interrupted, cancelling");
            scope.cancel();
        }
    }

    let outcome = rx
        .await
        .map_err(|_| miette::miette!("Pipeline shut down before delivering a result"))?;

    Ok(outcome?)
}

/// Display a finished run; called on the consumer thread
fn deliver(job: &ImageJob, rendered: Rendered, start: Instant) -> PipelineResult<RunReport> {
    if let Some(path) = &job.output {
        std::fs::write(path, &rendered.encoded).map_err(|e| PipelineError::FileWriteError {
            path: path.clone(),
            error: e.to_string(),
        })?;
    }

    let report = RunReport {
        source: job.source.to_string(),
        filter: rendered.filter.to_string(),
        width: rendered.image.width,
        height: rendered.image.height,
        channels: rendered.image.channels.to_string(),
        digest: rendered.digest,
        elapsed_ms: start.elapsed().as_millis() as u64,
        output: job.output.clone(),
    };

    match job.format {
        OutputFormat::Text => {
            print!("{}", rendered.preview);
            print_summary(&report);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
    }

    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!();
    utils::print_success(&format!("{} {}", report.source.bold(), report.filter.dimmed()));
    println!(
        "    {:<8} {}x{} ({})",
        "size",
        report.width,
        report.height,
        report.channels
    );
    println!("    {:<8} {}", "blake3", report.digest.dimmed());
    println!(
        "    {:<8} {:.2}s",
        "elapsed",
        report.elapsed_ms as f64 / 1000.0
    );
    if let Some(path) = &report.output {
        println!("    {:<8} {}", "output", path.display().to_string().cyan());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{netpbm, Channels, Image};
    use crate::pipeline::PipelineConfig;

    fn write_ppm(dir: &Path) -> PathBuf {
        let image = Image::new(2, 2, Channels::Rgb, vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 9, 9, 9])
            .unwrap();
        let path = dir.join("in.ppm");
        std::fs::write(&path, netpbm::encode(&image)).unwrap();
        path
    }

    fn job(source: PathBuf, output: Option<PathBuf>) -> ImageJob {
        ImageJob {
            source: Source::File(source),
            filter: Filter::Grayscale,
            output,
            width: 8,
            format: OutputFormat::Json,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_once_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ppm(dir.path());
        let output = dir.path().join("out.pgm");

        let config = PipelineConfig::default();
        let pipeline = crate::cli::build_pipeline(&config).unwrap();

        let report = run_once(
            &pipeline,
            &Scope::new(),
            &job(input, Some(output.clone())),
            &config.fetch,
        )
        .await
        .unwrap();

        assert_eq!((report.width, report.height), (2, 2));
        assert_eq!(report.channels, "gray");
        assert_eq!(report.filter, "grayscale");

        let written = std::fs::read(&output).unwrap();
        assert_eq!(report.digest, blake3::hash(&written).to_hex().to_string());
        assert_eq!(netpbm::decode(&written).unwrap().pixels, vec![76, 149, 29, 9]);

        tokio::task::spawn_blocking(move || pipeline.shutdown()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_once_reports_fetch_failure() {
        let config = PipelineConfig::default();
        let pipeline = crate::cli::build_pipeline(&config).unwrap();

        let err = run_once(
            &pipeline,
            &Scope::new(),
            &job(PathBuf::from("/no/such/image.ppm"), None),
            &config.fetch,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("Stage 'fetch' failed"));

        tokio::task::spawn_blocking(move || pipeline.shutdown()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_once_in_cancelled_scope() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ppm(dir.path());

        let config = PipelineConfig::default();
        let pipeline = crate::cli::build_pipeline(&config).unwrap();
        let scope = Scope::new();
        scope.cancel();

        let err = run_once(&pipeline, &scope, &job(input, None), &config.fetch)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Run cancelled at stage 'fetch'");

        tokio::task::spawn_blocking(move || pipeline.shutdown()).await.unwrap();
    }
}
