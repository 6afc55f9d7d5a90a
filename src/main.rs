// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! handoff - fetch, transform, and display images across execution pools

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handoff::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `--format json` output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handoff=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            source,
            filter,
            output,
            width,
            format,
        } => {
            handoff::cli::run::run(source, filter, output, width, format, config_path, cli.verbose)
                .await
        }
        Commands::Watch {
            file,
            filter,
            width,
            debounce,
        } => {
            handoff::cli::watch::run(file, filter, width, debounce, config_path, cli.verbose).await
        }
        Commands::Demo { runs, delay_ms } => {
            handoff::cli::demo::run(runs, delay_ms, config_path, cli.verbose).await
        }
        Commands::Config { format } => handoff::cli::config::run(format, config_path, cli.verbose),
    }
}
