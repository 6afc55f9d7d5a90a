// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for handoff.

pub mod config;
pub mod demo;
pub mod run;
pub mod watch;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::imaging::Filter;
use crate::errors::PipelineResult;
use crate::pipeline::{PipelineConfig, PipelineValidator, StagedPipeline};

/// Two-stage image pipeline
///
/// Fetch on an I/O pool, transform on a compute pool, display on one thread.
#[derive(Parser, Debug)]
#[clap(
    name = "handoff",
    version,
    about = "Fetch, transform, and display images across I/O, compute, and consumer pools",
    long_about = None,
    after_help = "Examples:\n\
        handoff run photo.ppm                     Grayscale preview of a local image\n\
        handoff run https://host/a.ppm -f sepia   Fetch over HTTP and apply sepia\n\
        handoff watch photo.ppm                   Re-run whenever the file changes\n\
        handoff demo --runs 50                    Exercise the pools with synthetic runs\n\n\
        See 'handoff <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to handoff.yaml or handoff.toml)
    #[clap(short, long, global = true, value_name = "PATH", env = "HANDOFF_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch an image, filter it, and show a preview
    Run {
        /// Image URL (http/https) or local path to a binary PGM/PPM file
        source: String,

        /// Filter: grayscale, invert, sepia, threshold[:N], identity
        #[clap(short, long, default_value = "grayscale")]
        filter: Filter,

        /// Write the filtered image to this path
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Preview width in characters
        #[clap(short, long, default_value = "64")]
        width: usize,

        /// Output format
        #[clap(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Watch mode - re-run on file changes
    Watch {
        /// Image file to watch
        file: PathBuf,

        /// Filter: grayscale, invert, sepia, threshold[:N], identity
        #[clap(short, long, default_value = "grayscale")]
        filter: Filter,

        /// Preview width in characters
        #[clap(short, long, default_value = "64")]
        width: usize,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "300")]
        debounce: u64,
    },

    /// Launch concurrent synthetic runs and check every result
    Demo {
        /// Number of concurrent runs
        #[clap(short, long, default_value = "20")]
        runs: u64,

        /// How long each fetch stage sleeps
        #[clap(long, default_value = "50")]
        delay_ms: u64,
    },

    /// Show the effective configuration
    Config {
        /// Output format
        #[clap(short, long, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Output format for the run command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Serialization format for the config command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl std::str::FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(format!("Unknown config format: {}", s)),
        }
    }
}

/// Discover and validate the configuration for a command
///
/// Validation errors abort; warnings are printed to stderr in verbose mode.
pub(crate) fn load_config(explicit: Option<&Path>, verbose: bool) -> miette::Result<PipelineConfig> {
    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    let (config, origin) = PipelineConfig::discover(explicit, &working_dir)?;
    match &origin {
        Some(path) => tracing::debug!(path = %path.display(), "loaded configuration"),
        None => tracing::debug!("using default configuration"),
    }

    let validation = PipelineValidator::validate(&config);

    if !validation.is_valid() {
        eprintln!("{}", "Configuration validation failed:".red().bold());
        for error in &validation.errors {
            crate::utils::eprint_error(error);
        }
        return Err(miette::miette!("Configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Configuration warnings:".yellow().bold());
        for warning in &validation.warnings {
            crate::utils::eprint_warning(warning);
        }
        eprintln!();
    }

    Ok(config)
}

/// Build the pipeline a command runs on
///
/// The I/O pool gets its own runtime so the `io` section of the
/// configuration applies.
pub(crate) fn build_pipeline(config: &PipelineConfig) -> PipelineResult<StagedPipeline> {
    StagedPipeline::new(config)
}
