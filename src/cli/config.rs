// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Config command - show the effective configuration

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::ConfigFormat;
use crate::pipeline::{PipelineConfig, PipelineValidator};
use crate::utils;

/// Run the config command
pub fn run(format: ConfigFormat, config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    let (config, origin) = PipelineConfig::discover(config_path, &working_dir)?;

    let comment = match &origin {
        Some(path) => format!("# Loaded from {}", path.display()),
        None => "# Built-in defaults".to_string(),
    };
    println!("{}", comment.dimmed());

    let rendered = match format {
        ConfigFormat::Yaml => config.to_yaml()?,
        ConfigFormat::Toml => config.to_toml()?,
    };
    print!("{}", rendered);

    if verbose {
        if let Some(dir) = PipelineConfig::user_config_dir() {
            eprintln!();
            eprintln!("User configuration directory: {}", dir.display().to_string().cyan());
        }
    }

    let validation = PipelineValidator::validate(&config);

    if validation.has_warnings() {
        eprintln!();
        eprintln!("{}", "Warnings:".yellow().bold());
        for warning in &validation.warnings {
            utils::eprint_warning(warning);
        }
    }

    if !validation.is_valid() {
        eprintln!();
        eprintln!("{}", "Errors:".red().bold());
        for error in &validation.errors {
            utils::eprint_error(error);
        }
        return Err(miette::miette!("Configuration is invalid"));
    }

    Ok(())
}
