// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Pipeline configuration
//!
//! Defines the schema for `handoff.yaml` / `handoff.toml` files. Every field
//! has a default, so an empty file is a valid configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, PipelineResult};

/// File names searched in the working directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["handoff.yaml", "handoff.toml"];

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Blocking I/O pool
    #[serde(default)]
    pub io: IoPoolConfig,

    /// CPU-bound pool
    #[serde(default)]
    pub compute: ComputePoolConfig,

    /// Consumer thread
    #[serde(default)]
    pub consumer: ConsumerPoolConfig,

    /// Source fetching used by the CLI
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// I/O pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoPoolConfig {
    /// Async worker threads of the owned runtime
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Upper bound on concurrently blocked stage bodies
    #[serde(default = "default_max_blocking_threads")]
    pub max_blocking_threads: usize,

    #[serde(default = "default_io_thread_name")]
    pub thread_name: String,
}

impl Default for IoPoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            max_blocking_threads: default_max_blocking_threads(),
            thread_name: default_io_thread_name(),
        }
    }
}

/// Compute pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputePoolConfig {
    /// Worker threads; defaults to the available parallelism
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Prefix for worker thread names
    #[serde(default = "default_compute_thread_name")]
    pub thread_name: String,
}

impl Default for ComputePoolConfig {
    fn default() -> Self {
        Self {
            threads: None,
            thread_name: default_compute_thread_name(),
        }
    }
}

impl ComputePoolConfig {
    /// Thread count after applying the parallelism default
    pub fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(available_parallelism)
    }
}

/// Consumer thread settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerPoolConfig {
    #[serde(default = "default_consumer_thread_name")]
    pub thread_name: String,
}

impl Default for ConsumerPoolConfig {
    fn default() -> Self {
        Self {
            thread_name: default_consumer_thread_name(),
        }
    }
}

/// Source fetching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest accepted payload in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_worker_threads() -> usize {
    1
}

fn default_max_blocking_threads() -> usize {
    64
}

fn default_io_thread_name() -> String {
    "handoff-io".to_string()
}

fn default_compute_thread_name() -> String {
    "handoff-compute".to_string()
}

fn default_consumer_thread_name() -> String {
    "handoff-consumer".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_user_agent() -> String {
    format!("handoff/{}", env!("CARGO_PKG_VERSION"))
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl PipelineConfig {
    /// Load configuration from a YAML or TOML file (chosen by extension)
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            return Err(PipelineError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> PipelineResult<Self> {
        // serde_yaml rejects an empty document; treat it as all defaults
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> PipelineResult<Self> {
        toml::from_str(toml_str).map_err(Into::into)
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> PipelineResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> PipelineResult<String> {
        toml::to_string_pretty(self).map_err(Into::into)
    }

    /// Resolve the configuration to use
    ///
    /// An explicit path must exist. Otherwise the working directory is
    /// searched, then the user config directory, and finally the defaults are
    /// used. Returns the file the configuration came from, if any.
    pub fn discover(
        explicit: Option<&Path>,
        working_dir: &Path,
    ) -> PipelineResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        let mut search_dirs = vec![working_dir.to_path_buf()];
        if let Some(dir) = Self::user_config_dir() {
            search_dirs.push(dir);
        }

        for dir in search_dirs {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "using configuration file");
                    return Ok((Self::from_file(&candidate)?, Some(candidate)));
                }
            }
        }

        Ok((Self::default(), None))
    }

    /// Per-user configuration directory
    pub fn user_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "handoff").map(|dirs| dirs.config_dir().to_path_buf())
    }
}
