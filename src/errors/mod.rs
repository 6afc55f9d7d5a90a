// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Error types
//!
//! Every run ends in exactly one of success or a [`PipelineError`]. Stage
//! failures keep the original error as their source so a consumer can
//! downcast it and decide how to present it.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::StageId;
use crate::pool::PoolKind;

/// Boxed error returned by a stage body
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for handoff operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Main error type for handoff
#[derive(Error, Debug, Diagnostic)]
pub enum PipelineError {
    // ─────────────────────────────────────────────────────────────────────────
    // Run Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' failed: {source}")]
    #[diagnostic(code(handoff::stage_failed))]
    StageFailed {
        stage: StageId,
        #[source]
        source: BoxError,
    },

    #[error("Stage '{stage}' panicked: {message}")]
    #[diagnostic(
        code(handoff::stage_panicked),
        help("A stage body panicked on its pool thread; the run was abandoned")
    )]
    StagePanicked { stage: StageId, message: String },

    #[error("Run cancelled at stage '{stage}'")]
    #[diagnostic(code(handoff::cancelled))]
    Cancelled { stage: StageId },

    #[error("The {pool} pool is no longer accepting work")]
    #[diagnostic(
        code(handoff::pool_unavailable),
        help("The pipeline was shut down while the run was still in flight")
    )]
    PoolUnavailable { pool: PoolKind },

    #[error("Failed to start the {pool} pool: {message}")]
    #[diagnostic(code(handoff::pool_build))]
    PoolBuild { pool: PoolKind, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(handoff::config_not_found),
        help("Run 'handoff config' to print a default configuration")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(handoff::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(handoff::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(handoff::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(handoff::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(handoff::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(handoff::json_error))]
    Json { message: String },

    #[error("TOML error: {message}")]
    #[diagnostic(code(handoff::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PipelineError {
    /// Wrap an error returned by a stage body
    pub fn stage_failed(stage: StageId, source: impl Into<BoxError>) -> Self {
        Self::StageFailed {
            stage,
            source: source.into(),
        }
    }

    /// The stage this error is attributed to, if any
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Self::StageFailed { stage, .. }
            | Self::StagePanicked { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the run ended because its scope was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The error a stage body returned, for downcasting
    pub fn stage_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::StageFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct NetworkError;

    #[test]
    fn test_stage_source_downcasts() {
        let err = PipelineError::stage_failed(StageId::Fetch, NetworkError);

        assert_eq!(err.stage(), Some(StageId::Fetch));
        assert!(err
            .stage_source()
            .and_then(|s| s.downcast_ref::<NetworkError>())
            .is_some());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_cancelled_is_reported() {
        let err = PipelineError::Cancelled {
            stage: StageId::Transform,
        };

        assert!(err.is_cancelled());
        assert!(err.stage_source().is_none());
        assert_eq!(err.to_string(), "Run cancelled at stage 'transform'");
    }

    #[test]
    fn test_pool_errors_have_no_stage() {
        let err = PipelineError::PoolUnavailable {
            pool: PoolKind::Compute,
        };

        assert_eq!(err.stage(), None);
        assert!(err.to_string().contains("compute"));
    }
}
