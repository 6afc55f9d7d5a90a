// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Staged pipeline
//!
//! This module defines the two-stage pipeline, its cancellation scopes, and
//! the configuration the pools are built from.

mod config;
mod executor;
mod scope;
mod validation;

pub use config::*;
pub use executor::{PipelineConsumer, RunHandle, RunId, StageId, StagedPipeline};
pub use scope::Scope;
pub use validation::{PipelineValidator, ValidationResult};
