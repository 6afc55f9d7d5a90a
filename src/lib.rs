// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! # handoff - Two-stage pipeline across execution pools
//!
//! `handoff` runs a blocking first stage on an I/O pool, hands its complete
//! output to a CPU-bound second stage on a compute pool, and delivers the
//! outcome exactly once on a single consumer thread.
//!
//! ## Features
//!
//! - **Three pools** - I/O, compute, and a single-threaded consumer
//! - **Exactly-once delivery** - success or the first failure, never both
//! - **Scoped cancellation** - cancel a scope and every run started in it stops
//!   at its next stage boundary
//!
//! ## Example
//!
//! ```no_run
//! use handoff::{PipelineConfig, Scope, StagedPipeline};
//!
//! let pipeline = StagedPipeline::new(&PipelineConfig::default())?;
//! let scope = Scope::new();
//!
//! pipeline.run(
//!     &scope,
//!     || Ok::<_, std::io::Error>(std::fs::read("input.pgm")?),
//!     |bytes| Ok::<_, std::io::Error>(bytes.len()),
//!     |result| println!("{:?}", result),
//! )?;
//!
//! pipeline.shutdown();
//! # Ok::<(), handoff::PipelineError>(())
//! ```

pub mod cli;
pub mod errors;
pub mod imaging;
pub mod pipeline;
pub mod pool;
pub mod utils;

// Re-export commonly used types
pub use errors::{BoxError, PipelineError, PipelineResult};
pub use pipeline::{
    PipelineConfig, PipelineConsumer, RunHandle, RunId, Scope, StageId, StagedPipeline,
};
pub use pool::PoolKind;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
