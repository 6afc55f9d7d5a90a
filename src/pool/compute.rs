// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Compute pool backed by a dedicated rayon thread pool

use std::sync::Arc;
use std::time::Instant;

use super::{run_guarded, PoolKind, Task};
use crate::errors::{BoxError, PipelineError, PipelineResult};
use crate::pipeline::{ComputePoolConfig, StageId};

/// Submits CPU-bound stage bodies to a rayon pool
///
/// Parallel iterators used inside a body run on this same pool.
#[derive(Debug, Clone)]
pub struct ComputePool {
    pool: Arc<rayon::ThreadPool>,
}

impl ComputePool {
    /// Build the pool, sized from config or the available parallelism
    pub fn build(config: &ComputePoolConfig) -> PipelineResult<Self> {
        let threads = config.resolved_threads();
        let prefix = config.thread_name.clone();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| PipelineError::PoolBuild {
                pool: PoolKind::Compute,
                message: e.to_string(),
            })?;

        tracing::debug!(threads, "compute pool started");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Submit a CPU-bound stage body
    pub fn submit<T, E, F>(&self, stage: StageId, body: F) -> Task<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        let (tx, task) = Task::channel(stage, PoolKind::Compute);

        self.pool.spawn(move || {
            let start = Instant::now();
            let result = run_guarded(stage, body);
            tracing::debug!(
                %stage,
                pool = %PoolKind::Compute,
                ok = result.is_ok(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "stage body finished"
            );

            if tx.send(result).is_err() {
                tracing::debug!(%stage, "no run waiting for stage result");
            }
        });

        task
    }
}
