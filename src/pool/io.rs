// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! I/O pool
//!
//! Stage bodies run on Tokio's blocking thread pool, so a slow network read
//! occupies one blocking thread and never an async worker.

use std::time::Instant;

use tokio::runtime::{Builder, Handle, Runtime};

use super::{run_guarded, PoolKind, Task};
use crate::errors::{BoxError, PipelineError, PipelineResult};
use crate::pipeline::{IoPoolConfig, StageId};

/// Submits blocking stage bodies to a Tokio runtime
#[derive(Debug, Clone)]
pub struct IoPool {
    handle: Handle,
}

impl IoPool {
    /// Use an existing runtime, e.g. the one driving `main`
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Runtime handle backing this pool
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Submit a blocking stage body
    pub fn submit<T, E, F>(&self, stage: StageId, body: F) -> Task<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        let (tx, task) = Task::channel(stage, PoolKind::Io);

        // A runtime that is shutting down drops the closure, and with it `tx`.
        self.handle.spawn_blocking(move || {
            let start = Instant::now();
            let result = run_guarded(stage, body);
            tracing::debug!(
                %stage,
                pool = %PoolKind::Io,
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

/// Tokio runtime owned by a pipeline
///
/// Dropping it shuts the runtime down in the background, which is safe even
/// from inside async code.
#[derive(Debug)]
pub struct IoRuntime {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl IoRuntime {
    /// Build a multi-threaded runtime from configuration
    pub fn build(config: &IoPoolConfig) -> PipelineResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| PipelineError::PoolBuild {
                pool: PoolKind::Io,
                message: e.to_string(),
            })?;

        tracing::debug!(
            worker_threads = config.worker_threads,
            max_blocking_threads = config.max_blocking_threads,
            "io pool started"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Pool submitting to this runtime
    pub fn pool(&self) -> IoPool {
        IoPool::from_handle(self.handle.clone())
    }
}

impl Drop for IoRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_runtime_runs_body() {
        let runtime = IoRuntime::build(&IoPoolConfig::default()).unwrap();
        let pool = runtime.pool();

        let task = pool.submit(StageId::Fetch, || Ok::<_, BoxError>(vec![1u8, 2, 3]));
        let bytes = futures::executor::block_on(task).unwrap();

        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_body_runs_on_io_thread() {
        let config = IoPoolConfig {
            thread_name: "test-io".into(),
            ..IoPoolConfig::default()
        };
        let runtime = IoRuntime::build(&config).unwrap();

        let task = runtime.pool().submit(StageId::Fetch, || {
            Ok::<_, BoxError>(std::thread::current().name().map(str::to_string))
        });
        let name = futures::executor::block_on(task).unwrap();

        assert_eq!(name.as_deref(), Some("test-io"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_from_current_handle() {
        let pool = IoPool::from_handle(Handle::current());

        let result = pool.submit(StageId::Fetch, || Err::<(), _>("unreachable host")).await;

        assert!(matches!(
            result,
            Err(PipelineError::StageFailed {
                stage: StageId::Fetch,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_drop_inside_async_context() {
        let runtime = IoRuntime::build(&IoPoolConfig::default()).unwrap();
        let value = runtime.pool().submit(StageId::Fetch, || Ok::<_, BoxError>(5)).await;
        drop(runtime);

        assert_eq!(value.unwrap(), 5);
    }
}
