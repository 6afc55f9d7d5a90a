// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Pipeline executor
//!
//! Runs stage one on the I/O pool, hands its complete output to stage two on
//! the compute pool, and delivers the outcome on the consumer thread.
//!
//! The orchestrating future of each run lives on the consumer thread. It
//! suspends twice (once per stage) and never blocks that thread, so other
//! runs and posted jobs keep being served while stages execute elsewhere.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::errors::{BoxError, PipelineError, PipelineResult};
use crate::pipeline::{PipelineConfig, Scope};
use crate::pool::{ComputePool, ConsumerPool, IoPool, IoRuntime, Task};

/// Position of a stage in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    /// Stage one, on the I/O pool
    Fetch,
    /// Stage two, on the compute pool
    Transform,
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Transform => write!(f, "transform"),
        }
    }
}

/// Identifier of a single run, unique per pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl RunId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Receives the outcome of a run on the consumer thread
pub trait PipelineConsumer<T>: Send + 'static {
    /// Called with the final value of a successful run
    fn on_pipeline_complete(&mut self, result: T);

    /// Called when any stage failed or the run was cancelled
    fn on_pipeline_error(&mut self, error: PipelineError);
}

/// Observes and cancels one run
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    token: CancellationToken,
    done: watch::Receiver<bool>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Whether the outcome has been delivered
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Cancel this run only
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait until the outcome has been delivered
    pub async fn finished(&mut self) {
        // An Err means the run was dropped with the consumer thread; it will
        // never deliver, so there is nothing left to wait for.
        let _ = self.done.wait_for(|done| *done).await;
    }
}

/// Two-stage pipeline over the I/O, compute, and consumer pools
pub struct StagedPipeline {
    // Dropped first: closing the consumer waits for in-flight runs, which
    // still need the pools below.
    consumer: ConsumerPool,
    compute: ComputePool,
    io: IoPool,
    _io_runtime: Option<IoRuntime>,
    next_run: AtomicU64,
}

impl StagedPipeline {
    /// Build a pipeline that owns all three pools
    pub fn new(config: &PipelineConfig) -> PipelineResult<Self> {
        let runtime = IoRuntime::build(&config.io)?;
        let io = runtime.pool();
        Self::assemble(config, io, Some(runtime))
    }

    /// Build a pipeline whose I/O stage runs on an existing Tokio runtime
    pub fn with_io_handle(config: &PipelineConfig, handle: Handle) -> PipelineResult<Self> {
        Self::assemble(config, IoPool::from_handle(handle), None)
    }

    fn assemble(
        config: &PipelineConfig,
        io: IoPool,
        io_runtime: Option<IoRuntime>,
    ) -> PipelineResult<Self> {
        let compute = ComputePool::build(&config.compute)?;
        let consumer = ConsumerPool::start(&config.consumer)?;

        // The io section only takes effect when the pipeline owns the runtime.
        if io_runtime.is_some() {
            tracing::info!(
                compute_threads = compute.threads(),
                io_worker_threads = config.io.worker_threads,
                max_blocking_threads = config.io.max_blocking_threads,
                consumer = %config.consumer.thread_name,
                "pipeline ready"
            );
        } else {
            tracing::info!(
                compute_threads = compute.threads(),
                consumer = %config.consumer.thread_name,
                "pipeline ready on the caller's runtime"
            );
        }

        Ok(Self {
            consumer,
            compute,
            io,
            _io_runtime: io_runtime,
            next_run: AtomicU64::new(1),
        })
    }

    /// The consumer thread results are delivered on
    pub fn consumer(&self) -> &ConsumerPool {
        &self.consumer
    }

    pub fn io_pool(&self) -> &IoPool {
        &self.io
    }

    pub fn compute_pool(&self) -> &ComputePool {
        &self.compute
    }

    /// Start a run
    ///
    /// `stage1` runs on the I/O pool, `stage2` on the compute pool with the
    /// complete output of `stage1`, and `on_complete` on the consumer thread,
    /// exactly once, with either the final value or the first failure.
    ///
    /// Returns [`PipelineError::PoolUnavailable`] when the consumer thread no
    /// longer accepts work, in which case nothing is delivered.
    pub fn run<T1, T2, E1, E2, S1, S2, C>(
        &self,
        scope: &Scope,
        stage1: S1,
        stage2: S2,
        on_complete: C,
    ) -> PipelineResult<RunHandle>
    where
        S1: FnOnce() -> Result<T1, E1> + Send + 'static,
        S2: FnOnce(T1) -> Result<T2, E2> + Send + 'static,
        T1: Send + 'static,
        T2: Send + 'static,
        E1: Into<BoxError> + Send + 'static,
        E2: Into<BoxError> + Send + 'static,
        C: FnOnce(PipelineResult<T2>) + Send + 'static,
    {
        let id = RunId(self.next_run.fetch_add(1, Ordering::Relaxed));
        let token = scope.register();
        let (done_tx, done_rx) = watch::channel(false);

        let io = self.io.clone();
        let compute = self.compute.clone();
        let run_token = token.clone();
        let span = tracing::debug_span!("run", run_id = id.get());

        let orchestrate = async move {
            let start = Instant::now();
            let result = drive(&io, &compute, &run_token, stage1, stage2).await;

            match &result {
                Ok(_) => tracing::debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "run completed"
                ),
                Err(e) => tracing::debug!(error = %e, "run failed"),
            }

            let _done = MarkDone(done_tx);
            on_complete(result);
        };

        self.consumer.spawn(orchestrate.instrument(span))?;

        Ok(RunHandle {
            id,
            token,
            done: done_rx,
        })
    }

    /// Start a run whose outcome goes to a [`PipelineConsumer`]
    pub fn run_with<T1, T2, E1, E2, S1, S2, C>(
        &self,
        scope: &Scope,
        stage1: S1,
        stage2: S2,
        mut consumer: C,
    ) -> PipelineResult<RunHandle>
    where
        S1: FnOnce() -> Result<T1, E1> + Send + 'static,
        S2: FnOnce(T1) -> Result<T2, E2> + Send + 'static,
        T1: Send + 'static,
        T2: Send + 'static,
        E1: Into<BoxError> + Send + 'static,
        E2: Into<BoxError> + Send + 'static,
        C: PipelineConsumer<T2>,
    {
        self.run(scope, stage1, stage2, move |result| match result {
            Ok(value) => consumer.on_pipeline_complete(value),
            Err(e) => consumer.on_pipeline_error(e),
        })
    }

    /// Stop accepting runs and wait for in-flight runs to deliver
    pub fn shutdown(self) {
        let StagedPipeline { consumer, .. } = self;
        consumer.shutdown();
    }
}

/// Flips a run's done flag once delivery has happened, even if the
/// continuation panics
struct MarkDone(watch::Sender<bool>);

impl Drop for MarkDone {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// The two stages of one run, with a cancellation check at each boundary
async fn drive<T1, T2, E1, E2, S1, S2>(
    io: &IoPool,
    compute: &ComputePool,
    token: &CancellationToken,
    stage1: S1,
    stage2: S2,
) -> PipelineResult<T2>
where
    S1: FnOnce() -> Result<T1, E1> + Send + 'static,
    S2: FnOnce(T1) -> Result<T2, E2> + Send + 'static,
    T1: Send + 'static,
    T2: Send + 'static,
    E1: Into<BoxError>,
    E2: Into<BoxError>,
{
    checkpoint(token, StageId::Fetch)?;
    let fetched = suspend(io.submit(StageId::Fetch, stage1), token).await?;

    checkpoint(token, StageId::Transform)?;
    let transformed = suspend(
        compute.submit(StageId::Transform, move || stage2(fetched)),
        token,
    )
    .await?;

    Ok(transformed)
}

fn checkpoint(token: &CancellationToken, stage: StageId) -> PipelineResult<()> {
    if token.is_cancelled() {
        return Err(PipelineError::Cancelled { stage });
    }
    Ok(())
}

async fn suspend<T>(task: Task<T>, token: &CancellationToken) -> PipelineResult<T> {
    let stage = task.stage();

    // Cancellation wins a tie; the abandoned body finishes on its pool and its
    // result is dropped.
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled { stage }),
        result = task => result,
    }
}
