// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Execution pools
//!
//! A run touches three pools: blocking I/O work goes to the [`IoPool`],
//! CPU-bound work to the [`ComputePool`], and delivery happens on the single
//! [`ConsumerPool`] thread. Work submitted to the first two comes back as a
//! [`Task`], a future that resolves once the body has fully completed.

mod compute;
mod consumer;
mod io;

pub use compute::ComputePool;
pub use consumer::ConsumerPool;
pub use io::{IoPool, IoRuntime};

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::sync::oneshot;

use crate::errors::{BoxError, PipelineError, PipelineResult};
use crate::pipeline::StageId;

/// Identifies where a stage body runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Blocking, I/O-bound work
    Io,
    /// CPU-bound work, sized to available parallelism
    Compute,
    /// The single thread results are delivered on
    Consumer,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "io"),
            Self::Compute => write!(f, "compute"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// Handle to a stage body submitted to a pool
///
/// Resolves to the body's complete output, never a partial one. If the pool
/// drops the body without running it the task resolves to
/// [`PipelineError::PoolUnavailable`].
#[derive(Debug)]
pub struct Task<T> {
    stage: StageId,
    pool: PoolKind,
    rx: oneshot::Receiver<PipelineResult<T>>,
}

impl<T> Task<T> {
    fn channel(stage: StageId, pool: PoolKind) -> (oneshot::Sender<PipelineResult<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { stage, pool, rx })
    }

    /// Stage this task belongs to
    pub fn stage(&self) -> StageId {
        self.stage
    }

    /// Pool the body was submitted to
    pub fn pool(&self) -> PoolKind {
        self.pool
    }
}

impl<T> Future for Task<T> {
    type Output = PipelineResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(PipelineError::PoolUnavailable { pool: this.pool })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Run a stage body, turning returned errors and panics into [`PipelineError`]
fn run_guarded<T, E, F>(stage: StageId, body: F) -> PipelineResult<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(PipelineError::stage_failed(stage, e)),
        Err(payload) => Err(PipelineError::StagePanicked {
            stage,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_guarded_passes_value_through() {
        let result = run_guarded(StageId::Fetch, || Ok::<_, std::io::Error>(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_run_guarded_wraps_error() {
        let result: PipelineResult<()> =
            run_guarded(StageId::Transform, || Err("bad pixel data"));

        match result {
            Err(PipelineError::StageFailed { stage, source }) => {
                assert_eq!(stage, StageId::Transform);
                assert_eq!(source.to_string(), "bad pixel data");
            }
            other => panic!("Expected StageFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_run_guarded_catches_panic() {
        let result: PipelineResult<()> = run_guarded(StageId::Fetch, || -> Result<(), BoxError> {
            panic!("socket exploded")
        });

        match result {
            Err(PipelineError::StagePanicked { stage, message }) => {
                assert_eq!(stage, StageId::Fetch);
                assert_eq!(message, "socket exploded");
            }
            other => panic!("Expected StagePanicked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_task_reports_dropped_sender() {
        let (tx, task) = Task::<u32>::channel(StageId::Transform, PoolKind::Compute);
        drop(tx);

        match task.await {
            Err(PipelineError::PoolUnavailable { pool }) => assert_eq!(pool, PoolKind::Compute),
            other => panic!("Expected PoolUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_task_resolves_sent_result() {
        let (tx, task) = Task::channel(StageId::Fetch, PoolKind::Io);
        assert_eq!(task.stage(), StageId::Fetch);
        assert_eq!(task.pool(), PoolKind::Io);

        tx.send(Ok("done")).unwrap();
        assert_eq!(task.await.unwrap(), "done");
    }
}
