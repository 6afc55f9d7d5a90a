// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Consumer pool
//!
//! One named OS thread plays the part of a UI thread. It drives a
//! current-thread Tokio runtime with a `LocalSet`; every job posted to it runs
//! there, one at a time. Futures spawned onto it may suspend while other pools
//! work without blocking the thread.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::thread::{self, JoinHandle, ThreadId};

use futures::FutureExt;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use super::{panic_message, PoolKind};
use crate::errors::{PipelineError, PipelineResult};
use crate::pipeline::ConsumerPoolConfig;

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

enum Job {
    Call(Box<dyn FnOnce() + Send + 'static>),
    Spawn(BoxedFuture),
}

/// Single-threaded context where results are delivered
#[derive(Debug)]
pub struct ConsumerPool {
    tx: Option<mpsc::UnboundedSender<Job>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl ConsumerPool {
    /// Start the consumer thread
    pub fn start(config: &ConsumerPoolConfig) -> PipelineResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PipelineError::PoolBuild {
                pool: PoolKind::Consumer,
                message: e.to_string(),
            })?;

        let (tx, rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || serve(runtime, rx))
            .map_err(|e| PipelineError::PoolBuild {
                pool: PoolKind::Consumer,
                message: e.to_string(),
            })?;
        let thread_id = thread.thread().id();

        tracing::debug!(thread = %config.thread_name, "consumer pool started");

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
            thread_id,
        })
    }

    /// Run a closure on the consumer thread
    pub fn post<F>(&self, f: F) -> PipelineResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Job::Call(Box::new(f)))
    }

    /// Drive a future to completion on the consumer thread
    pub fn spawn<Fut>(&self, future: Fut) -> PipelineResult<()>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.send(Job::Spawn(Box::pin(future)))
    }

    /// Whether the caller is running on the consumer thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Stop accepting jobs, let in-flight futures finish, and join the thread
    pub fn shutdown(mut self) {
        self.close();
    }

    fn send(&self, job: Job) -> PipelineResult<()> {
        let unavailable = PipelineError::PoolUnavailable {
            pool: PoolKind::Consumer,
        };
        match &self.tx {
            Some(tx) => tx.send(job).map_err(|_| unavailable),
            None => Err(unavailable),
        }
    }

    fn close(&mut self) {
        self.tx.take();

        let Some(thread) = self.thread.take() else {
            return;
        };

        // Joining from the consumer thread itself would never return.
        if self.is_current() {
            tracing::debug!("consumer pool closed from its own thread; not joining");
            return;
        }

        if thread.join().is_err() {
            tracing::error!("consumer thread terminated abnormally");
        }
    }
}

impl Drop for ConsumerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn serve(runtime: Runtime, mut rx: mpsc::UnboundedReceiver<Job>) {
    let local = LocalSet::new();

    local.block_on(&runtime, async {
        while let Some(job) = rx.recv().await {
            match job {
                Job::Call(f) => {
                    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
                        tracing::error!(
                            panic = %panic_message(payload.as_ref()),
                            "consumer job panicked"
                        );
                    }
                }
                Job::Spawn(future) => {
                    tokio::task::spawn_local(async move {
                        if let Err(payload) = AssertUnwindSafe(future).catch_unwind().await {
                            tracing::error!(
                                panic = %panic_message(payload.as_ref()),
                                "consumer task panicked"
                            );
                        }
                    });
                }
            }
        }
    });

    // The channel is closed; finish whatever is still suspended.
    runtime.block_on(local);
    tracing::debug!("consumer pool stopped");
}
