//! Tokio-backed scheduling: the spawner and a self-contained runtime.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tracing::info;

use crate::core::{Spawn, StreamEventPublisher};

/// Spawns scheduled cycles onto a tokio runtime through its handle.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Spawner bound to `handle`.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on, if any.
    #[must_use]
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Handle of the runtime tasks are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}

/// A publisher together with the dedicated runtime that drives it.
///
/// Dropping it cancels the schedule and then shuts the runtime down; drop it
/// (or call [`ListenerRuntime::shutdown`]) outside of any async context.
pub struct ListenerRuntime {
    // Field order matters: the publisher cancels its tasks before the runtime goes.
    publisher: StreamEventPublisher<TokioSpawner>,
    runtime: Runtime,
}

impl ListenerRuntime {
    /// Build a multi-thread runtime with `worker_threads` threads and an
    /// enabled publisher on top of it.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while building the runtime.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("stream-listener")
            .enable_all()
            .build()?;
        let publisher = StreamEventPublisher::new(TokioSpawner::new(runtime.handle().clone()));
        Ok(Self { publisher, runtime })
    }

    /// Reconfigure the publisher before it is started.
    #[must_use]
    pub fn configure<F>(self, f: F) -> Self
    where
        F: FnOnce(StreamEventPublisher<TokioSpawner>) -> StreamEventPublisher<TokioSpawner>,
    {
        let Self { publisher, runtime } = self;
        Self {
            publisher: f(publisher),
            runtime,
        }
    }

    /// The publisher.
    #[must_use]
    pub const fn publisher(&self) -> &StreamEventPublisher<TokioSpawner> {
        &self.publisher
    }

    /// Handle of the dedicated runtime.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Run a future to completion on the dedicated runtime.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel the schedule and give in-flight cycles up to `timeout` to finish.
    pub fn shutdown(self, timeout: Duration) {
        let Self { publisher, runtime } = self;
        publisher.shutdown();
        drop(publisher);
        runtime.shutdown_timeout(timeout);
        info!("stream listener runtime stopped");
    }
}
