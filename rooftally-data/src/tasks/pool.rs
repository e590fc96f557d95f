//! Fixed-size pool for blocking work.

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// Default number of concurrent blocking jobs.
pub const DEFAULT_WORKERS: usize = 8;

/// Errors from [`WorkerPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool's semaphore was closed.
    #[error("worker pool is closed")]
    Closed,
    /// No Tokio runtime was available to schedule the job.
    #[error("no Tokio runtime is running")]
    NoRuntime,
    /// The job panicked or was cancelled.
    #[error("worker job failed: {0}")]
    Join(#[from] JoinError),
}

/// Bounds concurrent blocking jobs with a semaphore in front of
/// [`tokio::task::spawn_blocking`].
///
/// Clones share the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl WorkerPool {
    /// Create a pool running at most `size` jobs at once (minimum one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum concurrent jobs.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a job.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on a blocking thread once a permit is free.
    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await?;
        Ok(result)
    }

    /// The runtime [`Self::spawn_on`] schedules onto.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoRuntime`] outside a Tokio runtime.
    pub fn current_runtime() -> Result<Handle, PoolError> {
        Handle::try_current().map_err(|_| PoolError::NoRuntime)
    }

    /// Queue `job` on the current runtime without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoRuntime`] outside a Tokio runtime; `job` is
    /// dropped unrun.
    pub fn spawn<F>(&self, job: F) -> Result<JoinHandle<Result<(), PoolError>>, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        Ok(self.spawn_on(&Self::current_runtime()?, job))
    }

    /// Queue `job` on `runtime` without waiting for it.
    pub fn spawn_on<F>(&self, runtime: &Handle, job: F) -> JoinHandle<Result<(), PoolError>>
    where
        F: FnOnce() + Send + 'static,
    {
        let pool = self.clone();
        runtime.spawn(async move { pool.run(job).await })
    }
}
