use crate::{Error, ErrorContext, Result};
use std::future::Future;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

/// Execution context for request completions, allocated per started period.
#[derive(Clone)]
pub(crate) struct WorkerPool {
    handle: Handle,
    tasks: TaskTracker,
}

impl WorkerPool {
    /// Use `handle` when given, otherwise the runtime `start()` is running on.
    pub(crate) fn new(handle: Option<Handle>) -> Result<Self> {
        let handle = match handle {
            Some(h) => h,
            None => Handle::try_current().map_err(|e| {
                Error::configuration_with_context(
                    "no tokio runtime available for request workers",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("worker_pool"),
                )
            })?,
        };
        Ok(Self {
            handle,
            tasks: TaskTracker::new(),
        })
    }

    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let _ = self.tasks.spawn_on(task, &self.handle);
    }

    /// Close the pool. Running tasks are left alone; returns how many were still running.
    pub(crate) fn shutdown(&self) -> usize {
        self.tasks.close();
        self.tasks.len()
    }
}
