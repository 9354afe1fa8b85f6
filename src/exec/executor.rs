// src/exec/executor.rs

//! Named-worker executor with first-error capture.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::errors::FfdriveError;

/// A single-shot unit of work run alongside the child process.
///
/// Workers do not return values; they report failure through their
/// `Result`, which the executor captures instead of propagating across
/// the task boundary.
pub type Worker = Pin<Box<dyn std::future::Future<Output = crate::errors::Result<()>> + Send>>;

/// Runs named workers concurrently on the Tokio runtime.
///
/// - the first worker error is recorded; later errors are logged and
///   dropped
/// - workers are never restarted
/// - [`Executor::stop`] aborts all started workers and refuses new ones;
///   it never touches the child process itself
pub struct Executor {
    context_name: String,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    next_id: u64,
    running: Vec<(u64, String)>,
    first_error: Option<FfdriveError>,
    handles: Vec<JoinHandle<()>>,
    stopped: bool,
}

/// Removes a worker from the running set even when its task is aborted
/// mid-await.
struct RunningGuard {
    inner: Arc<Mutex<Inner>>,
    id: u64,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().expect("executor state lock poisoned");
        inner.running.retain(|(id, _)| *id != self.id);
    }
}

impl Executor {
    pub fn new(context_name: impl Into<String>) -> Self {
        Self {
            context_name: context_name.into(),
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                running: Vec::new(),
                first_error: None,
                handles: Vec::new(),
                stopped: false,
            })),
        }
    }

    /// Start `worker` on a fresh task labelled `name`. Non-blocking.
    ///
    /// Workers submitted after [`Executor::stop`] are not started.
    pub fn execute(&self, name: &str, worker: Worker) {
        let id = {
            let mut inner = self.inner.lock().expect("executor state lock poisoned");
            if inner.stopped {
                debug!(
                    context = %self.context_name,
                    worker = %name,
                    "executor already stopped; worker not started"
                );
                return;
            }

            let id = inner.next_id;
            inner.next_id += 1;
            inner.running.push((id, name.to_string()));
            id
        };

        let guard = RunningGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let state = Arc::clone(&self.inner);
        let context = self.context_name.clone();
        let worker_name = name.to_string();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            trace!(context = %context, worker = %worker_name, "worker started");
            match worker.await {
                Ok(()) => {
                    trace!(context = %context, worker = %worker_name, "worker finished");
                }
                Err(err) => {
                    let mut inner = state.lock().expect("executor state lock poisoned");
                    if inner.first_error.is_none() {
                        debug!(
                            context = %context,
                            worker = %worker_name,
                            error = %err,
                            "worker failed; recording as first error"
                        );
                        inner.first_error = Some(err);
                    } else {
                        warn!(
                            context = %context,
                            worker = %worker_name,
                            error = %err,
                            "worker failed after another error was already recorded; dropping"
                        );
                    }
                }
            }
        });

        let mut inner = self.inner.lock().expect("executor state lock poisoned");
        if inner.stopped {
            // stop() raced with the spawn above; the new task must not
            // outlive the executor.
            handle.abort();
        } else {
            inner.handles.push(handle);
        }
    }

    /// The first error captured from any worker, if one has failed.
    ///
    /// Once the executor has quiesced this reflects the final error state.
    pub fn take_error(&self) -> Option<FfdriveError> {
        self.inner
            .lock()
            .expect("executor state lock poisoned")
            .first_error
            .take()
    }

    /// True while at least one started worker has not yet terminated.
    pub fn is_running(&self) -> bool {
        !self
            .inner
            .lock()
            .expect("executor state lock poisoned")
            .running
            .is_empty()
    }

    /// Snapshot of currently-running worker names. Diagnostic only.
    pub fn running_worker_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("executor state lock poisoned")
            .running
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Abort all started workers and refuse new ones. Idempotent.
    pub fn stop(&self) {
        let handles = {
            let mut inner = self.inner.lock().expect("executor state lock poisoned");
            inner.stopped = true;
            std::mem::take(&mut inner.handles)
        };
        if !handles.is_empty() {
            debug!(
                context = %self.context_name,
                workers = handles.len(),
                "stopping executor"
            );
        }
        for handle in handles {
            handle.abort();
        }
    }

    /// Wait for all workers to terminate, bounded by `timeout`.
    ///
    /// On expiry the wait is abandoned with a warning; the workers keep
    /// running until [`Executor::stop`] aborts them.
    pub async fn wait_idle(&self, timeout: Duration) {
        debug!(context = %self.context_name, "waiting for executor to quiesce");

        let started = Instant::now();
        while self.is_running() {
            if started.elapsed() > timeout {
                warn!(
                    context = %self.context_name,
                    timeout_ms = timeout.as_millis() as u64,
                    workers = ?self.running_worker_names(),
                    "executor has not quiesced within timeout; not waiting longer"
                );
                break;
            }
            trace!(
                context = %self.context_name,
                workers = ?self.running_worker_names(),
                "executor still has running workers"
            );
            sleep(Duration::from_millis(100)).await;
        }
    }
}
