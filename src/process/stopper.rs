// src/process/stopper.rs

//! Out-of-band stop handle for a running child process.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

/// Command delivered to the supervisor's wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopCommand {
    /// Ask the child to finish by writing `q\n` to its stdin.
    Graceful,
    /// Kill the child.
    Forceful,
}

/// Clonable handle that can stop the child a supervisor is running.
///
/// Create one, pass a clone to [`Supervisor::stopper`] (or
/// [`FfmpegJob::stopper`]) before executing, and keep the original to
/// stop the child from another task:
///
/// - [`Stopper::stop_gracefully`] sends `q\n` on the child's stdin, which
///   ffmpeg honours by flushing and finishing the output file
/// - [`Stopper::stop_forcefully`] kills the child outright
///
/// Commands sent while no execution is in flight are dropped.
///
/// [`Supervisor::stopper`]: crate::process::Supervisor::stopper
/// [`FfmpegJob::stopper`]: crate::ffmpeg::FfmpegJob::stopper
#[derive(Clone)]
pub struct Stopper {
    tx: mpsc::UnboundedSender<StopCommand>,
    rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<StopCommand>>>>,
}

impl Stopper {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Request a graceful stop (`q\n` on the child's stdin).
    pub fn stop_gracefully(&self) {
        if self.tx.send(StopCommand::Graceful).is_err() {
            debug!("graceful stop requested but no supervisor is listening");
        }
    }

    /// Kill the child process.
    pub fn stop_forcefully(&self) {
        if self.tx.send(StopCommand::Forceful).is_err() {
            debug!("forceful stop requested but no supervisor is listening");
        }
    }

    /// Hand the command receiver to the supervisor. Single-shot.
    pub(crate) fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<StopCommand>> {
        self.rx.lock().expect("stopper lock poisoned").take()
    }
}

impl Default for Stopper {
    fn default() -> Self {
        Self::new()
    }
}
