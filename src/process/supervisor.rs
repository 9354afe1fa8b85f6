// src/process/supervisor.rs

//! Child process lifecycle: spawn, concurrent stream draining, bounded
//! quiesce, cleanup and result reporting.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::errors::{FfdriveError, Result};
use crate::exec::{Executor, Worker};
use crate::process::reader::{Gobbler, StdReader, StreamHandle};
use crate::process::stopper::{StopCommand, Stopper};

/// How long the supervisor waits for helper and reader workers to finish
/// after the child has exited. On expiry it proceeds; the stuck workers
/// are aborted in the cleanup phase.
const EXECUTOR_QUIESCE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Deferred argv computation, evaluated exactly once at the start of
/// [`Supervisor::execute`], after helper workers have been primed.
pub type ArgumentsSupplier = Box<dyn FnOnce() -> Result<Vec<String>> + Send>;

/// Write-once result cell shared between the stream reader workers and
/// the supervisor. The first `set` wins.
struct ResultSlot<T>(Arc<Mutex<Option<T>>>);

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> ResultSlot<T> {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    /// Store `value` if the slot is empty; otherwise hand it back.
    fn set(&self, value: T) -> Option<T> {
        let mut guard = self.0.lock().expect("result slot lock poisoned");
        if guard.is_some() {
            Some(value)
        } else {
            *guard = Some(value);
            None
        }
    }

    fn take(&self) -> Option<T> {
        self.0.lock().expect("result slot lock poisoned").take()
    }
}

/// Runs one external process to completion.
///
/// Configuration uses consuming builder methods, so a supervisor cannot
/// be reconfigured once [`Supervisor::execute`] has consumed it. A single
/// `execute` call:
///
/// 1. starts the helper workers,
/// 2. resolves and logs the argument vector,
/// 3. spawns the child with piped stdio,
/// 4. drains stdout/stderr through the configured readers, collecting at
///    most one result,
/// 5. waits for the child to exit, servicing stop requests meanwhile,
/// 6. waits (bounded) for the workers to quiesce,
/// 7. always cleans up: destroys a still-live child before its stream
///    handles are torn down, then aborts leftover workers,
/// 8. reports the first worker error, an interruption, a non-zero exit
///    status, a missing result, or the result — in that order.
pub struct Supervisor<T> {
    executable: PathBuf,
    context_name: String,
    stdout_reader: Box<dyn StdReader<T>>,
    stderr_reader: Box<dyn StdReader<T>>,
    helpers: Vec<Worker>,
    stopper: Option<Stopper>,
    arguments: Option<ArgumentsSupplier>,
}

impl<T> fmt::Debug for Supervisor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("executable", &self.executable)
            .field("context_name", &self.context_name)
            .field("helpers", &self.helpers.len())
            .finish_non_exhaustive()
    }
}

impl<T: Send + fmt::Debug + 'static> Supervisor<T> {
    /// New supervisor for `executable`. Both stream readers default to
    /// [`Gobbler`].
    pub fn new(executable: impl Into<PathBuf>, context_name: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            context_name: context_name.into(),
            stdout_reader: Box::new(Gobbler),
            stderr_reader: Box::new(Gobbler),
            helpers: Vec::new(),
            stopper: None,
            arguments: None,
        }
    }

    pub fn stdout_reader(mut self, reader: Box<dyn StdReader<T>>) -> Self {
        self.stdout_reader = reader;
        self
    }

    pub fn stderr_reader(mut self, reader: Box<dyn StdReader<T>>) -> Self {
        self.stderr_reader = reader;
        self
    }

    /// Add a worker to run in parallel with the child process.
    pub fn helper(mut self, worker: Worker) -> Self {
        self.helpers.push(worker);
        self
    }

    pub fn helpers(mut self, workers: Vec<Worker>) -> Self {
        self.helpers.extend(workers);
        self
    }

    pub fn stopper(mut self, stopper: Stopper) -> Self {
        self.stopper = Some(stopper);
        self
    }

    /// Fixed argument vector.
    pub fn arguments(self, args: Vec<String>) -> Self {
        self.arguments_with(move || Ok(args))
    }

    /// Deferred argument vector, evaluated once at execute time.
    pub fn arguments_with(
        mut self,
        supplier: impl FnOnce() -> Result<Vec<String>> + Send + 'static,
    ) -> Self {
        self.arguments = Some(Box::new(supplier));
        self
    }

    /// Run the process to completion. Single-shot.
    pub async fn execute(mut self) -> Result<T> {
        info!(
            context = %self.context_name,
            executable = %self.executable.display(),
            "starting process"
        );

        let executor = Executor::new(self.context_name.clone());
        let outcome = self.run(&executor).await;
        executor.stop();
        outcome
    }

    async fn run(&mut self, executor: &Executor) -> Result<T> {
        // Helpers go first: loopback listeners are already bound, and the
        // serve loops must be live before the child dials in.
        for (i, worker) in self.helpers.drain(..).enumerate() {
            executor.execute(&format!("helper-{i}"), worker);
        }

        let supplier = self.arguments.take().ok_or_else(|| {
            FfdriveError::IllegalState("no arguments supplier configured".to_string())
        })?;
        let args = supplier()?;

        info!(
            context = %self.context_name,
            command = %join_arguments(&self.executable, &args),
            "command constructed"
        );

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let mut stdin = child.stdin.take();

        let result = self.interact(&mut child, &mut stdin, executor).await;

        // The child must be gone before any of its stream handles are
        // torn down; closing pipes of a live child can hang on some
        // platforms.
        destroy_quietly(&mut child).await;
        drop(stdin);

        result
    }

    async fn interact(
        &mut self,
        child: &mut Child,
        stdin: &mut Option<ChildStdin>,
        executor: &Executor,
    ) -> Result<T> {
        let slot = ResultSlot::new();
        self.start_reading_output(child, executor, &slot)?;

        let mut stop_rx = self.stopper.as_ref().and_then(Stopper::take_receiver);

        info!(context = %self.context_name, "waiting for process to exit");

        let mut interrupted = false;
        let mut wait_error: Option<std::io::Error> = None;
        let mut status = None;
        loop {
            tokio::select! {
                res = child.wait() => {
                    match res {
                        Ok(s) => status = Some(s),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                            warn!(context = %self.context_name, "interrupted while waiting for process");
                            interrupted = true;
                        }
                        Err(e) => wait_error = Some(e),
                    }
                    break;
                }
                cmd = recv_stop(&mut stop_rx) => {
                    self.handle_stop_command(cmd, child, stdin).await;
                }
            }
        }

        if let Some(status) = status {
            info!(
                context = %self.context_name,
                code = ?status.code(),
                "process finished"
            );
        }

        if !interrupted {
            executor.wait_idle(EXECUTOR_QUIESCE_TIMEOUT).await;
        }

        // Report in fixed priority: worker error, interruption, wait
        // failure, exit status, missing result.
        if let Some(err) = executor.take_error() {
            return Err(FfdriveError::Worker(Box::new(err)));
        }
        if interrupted {
            return Err(FfdriveError::Interrupted);
        }
        if let Some(err) = wait_error {
            return Err(err.into());
        }
        let code = status.map(|s| s.code().unwrap_or(-1)).unwrap_or(-1);
        if code != 0 {
            return Err(FfdriveError::NonZeroExit(code));
        }
        match slot.take() {
            Some(result) => Ok(result),
            None => Err(FfdriveError::NoResult),
        }
    }

    fn start_reading_output(
        &mut self,
        child: &mut Child,
        executor: &Executor,
        slot: &ResultSlot<T>,
    ) -> Result<()> {
        debug!(context = %self.context_name, "starting stream readers");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FfdriveError::IllegalState("child stdout is not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FfdriveError::IllegalState("child stderr is not piped".to_string()))?;

        let stdout_reader = std::mem::replace(&mut self.stdout_reader, Box::new(Gobbler));
        let stderr_reader = std::mem::replace(&mut self.stderr_reader, Box::new(Gobbler));

        executor.execute(
            "stdout",
            read_into_slot("stdout", stdout_reader, Box::new(stdout), slot.clone()),
        );
        executor.execute(
            "stderr",
            read_into_slot("stderr", stderr_reader, Box::new(stderr), slot.clone()),
        );
        Ok(())
    }

    async fn write_quit(stdin: &mut ChildStdin) -> std::io::Result<()> {
        stdin.write_all(b"q\n").await?;
        stdin.flush().await
    }

    async fn handle_stop_command(
        &self,
        cmd: StopCommand,
        child: &mut Child,
        stdin: &mut Option<ChildStdin>,
    ) {
        match cmd {
            StopCommand::Graceful => {
                info!(
                    context = %self.context_name,
                    "graceful stop requested; sending quit command on stdin"
                );
                match stdin.as_mut() {
                    Some(handle) => {
                        if let Err(err) = Self::write_quit(handle).await {
                            warn!(
                                context = %self.context_name,
                                error = %err,
                                "failed to send quit command to process"
                            );
                        }
                    }
                    None => warn!(
                        context = %self.context_name,
                        "graceful stop requested but process stdin is gone"
                    ),
                }
            }
            StopCommand::Forceful => {
                info!(context = %self.context_name, "forceful stop requested; killing process");
                if let Err(err) = child.start_kill() {
                    warn!(
                        context = %self.context_name,
                        error = %err,
                        "failed to kill process"
                    );
                }
            }
        }
    }
}

/// Runs a stream reader and routes its value into the write-once slot.
fn read_into_slot<T: Send + fmt::Debug + 'static>(
    stream_name: &'static str,
    reader: Box<dyn StdReader<T>>,
    stream: StreamHandle,
    slot: ResultSlot<T>,
) -> Worker {
    Box::pin(async move {
        if let Some(value) = reader.read(stream).await? {
            if let Some(rejected) = slot.set(value) {
                warn!(
                    stream = stream_name,
                    result = ?rejected,
                    "ignoring stream result; result slot already filled"
                );
            }
        }
        Ok(())
    })
}

async fn recv_stop(rx: &mut Option<mpsc::UnboundedReceiver<StopCommand>>) -> StopCommand {
    match rx {
        Some(rx) => match rx.recv().await {
            Some(cmd) => cmd,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

/// Kill the child if it is still alive, suppressing (but logging) any
/// failure. Also reaps an already-exited child.
async fn destroy_quietly(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            trace!(code = ?status.code(), "child already exited");
        }
        _ => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill child process during cleanup");
            }
        }
    }
}

/// Join argv for logging. Tokens containing spaces are wrapped in `"`;
/// nothing else is escaped. Display only — the child is spawned from the
/// argv array, never through a shell.
fn join_arguments(executable: &Path, args: &[String]) -> String {
    let executable = executable.display().to_string();
    let mut joined = String::new();
    for (i, token) in std::iter::once(executable.as_str())
        .chain(args.iter().map(String::as_str))
        .enumerate()
    {
        if i > 0 {
            joined.push(' ');
        }
        if token.contains(' ') {
            joined.push('"');
            joined.push_str(token);
            joined.push('"');
        } else {
            joined.push_str(token);
        }
    }
    joined
}
