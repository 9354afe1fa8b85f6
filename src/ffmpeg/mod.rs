// src/ffmpeg/mod.rs

//! Declarative ffmpeg jobs.
//!
//! [`FfmpegJob`] accumulates inputs, outputs, global options and an
//! optional filter graph, then executes the job under a
//! [`Supervisor`](crate::process::Supervisor):
//!
//! - [`arg`] — a single command-line option
//! - [`input`] / [`output`] — job endpoints (URL, stdout, or loopback
//!   socket)
//! - [`progress`] / [`result`] — the parsed report types
//! - [`parser`] — the stdout reader that classifies report lines

pub mod arg;
pub mod input;
pub mod output;
pub mod parser;
pub mod progress;
pub mod result;

pub use arg::Arg;
pub use input::Input;
pub use output::Output;
pub use parser::{FfmpegResultReader, ProgressListener};
pub use progress::FfmpegProgress;
pub use result::FfmpegResult;

use std::path::{Path, PathBuf};

use crate::errors::{FfdriveError, Result};
use crate::exec::Worker;
use crate::process::{StdReader, Stopper, Supervisor};

/// A declarative ffmpeg invocation.
///
/// Arguments are assembled in a fixed order, which is part of the
/// contract because ffmpeg is position-sensitive: each input's options
/// ending in `-i <url>`, exactly one of `-y`/`-n`, `-filter_complex` if a
/// graph is set, the extra global options, then each output's options
/// ending in its URL.
pub struct FfmpegJob {
    executable: PathBuf,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    overwrite: bool,
    filter_complex: Option<String>,
    extra_options: Vec<Arg>,
    progress_listener: Option<ProgressListener>,
    stopper: Option<Stopper>,
}

impl FfmpegJob {
    /// Job driven by the given ffmpeg executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            overwrite: false,
            filter_complex: None,
            extra_options: Vec::new(),
            progress_listener: None,
            stopper: None,
        }
    }

    /// Job driven by the ffmpeg executable inside `dir`, named `ffmpeg`
    /// or `ffmpeg.exe` depending on the operating system.
    pub fn at_path(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(executable_name(std::env::consts::OS)))
    }

    pub fn input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Whether existing output files are overwritten (`-y`) or the job
    /// fails if one exists (`-n`). Off by default.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the `-filter_complex` graph.
    pub fn filter_complex(mut self, graph: impl Into<String>) -> Self {
        self.filter_complex = Some(graph.into());
        self
    }

    /// Append a global option, emitted between the inputs and outputs.
    pub fn option(mut self, arg: Arg) -> Self {
        self.extra_options.push(arg);
        self
    }

    /// Receive progress events parsed from the child's report stream.
    pub fn on_progress(mut self, listener: impl FnMut(FfmpegProgress) + Send + 'static) -> Self {
        self.progress_listener = Some(Box::new(listener));
        self
    }

    /// Attach a stop handle for this execution.
    pub fn stopper(mut self, stopper: &Stopper) -> Self {
        self.stopper = Some(stopper.clone());
        self
    }

    /// Materialise the argument vector.
    ///
    /// Socket-backed endpoints must have been primed first; during
    /// [`FfmpegJob::execute`] that is always the case.
    pub fn build_arguments(&self) -> Result<Vec<String>> {
        let mut argv = Vec::new();
        for input in &self.inputs {
            input.build_arguments(&mut argv)?;
        }
        argv.push(if self.overwrite { "-y" } else { "-n" }.to_string());
        if let Some(graph) = &self.filter_complex {
            argv.push("-filter_complex".to_string());
            argv.push(graph.clone());
        }
        for arg in &self.extra_options {
            arg.push_onto(&mut argv);
        }
        for output in &self.outputs {
            output.build_arguments(&mut argv)?;
        }
        Ok(argv)
    }

    /// Run the job to completion and return the parsed result tally.
    pub async fn execute(mut self) -> Result<FfmpegResult> {
        if self.outputs.is_empty() {
            return Err(FfdriveError::IllegalState(
                "an ffmpeg job needs at least one output".to_string(),
            ));
        }

        // Prime socket endpoints: bind loopback listeners and publish
        // their URLs so argument assembly sees real ports.
        let mut helpers: Vec<Worker> = Vec::new();
        for input in &mut self.inputs {
            if let Some(worker) = input.helper_worker().await? {
                helpers.push(worker);
            }
        }
        let mut custom_stdout_reader = None;
        for output in &mut self.outputs {
            if let Some(worker) = output.helper_worker().await? {
                helpers.push(worker);
            }
            if let Some(reader) = output.take_stdout_reader() {
                custom_stdout_reader = Some(reader);
            }
        }

        let listener = self.progress_listener.take();
        let stdout_reader: Box<dyn StdReader<FfmpegResult>> = match custom_stdout_reader {
            Some(reader) => reader,
            None => match listener {
                Some(listener) => Box::new(FfmpegResultReader::with_listener(listener)),
                None => Box::new(FfmpegResultReader::new()),
            },
        };

        let stopper = self.stopper.take();
        let executable = self.executable.clone();

        let supervisor = Supervisor::new(executable, "ffmpeg")
            .stdout_reader(stdout_reader)
            .helpers(helpers)
            .arguments_with(move || self.build_arguments());
        let supervisor = match stopper {
            Some(stopper) => supervisor.stopper(stopper),
            None => supervisor,
        };

        supervisor.execute().await
    }
}

/// Executable file name for the given OS name (`std::env::consts::OS`).
pub fn executable_name(os_name: &str) -> &'static str {
    if is_windows(os_name) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

fn is_windows(os_name: &str) -> bool {
    os_name.eq_ignore_ascii_case("windows")
}
