// src/lib.rs

//! `ffdrive` drives an external `ffmpeg` binary from a host program.
//!
//! A job is described declaratively — inputs, outputs, global options, an
//! optional filter graph — and executing it:
//! - materialises the description into an argument vector,
//! - spawns `ffmpeg` as a child process,
//! - concurrently drains its standard streams while running helper workers,
//! - exchanges data with the child over loopback TCP when inputs or outputs
//!   are in-memory streams rather than files,
//! - returns a parsed result or a typed failure.
//!
//! ```no_run
//! use ffdrive::{FfmpegJob, Input, Output};
//!
//! # async fn demo() -> ffdrive::Result<()> {
//! let result = FfmpegJob::at_path("/opt/ffmpeg/bin")
//!     .input(Input::from_url("a.mp4"))
//!     .overwrite(true)
//!     .output(Output::to_url("b.mp4"))
//!     .execute()
//!     .await?;
//! println!("wrote {} kB of video", result.video_kb);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod exec;
pub mod ffmpeg;
pub mod logging;
pub mod net;
pub mod process;

pub use errors::{FfdriveError, Result};
pub use exec::{Executor, Worker};
pub use ffmpeg::{
    Arg, FfmpegJob, FfmpegProgress, FfmpegResult, FfmpegResultReader, Input, Output,
};
pub use net::{Negotiator, TcpServer};
pub use process::{Gobbler, StdReader, Stopper, StreamHandle, Supervisor};
