// src/ffmpeg/parser.rs

//! Line-oriented reader for the child's report stream.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, trace};

use crate::errors::Result;
use crate::ffmpeg::progress::FfmpegProgress;
use crate::ffmpeg::result::FfmpegResult;
use crate::process::{StdReader, StreamHandle};

/// Receives progress events as the child reports them.
pub type ProgressListener = Box<dyn FnMut(FfmpegProgress) + Send>;

/// Reads report lines until EOF, classifying each as a progress event
/// (delivered to the listener), a final-result tally (retained; the last
/// one wins), or plain output (logged at `info`).
///
/// Returns the retained tally, if any. A read failure fails the reader
/// worker.
pub struct FfmpegResultReader {
    progress_listener: Option<ProgressListener>,
}

impl FfmpegResultReader {
    pub fn new() -> Self {
        Self {
            progress_listener: None,
        }
    }

    pub fn with_listener(listener: ProgressListener) -> Self {
        Self {
            progress_listener: Some(listener),
        }
    }
}

impl Default for FfmpegResultReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StdReader<FfmpegResult> for FfmpegResultReader {
    fn read(
        mut self: Box<Self>,
        stream: StreamHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Option<FfmpegResult>>> + Send>> {
        Box::pin(async move {
            let mut lines = BufReader::new(stream).lines();
            let mut latest = None;

            while let Some(line) = lines.next_line().await? {
                if let Some(progress) = FfmpegProgress::from_line(&line) {
                    trace!(?progress, "progress event");
                    if let Some(listener) = self.progress_listener.as_mut() {
                        listener(progress);
                    }
                    continue;
                }
                if let Some(result) = FfmpegResult::from_line(&line) {
                    debug!(?result, "final result tally");
                    latest = Some(result);
                    continue;
                }
                info!("{line}");
            }

            Ok(latest)
        })
    }
}
