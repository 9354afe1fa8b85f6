// src/ffmpeg/output.rs

//! Job outputs: files/URLs, the child's stdout, or loopback sockets
//! drained by a negotiator.

use tracing::debug;

use crate::errors::{FfdriveError, Result};
use crate::exec::Worker;
use crate::ffmpeg::arg::Arg;
use crate::ffmpeg::result::FfmpegResult;
use crate::net::{Negotiator, TcpServer};
use crate::process::StdReader;

/// One output of an ffmpeg job: an ordered list of options followed by
/// the output URL (or `-` for stdout).
pub struct Output {
    options: Vec<Arg>,
    sink: Sink,
    stdout_reader: Option<Box<dyn StdReader<FfmpegResult>>>,
}

enum Sink {
    Url(String),
    Stdout,
    Socket {
        scheme: String,
        suffix: String,
        negotiator: Option<Box<dyn Negotiator>>,
        url: Option<String>,
    },
}

impl Output {
    /// Output written to a filesystem path or any URL ffmpeg understands.
    pub fn to_url(url: impl Into<String>) -> Self {
        Self {
            options: Vec::new(),
            sink: Sink::Url(url.into()),
            stdout_reader: None,
        }
    }

    /// Output written to the child's stdout (`-`).
    ///
    /// Usually combined with [`Output::stdout_reader`] so the piped bytes
    /// are actually consumed.
    pub fn to_stdout() -> Self {
        Self {
            options: Vec::new(),
            sink: Sink::Stdout,
            stdout_reader: None,
        }
    }

    /// Output received by this process over loopback TCP.
    ///
    /// The negotiator accepts the child's single connection and drains
    /// the output bytes from it.
    pub fn to_socket(scheme: impl Into<String>, negotiator: impl Negotiator) -> Self {
        Self::to_socket_with_suffix(scheme, "", negotiator)
    }

    /// Like [`Output::to_socket`], with a path/query suffix appended to
    /// the URL for path-bearing schemes.
    pub fn to_socket_with_suffix(
        scheme: impl Into<String>,
        suffix: impl Into<String>,
        negotiator: impl Negotiator,
    ) -> Self {
        Self {
            options: Vec::new(),
            sink: Sink::Socket {
                scheme: scheme.into(),
                suffix: suffix.into(),
                negotiator: Some(Box::new(negotiator)),
                url: None,
            },
            stdout_reader: None,
        }
    }

    /// Append an option emitted before the output URL.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(Arg::pair(name, value));
        self
    }

    /// Append a bare flag emitted before the output URL.
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.options.push(Arg::flag(name));
        self
    }

    /// Alias for `-f`: force the output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.option("-f", format)
    }

    /// Alias for `-c:v`: select the video encoder (`copy` to remux).
    pub fn codec_video(self, codec: impl Into<String>) -> Self {
        self.option("-c:v", codec)
    }

    /// Alias for `-c:a`: select the audio encoder (`copy` to remux).
    pub fn codec_audio(self, codec: impl Into<String>) -> Self {
        self.option("-c:a", codec)
    }

    /// Install a custom reader for the child's stdout.
    ///
    /// Meant for [`Output::to_stdout`] outputs, where the media bytes
    /// arrive on the supervisor's stdout pipe and the default line parser
    /// would mangle them.
    pub fn stdout_reader(mut self, reader: Box<dyn StdReader<FfmpegResult>>) -> Self {
        self.stdout_reader = Some(reader);
        self
    }

    /// Replace the output URL.
    ///
    /// Fails with [`FfdriveError::IllegalState`] on socket-backed and
    /// stdout outputs.
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<()> {
        match &mut self.sink {
            Sink::Url(current) => {
                *current = url.into();
                Ok(())
            }
            Sink::Stdout => Err(FfdriveError::IllegalState(
                "stdout output has no URL to set".to_string(),
            )),
            Sink::Socket { .. } => Err(FfdriveError::IllegalState(
                "socket output URL is derived from its bound port and cannot be set".to_string(),
            )),
        }
    }

    /// Prime the output and hand out its helper worker, if it has one.
    ///
    /// For socket-backed outputs this binds the loopback listener,
    /// publishes the resulting URL for argument assembly, and returns the
    /// worker that drains the child's connection. Single-shot.
    pub async fn helper_worker(&mut self) -> Result<Option<Worker>> {
        match &mut self.sink {
            Sink::Url(_) | Sink::Stdout => Ok(None),
            Sink::Socket {
                scheme,
                suffix,
                negotiator,
                url,
            } => {
                let negotiator = negotiator.take().ok_or_else(|| {
                    FfdriveError::IllegalState("socket output was already primed".to_string())
                })?;
                let server = TcpServer::bind_loopback().await?;
                let port = server.port()?;
                *url = Some(format!("{scheme}://127.0.0.1:{port}{suffix}"));
                debug!(port, "socket output bound and published");
                Ok(Some(Box::pin(async move { server.serve(negotiator).await })))
            }
        }
    }

    pub(crate) fn take_stdout_reader(&mut self) -> Option<Box<dyn StdReader<FfmpegResult>>> {
        self.stdout_reader.take()
    }

    pub(crate) fn build_arguments(&self, argv: &mut Vec<String>) -> Result<()> {
        for arg in &self.options {
            arg.push_onto(argv);
        }
        argv.push(self.url()?);
        Ok(())
    }

    fn url(&self) -> Result<String> {
        match &self.sink {
            Sink::Url(url) => Ok(url.clone()),
            Sink::Stdout => Ok("-".to_string()),
            Sink::Socket { url, .. } => url.clone().ok_or_else(|| {
                FfdriveError::IllegalState(
                    "socket output has no bound port yet; prime it before building arguments"
                        .to_string(),
                )
            }),
        }
    }
}
