// src/ffmpeg/input.rs

//! Job inputs: files/URLs, or loopback sockets fed by a negotiator.

use tracing::debug;

use crate::errors::{FfdriveError, Result};
use crate::exec::Worker;
use crate::ffmpeg::arg::Arg;
use crate::net::{Negotiator, TcpServer};

/// One `-i` input of an ffmpeg job: an ordered list of options followed
/// by the input URL.
pub struct Input {
    options: Vec<Arg>,
    source: Source,
}

enum Source {
    Url(String),
    /// URL is derived from the loopback port bound at priming time.
    Socket {
        scheme: String,
        suffix: String,
        negotiator: Option<Box<dyn Negotiator>>,
        url: Option<String>,
    },
}

impl Input {
    /// Input read from a filesystem path or any URL ffmpeg understands.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            options: Vec::new(),
            source: Source::Url(url.into()),
        }
    }

    /// Input served by this process over loopback TCP.
    ///
    /// `scheme` must be a transport the child supports (`tcp`, `http`, …).
    /// The negotiator accepts the child's single connection and streams
    /// the input bytes to it.
    pub fn from_socket(scheme: impl Into<String>, negotiator: impl Negotiator) -> Self {
        Self::from_socket_with_suffix(scheme, "", negotiator)
    }

    /// Like [`Input::from_socket`], with a path/query suffix appended to
    /// the URL for path-bearing schemes.
    pub fn from_socket_with_suffix(
        scheme: impl Into<String>,
        suffix: impl Into<String>,
        negotiator: impl Negotiator,
    ) -> Self {
        Self {
            options: Vec::new(),
            source: Source::Socket {
                scheme: scheme.into(),
                suffix: suffix.into(),
                negotiator: Some(Box::new(negotiator)),
                url: None,
            },
        }
    }

    /// Append an option emitted before `-i`.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(Arg::pair(name, value));
        self
    }

    /// Append a bare flag emitted before `-i`.
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.options.push(Arg::flag(name));
        self
    }

    /// Alias for `-f`: force the input format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.option("-f", format)
    }

    /// Alias for `-t`: limit the duration of data read from the input.
    pub fn duration(self, duration: impl Into<String>) -> Self {
        self.option("-t", duration)
    }

    /// Replace the input URL.
    ///
    /// Fails with [`FfdriveError::IllegalState`] on socket-backed inputs,
    /// whose URL is derived from the bound loopback port.
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<()> {
        match &mut self.source {
            Source::Url(current) => {
                *current = url.into();
                Ok(())
            }
            Source::Socket { .. } => Err(FfdriveError::IllegalState(
                "socket input URL is derived from its bound port and cannot be set".to_string(),
            )),
        }
    }

    /// Prime the input and hand out its helper worker, if it has one.
    ///
    /// For socket-backed inputs this binds the loopback listener,
    /// publishes the resulting URL for argument assembly, and returns the
    /// worker that serves the child's connection. Single-shot.
    pub async fn helper_worker(&mut self) -> Result<Option<Worker>> {
        match &mut self.source {
            Source::Url(_) => Ok(None),
            Source::Socket {
                scheme,
                suffix,
                negotiator,
                url,
            } => {
                let negotiator = negotiator.take().ok_or_else(|| {
                    FfdriveError::IllegalState("socket input was already primed".to_string())
                })?;
                let server = TcpServer::bind_loopback().await?;
                let port = server.port()?;
                *url = Some(format!("{scheme}://127.0.0.1:{port}{suffix}"));
                debug!(port, "socket input bound and published");
                Ok(Some(Box::pin(async move { server.serve(negotiator).await })))
            }
        }
    }

    pub(crate) fn build_arguments(&self, argv: &mut Vec<String>) -> Result<()> {
        for arg in &self.options {
            arg.push_onto(argv);
        }
        argv.push("-i".to_string());
        argv.push(self.url()?);
        Ok(())
    }

    fn url(&self) -> Result<String> {
        match &self.source {
            Source::Url(url) => Ok(url.clone()),
            Source::Socket { url, .. } => url.clone().ok_or_else(|| {
                FfdriveError::IllegalState(
                    "socket input has no bound port yet; prime it before building arguments"
                        .to_string(),
                )
            }),
        }
    }
}
