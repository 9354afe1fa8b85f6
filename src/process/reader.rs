// src/process/reader.rs

//! Stream reader contract for child stdout/stderr.

use std::future::Future;
use std::pin::Pin;

use tokio::io::AsyncRead;
use tracing::trace;

use crate::errors::Result;

/// A child output stream, erased so readers work over stdout and stderr
/// alike (and over in-memory streams in tests).
pub type StreamHandle = Box<dyn AsyncRead + Send + Unpin + 'static>;

/// Consumes a child output stream until EOF and optionally produces the
/// job's result.
///
/// Readers run as workers inside the supervisor's executor; a reader that
/// fails fails the whole execution with a worker error.
pub trait StdReader<T>: Send {
    fn read(
        self: Box<Self>,
        stream: StreamHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Option<T>>> + Send>>;
}

/// Default reader: drains the stream to EOF, discards the bytes and
/// returns no result.
///
/// Exists so that unread streams never wedge the child on a full pipe
/// buffer.
pub struct Gobbler;

impl<T: Send + 'static> StdReader<T> for Gobbler {
    fn read(
        self: Box<Self>,
        stream: StreamHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Option<T>>> + Send>> {
        Box::pin(async move {
            let mut stream = stream;
            let mut sink = tokio::io::sink();
            let bytes = tokio::io::copy(&mut stream, &mut sink).await?;
            trace!(bytes, "stream drained to EOF");
            Ok(None)
        })
    }
}
