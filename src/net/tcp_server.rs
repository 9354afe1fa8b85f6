// src/net/tcp_server.rs

//! Loopback TCP server handed to socket-backed inputs and outputs.

use std::future::Future;
use std::pin::Pin;

use tokio::net::TcpListener;
use tracing::debug;

use crate::errors::Result;

/// Per-server-socket protocol handler.
///
/// The negotiator owns the listening socket: it accepts at most one
/// connection, performs its protocol on it, and the listener is closed on
/// every exit path when it drops.
pub trait Negotiator: Send + 'static {
    fn negotiate(
        self: Box<Self>,
        server: TcpListener,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

impl<F, Fut> Negotiator for F
where
    F: FnOnce(TcpListener) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn negotiate(
        self: Box<Self>,
        server: TcpListener,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin((*self)(server))
    }
}

/// A TCP server bound to the loopback interface on an OS-assigned
/// ephemeral port.
///
/// Binding happens eagerly in [`TcpServer::bind_loopback`], so the port
/// is known — and can be baked into the child's argument vector — before
/// the serve worker is even constructed. The child dials in once it
/// parses its arguments, by which point [`TcpServer::serve`] is blocked
/// in the negotiator's `accept`.
pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    /// Bind `127.0.0.1:0` and return the live listener.
    pub async fn bind_loopback() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        debug!(addr = %listener.local_addr()?, "bound loopback server");
        Ok(Self { listener })
    }

    /// The OS-assigned port of the bound listener.
    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Hand the listening socket to the negotiator and run its protocol
    /// to completion.
    pub async fn serve(self, negotiator: Box<dyn Negotiator>) -> Result<()> {
        negotiator.negotiate(self.listener).await
    }
}
