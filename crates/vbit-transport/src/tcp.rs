//! TCP transport for inserter control connections.
//!
//! [`TcpTransport`] implements the [`Transport`] trait over a socket that
//! the acceptor has already accepted. Automation clients (subtitle
//! preparation systems, playout automation, or a human on `telnet`) connect
//! to the inserter's control port and the acceptor hands each stream over.
//!
//! # Example
//!
//! ```no_run
//! use tokio::net::TcpListener;
//! use vbit_core::transport::Transport;
//! use vbit_transport::TcpTransport;
//!
//! # async fn example() -> vbit_core::Result<()> {
//! let listener = TcpListener::bind("0.0.0.0:5570").await?;
//! let (stream, peer) = listener.accept().await?;
//! let mut transport = TcpTransport::from_stream(stream, peer.to_string());
//!
//! let mut buf = [0u8; 132];
//! let n = transport.receive(&mut buf).await?;
//! transport.send(&buf[..n]).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};
use vbit_core::error::{Error, Result};
use vbit_core::transport::Transport;

/// One accepted control client.
///
/// The stream is dropped by [`close`](Transport::close); every later call
/// reports [`Error::NotConnected`].
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    addr: String,
}

impl TcpTransport {
    /// Take over a stream returned by `TcpListener::accept`, labelled with
    /// the client address for logging.
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        // Every command waits on a reply of a few bytes.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %addr, error = %e, "could not disable Nagle on control socket");
        }
        debug!(peer = %addr, "control client accepted");
        TcpTransport {
            stream: Some(stream),
            addr,
        }
    }

    /// The client address label.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        trace!(peer = %self.addr, reply = %data.escape_ascii(), "reply to client");
        stream.write_all(data).await.map_err(|e| {
            debug!(peer = %self.addr, error = %e, "reply write failed");
            classify_io_error(e)
        })
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        match stream.read(buf).await {
            Ok(0) => {
                debug!(peer = %self.addr, "client hung up");
                Err(Error::ConnectionLost)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                debug!(peer = %self.addr, error = %e, "control socket read failed");
                Err(classify_io_error(e))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        // The client may already be gone; a failed FIN is not worth reporting.
        if let Err(e) = stream.shutdown().await {
            trace!(peer = %self.addr, error = %e, "control socket shutdown");
        }
        debug!(peer = %self.addr, "control client released");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn peer(&self) -> &str {
        &self.addr
    }
}

/// A client that resets or aborts is treated the same as one that hangs
/// up; anything else is a genuine socket fault.
fn classify_io_error(e: std::io::Error) -> Error {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
