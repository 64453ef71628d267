//! Connection handler: drives one control connection to completion.
//!
//! The handler reads whatever the transport delivers, feeds it byte by byte
//! through a [`Session`] and writes each response back immediately. It
//! returns when the peer closes the connection, when the transport fails or
//! when the handler's cancellation token fires. The transport is closed on
//! every exit path.
//!
//! Handlers are cheap to clone. The acceptor keeps one and clones it for
//! every accepted connection, so all connections share one page list and
//! one shutdown signal while each gets its own session state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use vbit_core::error::{Error, Result};
use vbit_core::pages::PageList;
use vbit_core::transport::Transport;

use crate::protocol::{LineEnding, MODEL_STRING, RECEIVE_BUFFER_SIZE, Response};
use crate::session::Session;

/// Settings shared by every connection a handler serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Reply to the `Y` identity query.
    pub model: String,
    /// Line ending appended to each response.
    pub line_ending: LineEnding,
    /// Bytes requested from the transport per read.
    pub receive_buffer_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            model: MODEL_STRING.to_string(),
            line_ending: LineEnding::None,
            receive_buffer_size: RECEIVE_BUFFER_SIZE,
        }
    }
}

/// Serves control connections against a shared [`PageList`].
#[derive(Clone)]
pub struct ConnectionHandler {
    pages: Arc<dyn PageList>,
    config: Arc<HandlerConfig>,
    cancel: CancellationToken,
}

impl ConnectionHandler {
    /// Create a handler. Prefer
    /// [`ConnectionHandlerBuilder`](crate::builder::ConnectionHandlerBuilder),
    /// which validates the configuration.
    pub fn new(pages: Arc<dyn PageList>, config: HandlerConfig, cancel: CancellationToken) -> Self {
        ConnectionHandler {
            pages,
            config: Arc::new(config),
            cancel,
        }
    }

    /// Settings applied to every connection.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Token that stops every connection served by this handler.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Serve one connection until it ends.
    ///
    /// An orderly close by the peer and cancellation both return `Ok(())`.
    /// Transport failures are returned after the transport has been closed.
    pub async fn handle(&self, transport: &mut dyn Transport) -> Result<()> {
        let peer = transport.peer().to_string();
        info!(peer = %peer, "control connection opened");

        let result = self.serve(transport, &peer).await;

        if let Err(e) = transport.close().await {
            debug!(peer = %peer, error = %e, "error closing transport");
        }
        match &result {
            Ok(()) => info!(peer = %peer, "control connection closed"),
            Err(e) => warn!(peer = %peer, error = %e, "control connection failed"),
        }
        result
    }

    async fn serve(&self, transport: &mut dyn Transport, peer: &str) -> Result<()> {
        let mut session = Session::new(self.pages.clone(), self.config.model.clone());
        let mut buf = vec![0u8; self.config.receive_buffer_size.max(1)];

        loop {
            let n = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!(peer, "connection handler cancelled");
                    return Ok(());
                }

                received = transport.receive(&mut buf) => match received {
                    Ok(0) | Err(Error::ConnectionLost) => {
                        debug!(peer, "peer closed connection");
                        return Ok(());
                    }
                    Ok(n) => n,
                    Err(e) => return Err(e),
                },
            };
            trace!(peer, bytes = n, data = %buf[..n].escape_ascii(), "received");

            for &byte in &buf[..n] {
                let Some(response) = session.feed(byte).await else {
                    continue;
                };
                if let Response::Reject(reason) = &response {
                    warn!(
                        peer,
                        reason = reason.wire_reason(),
                        page = ?session.current_page(),
                        "command rejected: {reason}"
                    );
                }
                transport
                    .send(&response.encode(self.config.line_ending))
                    .await?;
            }
        }
    }
}
