//! Transport trait for inserter control connections.
//!
//! The [`Transport`] trait abstracts over the byte stream a control client
//! talks to us on. The production implementation wraps an accepted TCP
//! socket (`vbit-transport`); tests use `MockTransport` from
//! `vbit-test-harness` to script inbound bytes and capture replies.
//!
//! Unlike a client-side transport there is no receive deadline: a stalled
//! peer keeps its handler parked until the socket closes or the handler is
//! cancelled.

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte-level transport to one control client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the peer.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying socket.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the peer into the provided buffer.
    ///
    /// Returns the number of bytes read, which is always non-zero. An
    /// orderly close by the peer is reported as
    /// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost).
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    /// Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is still open.
    fn is_connected(&self) -> bool;

    /// A label for the peer, used in log fields.
    fn peer(&self) -> &str;
}
