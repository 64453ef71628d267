//! Mock transport for deterministic testing of connection handlers.
//!
//! [`MockTransport`] implements the [`Transport`] trait from the server's
//! point of view: it plays back scripted inbound chunks as if a control
//! client had sent them, and records everything the handler writes back.
//!
//! # Example
//!
//! ```
//! use vbit_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // The client types "Y<enter>" and then hangs up.
//! mock.push_incoming(b"Y\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;

use vbit_core::error::{Error, Result};
use vbit_core::transport::Transport;

/// What happens once every scripted chunk has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterScript {
    /// Report an orderly close by the peer.
    Close,
    /// Never deliver anything else (a silent, still-open peer).
    Hold,
    /// Fail the read as if the socket had been reset.
    Reset,
}

/// A mock [`Transport`] for testing handlers without sockets.
///
/// Each `receive()` call returns the next scripted chunk (split across
/// calls if the caller's buffer is smaller). When the script is exhausted
/// the peer is reported closed unless [`hold_open`](MockTransport::hold_open)
/// or [`reset_after_script`](MockTransport::reset_after_script) was used.
#[derive(Debug)]
pub struct MockTransport {
    /// Inbound chunks still to be delivered.
    incoming: VecDeque<Vec<u8>>,
    /// Behaviour after the last chunk.
    after: AfterScript,
    /// Whether `send()` should fail with a broken pipe.
    fail_sends: bool,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Peer label returned by `peer()`.
    peer: String,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            incoming: VecDeque::new(),
            after: AfterScript::Close,
            fail_sends: false,
            connected: true,
            sent_log: Vec::new(),
            peer: "mock".to_string(),
        }
    }

    /// Queue bytes to be returned by a future `receive()` call.
    ///
    /// Each call queues one chunk; chunks are never merged, so tests can
    /// control exactly how the byte stream is fragmented.
    pub fn push_incoming(&mut self, data: &[u8]) {
        self.incoming.push_back(data.to_vec());
    }

    /// Queue each byte of `data` as its own chunk.
    pub fn push_incoming_bytewise(&mut self, data: &[u8]) {
        for &b in data {
            self.incoming.push_back(vec![b]);
        }
    }

    /// Keep the connection open (reads park forever) once the script ends.
    pub fn hold_open(&mut self) {
        self.after = AfterScript::Hold;
    }

    /// Fail the next read with a connection reset once the script ends.
    pub fn reset_after_script(&mut self) {
        self.after = AfterScript::Reset;
    }

    /// Make every `send()` fail with a broken pipe I/O error.
    pub fn fail_sends(&mut self) {
        self.fail_sends = true;
    }

    /// Return all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// All sent data concatenated, as lossy UTF-8.
    pub fn sent_text(&self) -> String {
        let joined: Vec<u8> = self.sent_log.concat();
        String::from_utf8_lossy(&joined).into_owned()
    }

    /// Number of scripted chunks not yet delivered.
    pub fn remaining_incoming(&self) -> usize {
        self.incoming.len()
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.fail_sends {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        self.sent_log.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if let Some(mut chunk) = self.incoming.pop_front() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                // Put the unread tail back at the front.
                chunk.drain(..n);
                self.incoming.push_front(chunk);
            }
            return Ok(n);
        }

        match self.after {
            AfterScript::Close => Err(Error::ConnectionLost),
            AfterScript::Reset => Err(Error::Io(std::io::Error::other("mock connection reset"))),
            AfterScript::Hold => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.incoming.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}
