//! Byte-level framing for one control connection.
//!
//! A [`Session`] owns the command buffer, the protocol mode and the
//! dispatcher state of a single connection. [`Session::feed`] takes one
//! received byte at a time and decides when a command is complete:
//!
//! - In [`ProtocolMode::Normal`] a CR or LF ends the line. Empty lines are
//!   ignored. A Newfor control byte abandons any partial line and is
//!   dispatched on its own. A line longer than the command buffer is
//!   dropped whole, up to and including its terminator.
//! - In every other mode the command is complete once
//!   [`ProtocolMode::payload_len`] bytes have been collected. Modes with no
//!   payload are dispatched as soon as they are entered.
//! - While an `S` row is arriving as hex, CR and LF are skipped so the row
//!   may be wrapped by a terminal. Newfor rows are Hamming coded, so there
//!   every byte is data.

use std::sync::Arc;

use tracing::warn;
use vbit_core::{PageId, PageList};

use crate::buffer::{CommandBuffer, MAX_CMD, Push};
use crate::dispatcher::Dispatcher;
use crate::mode::ProtocolMode;
use crate::protocol::{Response, is_line_terminator, is_newfor_control};

/// Command interpreter state for one connection.
pub struct Session {
    buffer: CommandBuffer,
    dispatcher: Dispatcher,
    mode: ProtocolMode,
    /// Set after an overflow until the end of the offending line.
    discarding: bool,
}

impl Session {
    /// Create the state for a new connection, answering `Y` with `model`.
    pub fn new(pages: Arc<dyn PageList>, model: impl Into<String>) -> Self {
        Session {
            buffer: CommandBuffer::new(),
            dispatcher: Dispatcher::new(pages, model),
            mode: ProtocolMode::Normal,
            discarding: false,
        }
    }

    /// The active protocol mode.
    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    /// The page the connection is working on, if any.
    pub fn current_page(&self) -> Option<&PageId> {
        self.dispatcher.current_page()
    }

    /// Process one received byte, returning the response if it completed a
    /// command that produces one.
    pub async fn feed(&mut self, byte: u8) -> Option<Response> {
        match self.mode {
            ProtocolMode::Normal => self.feed_normal(byte).await,
            mode => {
                if mode.is_nybble() && self.dispatcher.row_is_hex() && is_line_terminator(byte) {
                    return None;
                }
                if !self.push(byte) {
                    return None;
                }
                if Some(self.buffer.len()) == mode.payload_len() {
                    self.complete().await
                } else {
                    None
                }
            }
        }
    }

    async fn feed_normal(&mut self, byte: u8) -> Option<Response> {
        if is_newfor_control(byte) {
            self.discarding = false;
            if !self.buffer.is_empty() {
                warn!(
                    discarded = self.buffer.len(),
                    "newfor command interrupted a partial line"
                );
                self.buffer.clear();
            }
            self.buffer.add_char(byte);
            return self.complete().await;
        }

        if self.discarding {
            if is_line_terminator(byte) {
                self.discarding = false;
            }
            return None;
        }

        if is_line_terminator(byte) {
            if self.buffer.is_empty() {
                return None;
            }
            return self.complete().await;
        }

        if !self.push(byte) {
            self.discarding = true;
        }
        None
    }

    fn push(&mut self, byte: u8) -> bool {
        match self.buffer.add_char(byte) {
            Push::Stored => true,
            Push::Overflow => {
                warn!(
                    capacity = MAX_CMD,
                    mode = ?self.mode,
                    "command buffer overflow, discarding command"
                );
                false
            }
        }
    }

    /// Dispatch the buffered command and run any zero-payload mode that
    /// follows it.
    async fn complete(&mut self) -> Option<Response> {
        let reply = self
            .dispatcher
            .dispatch(self.buffer.as_bytes(), self.mode)
            .await;
        self.buffer.clear();
        self.mode = reply.mode;

        let mut response = reply.response;
        while response.is_none() && self.mode.payload_len() == Some(0) {
            let reply = self.dispatcher.dispatch(&[], self.mode).await;
            self.mode = reply.mode;
            response = reply.response;
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamming;
    use crate::protocol::{
        LF, MODEL_STRING, NEWFOR_OFF_AIR, NEWFOR_ON_AIR, NEWFOR_PAGE_INIT, NEWFOR_SUBTITLE_DATA,
        Rejection,
    };
    use vbit_core::{MemoryPageList, PACKET_LEN, Packet};

    fn setup() -> (Session, Arc<MemoryPageList>) {
        let pages = Arc::new(MemoryPageList::new());
        (Session::new(pages.clone(), MODEL_STRING), pages)
    }

    /// Feed every byte and collect the responses in order.
    async fn feed_all(session: &mut Session, bytes: &[u8]) -> Vec<Response> {
        let mut out = Vec::new();
        for &b in bytes {
            if let Some(r) = session.feed(b).await {
                out.push(r);
            }
        }
        out
    }

    fn page(s: &str) -> PageId {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn identity_line() {
        let (mut s, _) = setup();
        let out = feed_all(&mut s, b"Y\r").await;
        assert_eq!(out, vec![Response::Identity("VBIT620".into())]);
    }

    #[tokio::test]
    async fn crlf_yields_one_response() {
        let (mut s, _) = setup();
        let out = feed_all(&mut s, b"Y\r\nY\n").await;
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let (mut s, _) = setup();
        assert!(feed_all(&mut s, b"\r\n\r\n").await.is_empty());
        assert_eq!(s.mode(), ProtocolMode::Normal);
    }

    #[tokio::test]
    async fn nothing_happens_before_terminator() {
        let (mut s, _) = setup();
        assert!(feed_all(&mut s, b"P100").await.is_empty());
        assert!(s.current_page().is_none());
        assert_eq!(feed_all(&mut s, b"\n").await, vec![Response::Ack]);
        assert_eq!(s.current_page(), Some(&page("100")));
    }

    #[tokio::test]
    async fn page_select_then_row_count() {
        let (mut s, _) = setup();
        let out = feed_all(&mut s, b"P12345\r\nR\r\n").await;
        assert_eq!(out, vec![Response::Ack, Response::RowCount(0)]);
    }

    #[tokio::test]
    async fn bad_page_is_rejected_and_previous_kept() {
        let (mut s, _) = setup();
        let out = feed_all(&mut s, b"P1\rPz1234\r").await;
        assert_eq!(
            out,
            vec![
                Response::Ack,
                Response::Reject(Rejection::MalformedIdentity)
            ]
        );
        assert_eq!(s.current_page(), Some(&page("1")));
    }

    #[tokio::test]
    async fn overlong_line_is_dropped() {
        let (mut s, _) = setup();
        let mut line = vec![b'P'; MAX_CMD + 1];
        line.push(b'\r');
        // The terminator ends the discarded line without dispatching it.
        assert!(feed_all(&mut s, &line).await.is_empty());
        assert!(s.current_page().is_none());

        let out = feed_all(&mut s, b"Y\r").await;
        assert_eq!(out, vec![Response::Identity("VBIT620".into())]);
    }

    #[tokio::test]
    async fn overlong_line_never_reaches_dispatcher() {
        let (mut s, _) = setup();
        let mut bytes = vec![b'#'; MAX_CMD + 1];
        bytes.extend_from_slice(b"P100\r");
        // The tail after the reset belongs to the same line.
        assert!(feed_all(&mut s, &bytes).await.is_empty());
        assert!(s.current_page().is_none());

        // The terminator ends the discard.
        let out = feed_all(&mut s, b"P100\r").await;
        assert_eq!(out, vec![Response::Ack]);
        assert_eq!(s.current_page(), Some(&page("100")));
    }

    #[tokio::test]
    async fn newfor_byte_ends_overlong_line() {
        let (mut s, _) = setup();
        feed_all(&mut s, b"P888\r").await;
        let mut bytes = vec![b'x'; MAX_CMD + 5];
        bytes.push(NEWFOR_ON_AIR);
        let out = feed_all(&mut s, &bytes).await;
        assert_eq!(out, vec![Response::Ack]);
        assert_eq!(s.mode(), ProtocolMode::Normal);
    }

    #[tokio::test]
    async fn hex_row_round_trip() {
        let (mut s, pages) = setup();
        let mut bytes = b"P100\rS7\r".to_vec();
        bytes.extend("41".repeat(20).bytes());
        // Wrapped halfway through.
        bytes.extend_from_slice(b"\r\n");
        bytes.extend("41".repeat(20).bytes());
        bytes.extend_from_slice(b"\rG7\r");

        let out = feed_all(&mut s, &bytes).await;
        let packet = Packet::new([0x41; PACKET_LEN]);
        assert_eq!(
            out,
            vec![Response::Ack, Response::Ack, Response::Row(packet)]
        );
        assert_eq!(pages.get_row(&page("100"), 7).await, Some(packet));
    }

    #[tokio::test]
    async fn newfor_control_aborts_partial_line() {
        let (mut s, _) = setup();
        feed_all(&mut s, b"P801\r").await;
        let mut bytes = b"P1".to_vec();
        bytes.push(NEWFOR_ON_AIR);
        let out = feed_all(&mut s, &bytes).await;
        assert_eq!(out, vec![Response::Ack]);
        assert_eq!(s.current_page(), Some(&page("801")));
    }

    #[tokio::test]
    async fn on_and_off_air_need_no_parameters() {
        let (mut s, pages) = setup();
        feed_all(&mut s, b"P888\r").await;

        assert_eq!(s.feed(NEWFOR_ON_AIR).await, Some(Response::Ack));
        assert!(pages.is_on_air(&page("888")).await);
        assert_eq!(s.mode(), ProtocolMode::Normal);

        assert_eq!(s.feed(NEWFOR_OFF_AIR).await, Some(Response::Ack));
        assert!(!pages.is_on_air(&page("888")).await);
    }

    #[tokio::test]
    async fn on_air_without_page() {
        let (mut s, _) = setup();
        assert_eq!(
            s.feed(NEWFOR_ON_AIR).await,
            Some(Response::Reject(Rejection::NoPageSelected))
        );
        assert_eq!(s.mode(), ProtocolMode::Normal);
    }

    #[tokio::test]
    async fn newfor_subtitle_sequence() {
        let (mut s, pages) = setup();
        let h = hamming::encode;

        let mut bytes = vec![NEWFOR_PAGE_INIT, h(1), h(8), h(8)];
        bytes.extend_from_slice(&[NEWFOR_SUBTITLE_DATA, h(1), h(1), h(6)]);
        for _ in 0..PACKET_LEN {
            bytes.extend_from_slice(&[h(0x2), h(0x0)]);
        }
        bytes.push(NEWFOR_ON_AIR);

        let out = feed_all(&mut s, &bytes).await;
        assert_eq!(out, vec![Response::Ack, Response::Ack, Response::Ack]);

        let p = page("18800");
        assert_eq!(
            pages.get_row(&p, 22).await,
            Some(Packet::new([0x20; PACKET_LEN]))
        );
        assert!(pages.is_on_air(&p).await);
        assert_eq!(s.mode(), ProtocolMode::Normal);
    }

    #[tokio::test]
    async fn newfor_row_data_may_contain_line_feed() {
        let (mut s, pages) = setup();
        let h = hamming::encode;

        let mut bytes = vec![NEWFOR_PAGE_INIT, h(1), h(0), h(0)];
        bytes.extend_from_slice(&[NEWFOR_SUBTITLE_DATA, h(1), h(0), h(1)]);
        // 0x0A is the codeword for 1 with one bit flipped.
        assert_eq!(hamming::decode(LF), Some(1));
        bytes.extend_from_slice(&[LF, h(1)]);
        for _ in 1..PACKET_LEN {
            bytes.extend_from_slice(&[h(1), h(1)]);
        }

        let out = feed_all(&mut s, &bytes).await;
        assert_eq!(out, vec![Response::Ack, Response::Ack]);
        assert_eq!(s.mode(), ProtocolMode::Normal);
        assert_eq!(
            pages.get_row(&page("10000"), 1).await,
            Some(Packet::new([0x11; PACKET_LEN]))
        );

        // The next command is not swallowed as row data.
        assert_eq!(feed_all(&mut s, b"R\r").await, vec![Response::RowCount(1)]);
    }

    #[tokio::test]
    async fn newfor_parameters_may_look_like_terminators() {
        let (mut s, _) = setup();
        // 0x0D is not a Hamming codeword but must still be counted as a
        // parameter byte rather than ending a line.
        let out = feed_all(&mut s, &[NEWFOR_PAGE_INIT, 0x0D, 0x0D, 0x0D]).await;
        assert_eq!(out, vec![Response::Reject(Rejection::MalformedData)]);
        assert_eq!(s.mode(), ProtocolMode::Normal);
    }

    #[tokio::test]
    async fn normal_mode_restored_after_rejection() {
        let (mut s, _) = setup();
        let out = feed_all(&mut s, b"S1\rY\r").await;
        assert_eq!(
            out,
            vec![
                Response::Reject(Rejection::NoPageSelected),
                Response::Identity("VBIT620".into())
            ]
        );
    }
}
