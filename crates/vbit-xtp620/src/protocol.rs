//! XTP620 / Newfor wire constants and response encoding.
//!
//! Two command families share one control socket:
//!
//! - **XTP620** -- printable ASCII lines terminated by CR or LF. The first
//!   character selects the command (`Y`, `P`, `R`, `G`, `S`).
//! - **Newfor** -- a single control byte (`0x0E`, `0x0F`, `0x10`, `0x18`)
//!   followed by a fixed number of Hamming 8/4 protected parameter bytes.
//!
//! Every response is a short ASCII token written back on the same socket:
//!
//! ```text
//! VBIT620            identity
//! ACK                command accepted
//! 3                  row count
//! 0D2020...          row data, 80 hex characters
//! NAK NOPAGE         rejection with reason
//! ```

use bytes::{BufMut, BytesMut};
use vbit_core::Packet;

/// Model string returned by the `Y` identity query.
pub const MODEL_STRING: &str = "VBIT620";

/// Conventional TCP port for inserter control.
pub const DEFAULT_PORT: u16 = 5570;

/// Size of the socket receive buffer used by the connection handler.
pub const RECEIVE_BUFFER_SIZE: usize = 132;

/// Carriage return, terminates an XTP620 line.
pub const CR: u8 = b'\r';

/// Line feed, terminates an XTP620 line.
pub const LF: u8 = b'\n';

// ---------------------------------------------------------------
// XTP620 line commands (first byte of the line)
// ---------------------------------------------------------------

/// `Y` -- identity query.
pub const CMD_IDENTIFY: u8 = b'Y';
/// `P<mppss>` -- select the current page.
pub const CMD_SELECT_PAGE: u8 = b'P';
/// `R` -- number of populated rows on the current page.
pub const CMD_ROW_COUNT: u8 = b'R';
/// `G<row>` -- fetch one row of the current page as hex.
pub const CMD_GET_ROW: u8 = b'G';
/// `S<row>` -- store one row, followed by 80 hex digits.
pub const CMD_SET_ROW: u8 = b'S';

// ---------------------------------------------------------------
// Newfor control bytes
// ---------------------------------------------------------------

/// Page init: three Hamming bytes (magazine, page tens, page units) follow.
pub const NEWFOR_PAGE_INIT: u8 = 0x0E;
/// Subtitle data: a Hamming row count, then that many rows.
pub const NEWFOR_SUBTITLE_DATA: u8 = 0x0F;
/// Put the current page on air.
pub const NEWFOR_ON_AIR: u8 = 0x10;
/// Take the current page off air.
pub const NEWFOR_OFF_AIR: u8 = 0x18;

/// Whether `byte` starts a Newfor command.
pub fn is_newfor_control(byte: u8) -> bool {
    matches!(
        byte,
        NEWFOR_PAGE_INIT | NEWFOR_SUBTITLE_DATA | NEWFOR_ON_AIR | NEWFOR_OFF_AIR
    )
}

/// Whether `byte` ends an XTP620 line.
pub fn is_line_terminator(byte: u8) -> bool {
    byte == CR || byte == LF
}

/// Decode one ASCII hex digit (either case) to its nybble value.
pub fn decode_hex_nybble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Parse a decimal row address (one or two digits, 0-31).
pub fn parse_row_address(params: &[u8]) -> Option<u8> {
    if params.is_empty() || params.len() > 2 || !params.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let row = params.iter().fold(0u8, |acc, d| acc * 10 + (d - b'0'));
    (row <= vbit_core::MAX_ROW).then_some(row)
}

// ---------------------------------------------------------------
// Responses
// ---------------------------------------------------------------

/// Why a command was refused. Reported on the wire as `NAK <reason>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The `P` parameter failed page identity validation.
    #[error("malformed page identity")]
    MalformedIdentity,

    /// The leading byte is not a known command.
    #[error("unknown command")]
    UnknownCommand,

    /// The command needs a current page and none has been selected.
    #[error("no page selected")]
    NoPageSelected,

    /// A row address is out of range, or the row is not populated.
    #[error("invalid row")]
    InvalidRow,

    /// A parameter or data byte could not be decoded.
    #[error("malformed data")]
    MalformedData,

    /// The page list refused the update.
    #[error("page store fault")]
    StoreFault,
}

impl Rejection {
    /// The reason token sent after `NAK`.
    pub fn wire_reason(&self) -> &'static str {
        match self {
            Rejection::MalformedIdentity => "IDENTITY",
            Rejection::UnknownCommand => "COMMAND",
            Rejection::NoPageSelected => "NOPAGE",
            Rejection::InvalidRow => "ROW",
            Rejection::MalformedData => "DATA",
            Rejection::StoreFault => "STORE",
        }
    }
}

/// A response to one completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Reply to `Y`.
    Identity(String),
    /// The command was carried out.
    Ack,
    /// Reply to `R`.
    RowCount(usize),
    /// Reply to `G`.
    Row(Packet),
    /// The command was refused; no state changed.
    Reject(Rejection),
}

/// Line ending appended to every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Responses are written bare (`VBIT620`).
    #[default]
    None,
    /// Responses end with CR LF, which reads better on a telnet session.
    CrLf,
}

impl Response {
    /// Encode the response into raw bytes ready for transmission.
    ///
    /// # Example
    ///
    /// ```
    /// use vbit_xtp620::protocol::{LineEnding, Rejection, Response};
    ///
    /// let bytes = Response::Identity("VBIT620".into()).encode(LineEnding::None);
    /// assert_eq!(bytes, b"VBIT620");
    ///
    /// let bytes = Response::Reject(Rejection::NoPageSelected).encode(LineEnding::CrLf);
    /// assert_eq!(bytes, b"NAK NOPAGE\r\n");
    /// ```
    pub fn encode(&self, line_ending: LineEnding) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(84);
        match self {
            Response::Identity(model) => buf.put_slice(model.as_bytes()),
            Response::Ack => buf.put_slice(b"ACK"),
            Response::RowCount(n) => buf.put_slice(n.to_string().as_bytes()),
            Response::Row(packet) => buf.put_slice(packet.to_hex().as_bytes()),
            Response::Reject(reason) => {
                buf.put_slice(b"NAK ");
                buf.put_slice(reason.wire_reason().as_bytes());
            }
        }
        if line_ending == LineEnding::CrLf {
            buf.put_u8(CR);
            buf.put_u8(LF);
        }
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbit_core::PACKET_LEN;

    // ---------------------------------------------------------------
    // Byte classification
    // ---------------------------------------------------------------

    #[test]
    fn newfor_control_bytes() {
        for b in [0x0E, 0x0F, 0x10, 0x18] {
            assert!(is_newfor_control(b), "{b:#04x}");
        }
        assert!(!is_newfor_control(b'Y'));
        assert!(!is_newfor_control(0x11));
        assert!(!is_newfor_control(CR));
    }

    #[test]
    fn line_terminators() {
        assert!(is_line_terminator(b'\r'));
        assert!(is_line_terminator(b'\n'));
        assert!(!is_line_terminator(b';'));
    }

    #[test]
    fn hex_nybbles() {
        assert_eq!(decode_hex_nybble(b'0'), Some(0));
        assert_eq!(decode_hex_nybble(b'9'), Some(9));
        assert_eq!(decode_hex_nybble(b'a'), Some(10));
        assert_eq!(decode_hex_nybble(b'F'), Some(15));
        assert_eq!(decode_hex_nybble(b'g'), None);
        assert_eq!(decode_hex_nybble(b' '), None);
    }

    #[test]
    fn row_addresses() {
        assert_eq!(parse_row_address(b"0"), Some(0));
        assert_eq!(parse_row_address(b"07"), Some(7));
        assert_eq!(parse_row_address(b"31"), Some(31));
        assert_eq!(parse_row_address(b"32"), None);
        assert_eq!(parse_row_address(b""), None);
        assert_eq!(parse_row_address(b"100"), None);
        assert_eq!(parse_row_address(b"+1"), None);
        assert_eq!(parse_row_address(b"1a"), None);
    }

    // ---------------------------------------------------------------
    // Response encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_identity_bare() {
        let bytes = Response::Identity(MODEL_STRING.into()).encode(LineEnding::None);
        assert_eq!(bytes, b"VBIT620");
    }

    #[test]
    fn encode_ack_with_crlf() {
        assert_eq!(Response::Ack.encode(LineEnding::CrLf), b"ACK\r\n");
    }

    #[test]
    fn encode_row_count() {
        assert_eq!(Response::RowCount(0).encode(LineEnding::None), b"0");
        assert_eq!(Response::RowCount(23).encode(LineEnding::None), b"23");
    }

    #[test]
    fn encode_row_as_hex() {
        let packet = Packet::new([0x20; PACKET_LEN]);
        let bytes = Response::Row(packet).encode(LineEnding::None);
        assert_eq!(bytes.len(), 80);
        assert!(bytes.chunks(2).all(|pair| pair == b"20"));
    }

    #[test]
    fn encode_rejections() {
        let cases = [
            (Rejection::MalformedIdentity, "NAK IDENTITY"),
            (Rejection::UnknownCommand, "NAK COMMAND"),
            (Rejection::NoPageSelected, "NAK NOPAGE"),
            (Rejection::InvalidRow, "NAK ROW"),
            (Rejection::MalformedData, "NAK DATA"),
            (Rejection::StoreFault, "NAK STORE"),
        ];
        for (reason, expected) in cases {
            let bytes = Response::Reject(reason).encode(LineEnding::None);
            assert_eq!(bytes, expected.as_bytes());
        }
    }

    #[test]
    fn rejection_display() {
        assert_eq!(Rejection::NoPageSelected.to_string(), "no page selected");
        assert_eq!(Rejection::UnknownCommand.to_string(), "unknown command");
    }
}
