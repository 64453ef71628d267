//! Teletext row packets.
//!
//! A subtitle page is made of rows, each carrying 40 bytes of VBI row data.
//! Rows are addressed 0-31; row 0 is the page header. The bytes are stored
//! exactly as received; parity and row encoding happen downstream.

use std::fmt;

use crate::error::{Error, Result};

/// Number of data bytes in one teletext row.
pub const PACKET_LEN: usize = 40;

/// Highest valid row address.
pub const MAX_ROW: u8 = 31;

/// One teletext row payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_LEN]);

impl Packet {
    /// Wrap 40 raw bytes.
    pub fn new(bytes: [u8; PACKET_LEN]) -> Self {
        Packet(bytes)
    }

    /// Build a packet from a slice, which must be exactly [`PACKET_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; PACKET_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidParameter(format!(
                "row packet must be {PACKET_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Packet(array))
    }

    /// The raw row bytes.
    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }

    /// Upper-case hex rendering, two characters per byte.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", self.to_hex())
    }
}

/// Check that `row` is a valid row address.
pub fn check_row(row: u8) -> Result<u8> {
    if row > MAX_ROW {
        return Err(Error::InvalidParameter(format!(
            "row address {row} out of range (0-{MAX_ROW})"
        )));
    }
    Ok(row)
}
