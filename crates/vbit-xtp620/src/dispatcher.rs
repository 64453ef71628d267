//! Command dispatcher.
//!
//! [`Dispatcher::dispatch`] interprets one completed command against the
//! current [`ProtocolMode`] and returns the response (if any) together with
//! the next mode. It owns the per-connection state the commands build up:
//! the current page, the row being assembled and the number of Newfor rows
//! still expected. Page content itself lives in the shared [`PageList`].
//!
//! Rejections never change state, apart from abandoning a row that was
//! being assembled. Nothing is retried.

use std::sync::Arc;

use tracing::{debug, warn};
use vbit_core::{Error, PACKET_LEN, Packet, PageId, PageList};

use crate::hamming;
use crate::mode::ProtocolMode;
use crate::protocol::{
    CMD_GET_ROW, CMD_IDENTIFY, CMD_ROW_COUNT, CMD_SELECT_PAGE, CMD_SET_ROW, NEWFOR_OFF_AIR,
    NEWFOR_ON_AIR, NEWFOR_PAGE_INIT, NEWFOR_SUBTITLE_DATA, Rejection, Response,
    decode_hex_nybble, parse_row_address,
};

/// Result of dispatching one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// What to write back, if anything.
    pub response: Option<Response>,
    /// The mode that applies to the following bytes.
    pub mode: ProtocolMode,
}

impl Reply {
    fn respond(response: Response) -> Self {
        Reply {
            response: Some(response),
            mode: ProtocolMode::Normal,
        }
    }

    fn reject(reason: Rejection) -> Self {
        Self::respond(Response::Reject(reason))
    }

    fn enter(mode: ProtocolMode) -> Self {
        Reply {
            response: None,
            mode,
        }
    }
}

/// How the nybbles of a row are carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowSource {
    /// XTP620 `S` command: ASCII hex digits.
    Hex,
    /// Newfor subtitle data: Hamming 8/4 bytes.
    Newfor,
}

impl RowSource {
    fn decode(self, byte: u8) -> Option<u8> {
        match self {
            RowSource::Hex => decode_hex_nybble(byte),
            RowSource::Newfor => hamming::decode(byte),
        }
    }
}

/// A row being reassembled from nybbles, high nybble first.
#[derive(Debug)]
struct RowAssembly {
    source: RowSource,
    row: u8,
    bytes: [u8; PACKET_LEN],
    filled: usize,
    high: u8,
}

impl RowAssembly {
    fn new(source: RowSource, row: u8) -> Self {
        RowAssembly {
            source,
            row,
            bytes: [0; PACKET_LEN],
            filled: 0,
            high: 0,
        }
    }
}

/// Per-connection command interpreter.
pub struct Dispatcher {
    pages: Arc<dyn PageList>,
    model: String,
    current_page: Option<PageId>,
    rows_remaining: u8,
    assembly: Option<RowAssembly>,
}

impl Dispatcher {
    /// Create a dispatcher answering `Y` with `model`.
    pub fn new(pages: Arc<dyn PageList>, model: impl Into<String>) -> Self {
        Dispatcher {
            pages,
            model: model.into(),
            current_page: None,
            rows_remaining: 0,
            assembly: None,
        }
    }

    /// The page selected by the last `P` or Newfor page init.
    pub fn current_page(&self) -> Option<&PageId> {
        self.current_page.as_ref()
    }

    /// Whether the row being assembled arrives as ASCII hex (`S`), where
    /// CR and LF carry no data. Newfor rows are Hamming coded and every
    /// byte counts.
    pub fn row_is_hex(&self) -> bool {
        matches!(
            self.assembly,
            Some(RowAssembly {
                source: RowSource::Hex,
                ..
            })
        )
    }

    /// Interpret `cmd` in `mode`.
    pub async fn dispatch(&mut self, cmd: &[u8], mode: ProtocolMode) -> Reply {
        let reply = match mode {
            ProtocolMode::Normal => self.normal(cmd).await,
            ProtocolMode::SoftelPageInit => self.page_init(cmd).await,
            ProtocolMode::GetRowCount => self.subtitle_row_count(cmd),
            ProtocolMode::GetRow => self.subtitle_row_address(cmd),
            ProtocolMode::SubtitleOnAir => self.on_air(true).await,
            ProtocolMode::SubtitleOffAir => self.on_air(false).await,
            ProtocolMode::SubtitleDataHighNybble => self.high_nybble(cmd),
            ProtocolMode::SubtitleDataLowNybble => self.low_nybble(cmd).await,
        };

        if let Some(Response::Reject(reason)) = &reply.response {
            // Abandon any partly received row.
            self.assembly = None;
            self.rows_remaining = 0;
            debug!(?mode, %reason, "command rejected");
        } else if reply.mode != mode {
            debug!(from = ?mode, to = ?reply.mode, "protocol mode change");
        }
        reply
    }

    // ---------------------------------------------------------------
    // Normal mode
    // ---------------------------------------------------------------

    async fn normal(&mut self, cmd: &[u8]) -> Reply {
        let Some((&opcode, params)) = cmd.split_first() else {
            return Reply::enter(ProtocolMode::Normal);
        };

        match opcode {
            CMD_IDENTIFY => Reply::respond(Response::Identity(self.model.clone())),
            CMD_SELECT_PAGE => self.select_page(params),
            CMD_ROW_COUNT => match self.current_page {
                Some(page) => Reply::respond(Response::RowCount(self.pages.row_count(&page).await)),
                None => Reply::reject(Rejection::NoPageSelected),
            },
            CMD_GET_ROW => self.get_row(params).await,
            CMD_SET_ROW => self.set_row(params),
            NEWFOR_PAGE_INIT => Reply::enter(ProtocolMode::SoftelPageInit),
            NEWFOR_SUBTITLE_DATA => Reply::enter(ProtocolMode::GetRowCount),
            NEWFOR_ON_AIR => Reply::enter(ProtocolMode::SubtitleOnAir),
            NEWFOR_OFF_AIR => Reply::enter(ProtocolMode::SubtitleOffAir),
            _ => {
                debug!(opcode = %opcode.escape_ascii(), "unknown command");
                Reply::reject(Rejection::UnknownCommand)
            }
        }
    }

    fn select_page(&mut self, params: &[u8]) -> Reply {
        match PageId::validate(params) {
            Ok(page) => {
                debug!(page = %page, "page selected");
                self.current_page = Some(page);
                Reply::respond(Response::Ack)
            }
            Err(e) => {
                debug!(error = %e, "page select rejected");
                Reply::reject(Rejection::MalformedIdentity)
            }
        }
    }

    async fn get_row(&mut self, params: &[u8]) -> Reply {
        let Some(page) = self.current_page else {
            return Reply::reject(Rejection::NoPageSelected);
        };
        let Some(row) = parse_row_address(params) else {
            return Reply::reject(Rejection::InvalidRow);
        };
        match self.pages.get_row(&page, row).await {
            Some(packet) => Reply::respond(Response::Row(packet)),
            None => Reply::reject(Rejection::InvalidRow),
        }
    }

    fn set_row(&mut self, params: &[u8]) -> Reply {
        if self.current_page.is_none() {
            return Reply::reject(Rejection::NoPageSelected);
        }
        let Some(row) = parse_row_address(params) else {
            return Reply::reject(Rejection::InvalidRow);
        };
        self.assembly = Some(RowAssembly::new(RowSource::Hex, row));
        Reply::enter(ProtocolMode::SubtitleDataHighNybble)
    }

    // ---------------------------------------------------------------
    // Newfor
    // ---------------------------------------------------------------

    async fn page_init(&mut self, cmd: &[u8]) -> Reply {
        let [mag, tens, units] = cmd else {
            return Reply::reject(Rejection::MalformedData);
        };
        let (Some(mag), Some(tens), Some(units)) = (
            hamming::decode(*mag),
            hamming::decode(*tens),
            hamming::decode(*units),
        ) else {
            return Reply::reject(Rejection::MalformedData);
        };

        // Magazine 8 is sent as 0.
        let mag = if mag == 0 { 8 } else { mag };
        if mag > 8 {
            return Reply::reject(Rejection::MalformedData);
        }

        let text = format!("{mag}{tens:X}{units:X}00");
        let Ok(page) = PageId::validate(text.as_bytes()) else {
            return Reply::reject(Rejection::MalformedData);
        };

        if let Err(e) = self.pages.clear_rows(&page).await {
            warn!(page = %page, error = %e, "page init failed");
            return Reply::reject(Rejection::StoreFault);
        }
        debug!(page = %page, "newfor page init");
        self.current_page = Some(page);
        Reply::respond(Response::Ack)
    }

    fn subtitle_row_count(&mut self, cmd: &[u8]) -> Reply {
        if self.current_page.is_none() {
            return Reply::reject(Rejection::NoPageSelected);
        }
        let Some(count) = cmd.first().copied().and_then(hamming::decode) else {
            return Reply::reject(Rejection::MalformedData);
        };
        if count == 0 {
            return Reply::respond(Response::Ack);
        }
        self.rows_remaining = count;
        Reply::enter(ProtocolMode::GetRow)
    }

    fn subtitle_row_address(&mut self, cmd: &[u8]) -> Reply {
        let [high, low] = cmd else {
            return Reply::reject(Rejection::MalformedData);
        };
        let (Some(high), Some(low)) = (hamming::decode(*high), hamming::decode(*low)) else {
            return Reply::reject(Rejection::MalformedData);
        };
        let row = (high << 4) | low;
        if row > vbit_core::MAX_ROW {
            return Reply::reject(Rejection::InvalidRow);
        }
        self.assembly = Some(RowAssembly::new(RowSource::Newfor, row));
        Reply::enter(ProtocolMode::SubtitleDataHighNybble)
    }

    async fn on_air(&mut self, on_air: bool) -> Reply {
        let Some(page) = self.current_page else {
            return Reply::reject(Rejection::NoPageSelected);
        };
        match self.pages.set_on_air(&page, on_air).await {
            Ok(()) => Reply::respond(Response::Ack),
            Err(e) => {
                warn!(page = %page, on_air, error = %e, "on-air change failed");
                Reply::reject(Rejection::StoreFault)
            }
        }
    }

    // ---------------------------------------------------------------
    // Row data
    // ---------------------------------------------------------------

    fn high_nybble(&mut self, cmd: &[u8]) -> Reply {
        let Some(assembly) = self.assembly.as_mut() else {
            return Reply::reject(Rejection::MalformedData);
        };
        let Some(nybble) = cmd.first().copied().and_then(|b| assembly.source.decode(b)) else {
            return Reply::reject(Rejection::MalformedData);
        };
        assembly.high = nybble;
        Reply::enter(ProtocolMode::SubtitleDataLowNybble)
    }

    async fn low_nybble(&mut self, cmd: &[u8]) -> Reply {
        let Some(assembly) = self.assembly.as_mut() else {
            return Reply::reject(Rejection::MalformedData);
        };
        let Some(nybble) = cmd.first().copied().and_then(|b| assembly.source.decode(b)) else {
            return Reply::reject(Rejection::MalformedData);
        };
        assembly.bytes[assembly.filled] = (assembly.high << 4) | nybble;
        assembly.filled += 1;
        if assembly.filled < PACKET_LEN {
            return Reply::enter(ProtocolMode::SubtitleDataHighNybble);
        }

        let Some(assembly) = self.assembly.take() else {
            return Reply::reject(Rejection::MalformedData);
        };
        self.flush_row(assembly).await
    }

    async fn flush_row(&mut self, assembly: RowAssembly) -> Reply {
        let Some(page) = self.current_page else {
            return Reply::reject(Rejection::NoPageSelected);
        };
        let packet = Packet::new(assembly.bytes);
        if let Err(e) = self.pages.put_row(&page, assembly.row, packet).await {
            warn!(page = %page, row = assembly.row, error = %e, "row store failed");
            return Reply::reject(match e {
                Error::InvalidParameter(_) => Rejection::InvalidRow,
                _ => Rejection::StoreFault,
            });
        }
        debug!(page = %page, row = assembly.row, "row stored");

        match assembly.source {
            RowSource::Hex => Reply::respond(Response::Ack),
            RowSource::Newfor => {
                self.rows_remaining = self.rows_remaining.saturating_sub(1);
                if self.rows_remaining > 0 {
                    Reply::enter(ProtocolMode::GetRow)
                } else {
                    Reply::respond(Response::Ack)
                }
            }
        }
    }
}
