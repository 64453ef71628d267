//! The shared page list.
//!
//! Control connections never own page storage; they reach it through the
//! [`PageList`] capability trait so the store's locking discipline can change
//! without touching the protocol code. [`MemoryPageList`] is the in-process
//! implementation used by the inserter binary and the tests.
//!
//! Every page carries a set of rows (address 0-31, one [`Packet`] each) and an
//! on-air flag telling the downstream injector whether the page may be
//! transmitted.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::error::Result;
use crate::events::PageEvent;
use crate::packet::{Packet, check_row};
use crate::page::PageId;

/// Default capacity of the page event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Store of subtitle pages shared by every control connection.
///
/// Implementations must serialise writes to the same page and must never
/// expose a half-written row to concurrent readers.
#[async_trait]
pub trait PageList: Send + Sync {
    /// Number of populated rows on `page` (0 for an unknown page).
    async fn row_count(&self, page: &PageId) -> usize;

    /// Fetch one row, if populated.
    async fn get_row(&self, page: &PageId, row: u8) -> Option<Packet>;

    /// Store one row, replacing any previous content at that address.
    ///
    /// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter)
    /// if `row` is not a valid row address.
    async fn put_row(&self, page: &PageId, row: u8, packet: Packet) -> Result<()>;

    /// Remove every row of `page`, creating the page if it does not exist.
    async fn clear_rows(&self, page: &PageId) -> Result<()>;

    /// Mark `page` as eligible (or not) for transmission.
    async fn set_on_air(&self, page: &PageId, on_air: bool) -> Result<()>;

    /// Whether `page` is currently on air.
    async fn is_on_air(&self, page: &PageId) -> bool;
}

#[derive(Debug, Default)]
struct PageEntry {
    rows: BTreeMap<u8, Packet>,
    on_air: bool,
}

/// In-memory [`PageList`] guarded by a single async mutex.
pub struct MemoryPageList {
    pages: Mutex<HashMap<PageId, PageEntry>>,
    event_tx: broadcast::Sender<PageEvent>,
}

impl MemoryPageList {
    /// Create an empty page list.
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty page list with a specific event channel capacity.
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        MemoryPageList {
            pages: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to page change events.
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.event_tx.subscribe()
    }

    /// Pages currently marked on air, in no particular order.
    pub async fn on_air_pages(&self) -> Vec<PageId> {
        let pages = self.pages.lock().await;
        pages
            .iter()
            .filter(|(_, entry)| entry.on_air)
            .map(|(id, _)| *id)
            .collect()
    }

    fn publish(&self, event: PageEvent) {
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }
}

impl Default for MemoryPageList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageList for MemoryPageList {
    async fn row_count(&self, page: &PageId) -> usize {
        let pages = self.pages.lock().await;
        pages.get(page).map_or(0, |entry| entry.rows.len())
    }

    async fn get_row(&self, page: &PageId, row: u8) -> Option<Packet> {
        let pages = self.pages.lock().await;
        pages
            .get(page)
            .and_then(|entry| entry.rows.get(&row))
            .copied()
    }

    async fn put_row(&self, page: &PageId, row: u8, packet: Packet) -> Result<()> {
        let row = check_row(row)?;
        {
            let mut pages = self.pages.lock().await;
            pages.entry(*page).or_default().rows.insert(row, packet);
        }
        tracing::trace!(page = %page, row, "row stored");
        self.publish(PageEvent::RowWritten {
            page: *page,
            row,
            packet,
        });
        Ok(())
    }

    async fn clear_rows(&self, page: &PageId) -> Result<()> {
        {
            let mut pages = self.pages.lock().await;
            pages.entry(*page).or_default().rows.clear();
        }
        tracing::debug!(page = %page, "page rows cleared");
        self.publish(PageEvent::RowsCleared { page: *page });
        Ok(())
    }

    async fn set_on_air(&self, page: &PageId, on_air: bool) -> Result<()> {
        {
            let mut pages = self.pages.lock().await;
            pages.entry(*page).or_default().on_air = on_air;
        }
        tracing::debug!(page = %page, on_air, "page on-air state changed");
        self.publish(if on_air {
            PageEvent::OnAir { page: *page }
        } else {
            PageEvent::OffAir { page: *page }
        });
        Ok(())
    }

    async fn is_on_air(&self, page: &PageId) -> bool {
        let pages = self.pages.lock().await;
        pages.get(page).is_some_and(|entry| entry.on_air)
    }
}
