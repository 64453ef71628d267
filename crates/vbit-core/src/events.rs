//! Page list change notifications.
//!
//! [`MemoryPageList`](crate::pages::MemoryPageList) publishes a [`PageEvent`]
//! through a [`tokio::sync::broadcast`] channel whenever a control connection
//! changes its contents. The subtitle injector subscribes to these to pick
//! up new rows and on-air transitions without polling the store.

use crate::packet::Packet;
use crate::page::PageId;

/// An event emitted when the page list changes.
///
/// Delivery is best-effort through a bounded broadcast channel; a slow
/// subscriber may see `RecvError::Lagged` and should re-read the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A row was stored on a page.
    RowWritten {
        /// Page the row belongs to.
        page: PageId,
        /// Row address, 0-31.
        row: u8,
        /// The row payload.
        packet: Packet,
    },

    /// All rows of a page were cleared (page init).
    RowsCleared {
        /// The page that was initialised.
        page: PageId,
    },

    /// A page was put on air.
    OnAir {
        /// The page now eligible for transmission.
        page: PageId,
    },

    /// A page was taken off air.
    OffAir {
        /// The page no longer eligible for transmission.
        page: PageId,
    },
}

impl PageEvent {
    /// The page this event concerns.
    pub fn page(&self) -> &PageId {
        match self {
            PageEvent::RowWritten { page, .. }
            | PageEvent::RowsCleared { page }
            | PageEvent::OnAir { page }
            | PageEvent::OffAir { page } => page,
        }
    }
}
