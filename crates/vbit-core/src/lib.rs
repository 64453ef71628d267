//! vbit-core: Core traits, types, and error definitions for the VBIT
//! inserter control stack.
//!
//! This crate holds everything the protocol interpreter and its collaborators
//! share without depending on each other:
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level channel to one control client
//! - [`PageId`] -- validated `mppss` page identity
//! - [`Packet`] -- one 40-byte teletext row
//! - [`PageList`] / [`MemoryPageList`] -- the shared page store
//! - [`PageEvent`] -- page store change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod packet;
pub mod page;
pub mod pages;
pub mod transport;

pub use error::{Error, Result};
pub use events::PageEvent;
pub use packet::{MAX_ROW, PACKET_LEN, Packet};
pub use page::{PAGE_ID_LEN, PageId, PageIdError, WILDCARD};
pub use pages::{MemoryPageList, PageList};
pub use transport::Transport;
