//! ConnectionHandlerBuilder -- fluent builder for [`ConnectionHandler`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vbit_core::MemoryPageList;
//! use vbit_xtp620::builder::ConnectionHandlerBuilder;
//! use vbit_xtp620::protocol::LineEnding;
//!
//! # fn example() -> vbit_core::Result<()> {
//! let pages = Arc::new(MemoryPageList::new());
//! let handler = ConnectionHandlerBuilder::new(pages)
//!     .line_ending(LineEnding::CrLf)
//!     .build()?;
//! assert_eq!(handler.config().model, "VBIT620");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vbit_core::error::{Error, Result};
use vbit_core::pages::PageList;

use crate::buffer::MAX_CMD;
use crate::handler::{ConnectionHandler, HandlerConfig};
use crate::protocol::LineEnding;

/// Fluent builder for [`ConnectionHandler`].
///
/// Every setting has a default, so `ConnectionHandlerBuilder::new(pages).build()`
/// gives a handler that answers `Y` with `VBIT620`, writes bare responses and
/// stops only when its own token is cancelled.
pub struct ConnectionHandlerBuilder {
    pages: Arc<dyn PageList>,
    config: HandlerConfig,
    cancel: Option<CancellationToken>,
}

impl ConnectionHandlerBuilder {
    /// Create a builder serving `pages`.
    pub fn new(pages: Arc<dyn PageList>) -> Self {
        ConnectionHandlerBuilder {
            pages,
            config: HandlerConfig::default(),
            cancel: None,
        }
    }

    /// Set the reply to the `Y` identity query (default: `VBIT620`).
    pub fn model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Set the line ending appended to each response (default: none).
    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// Set how many bytes are requested from the transport per read
    /// (default: 132).
    pub fn receive_buffer_size(mut self, size: usize) -> Self {
        self.config.receive_buffer_size = size;
        self
    }

    /// Stop connections when `token` is cancelled. Without this the handler
    /// gets a fresh token, reachable through
    /// [`ConnectionHandler::cancellation_token`].
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the configuration and build the handler.
    pub fn build(self) -> Result<ConnectionHandler> {
        let model = &self.config.model;
        if model.is_empty() || model.len() > MAX_CMD {
            return Err(Error::InvalidParameter(format!(
                "model string must be 1-{MAX_CMD} bytes, got {}",
                model.len()
            )));
        }
        if !model.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(Error::InvalidParameter(format!(
                "model string must be printable ASCII: {model:?}"
            )));
        }
        if self.config.receive_buffer_size == 0 {
            return Err(Error::InvalidParameter(
                "receive_buffer_size must be non-zero".into(),
            ));
        }

        Ok(ConnectionHandler::new(
            self.pages,
            self.config,
            self.cancel.unwrap_or_default(),
        ))
    }
}
