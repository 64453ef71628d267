//! vbit-xtp620: XTP620 / Newfor command interpreter for the VBIT inserter.
//!
//! Subtitle preparation systems and playout automation drive the inserter
//! over a TCP control connection, mixing XTP620 ASCII lines with binary
//! Newfor subtitle commands. This crate turns that byte stream into page
//! list updates and short ASCII responses.
//!
//! # Architecture
//!
//! - [`protocol`] -- wire constants, rejection reasons and response encoding
//! - [`hamming`] -- Hamming 8/4 decoding of Newfor parameters
//! - [`buffer`] -- fixed-capacity command buffer
//! - [`mode`] -- per-connection protocol mode
//! - [`dispatcher`] -- per-command semantics against the shared page list
//! - [`session`] -- byte-level framing for one connection
//! - [`handler`] -- drives a [`Transport`](vbit_core::Transport) until the
//!   connection ends
//! - [`builder`] -- validated construction of a [`ConnectionHandler`]

pub mod buffer;
pub mod builder;
pub mod dispatcher;
pub mod hamming;
pub mod handler;
pub mod mode;
pub mod protocol;
pub mod session;

pub use builder::ConnectionHandlerBuilder;
pub use handler::{ConnectionHandler, HandlerConfig};
pub use mode::ProtocolMode;
pub use protocol::{LineEnding, Rejection, Response};
pub use session::Session;
