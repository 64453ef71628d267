//! Transport implementations for the VBIT inserter.
//!
//! This crate provides the concrete [`Transport`](vbit_core::Transport) used
//! in production:
//!
//! - [`TcpTransport`]: an accepted TCP control connection (XTP620 / Newfor
//!   clients, conventionally on port 5570)

pub mod tcp;

pub use tcp::TcpTransport;
