//! vbit-test-harness: Test utilities for the VBIT inserter.
//!
//! This crate provides [`MockTransport`], a scripted stand-in for an
//! accepted control connection, so connection handlers can be tested
//! without opening sockets.

pub mod mock_transport;

pub use mock_transport::MockTransport;
