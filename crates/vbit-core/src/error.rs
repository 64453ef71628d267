//! Error types for the VBIT inserter.
//!
//! All fallible library operations return [`Result<T>`], which uses
//! [`Error`] as the error type. Per-command rejections that are reported
//! back on the wire are *not* errors at this level; they live in the
//! protocol crate.

/// The error type for all VBIT library operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid parameter was passed to a page-list or protocol call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection or the link dropped.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("row 32 out of range".into());
        assert_eq!(e.to_string(), "invalid parameter: row 32 out of range");
    }

    #[test]
    fn error_display_connection_states() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
