use thiserror::Error;

/// Errors that can arise anywhere between intent construction and the wire.
///
/// `Validation` and `CatalogLoad` are always raised before any network I/O.
/// `Connection`, `Authentication` and `Timeout` force the protocol client
/// back to the disconnected state; none of them are retried automatically.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Transport-level failure: unreachable host, reset, closed socket.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server rejected the password. Terminal for this connection
    /// attempt; the caller must reconnect to try again.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// No complete response arrived within the configured bound. Partial
    /// output is discarded, never surfaced as if complete.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Caller-supplied intent parameters violate a builder constraint.
    /// Detected locally; nothing reaches the network.
    #[error("invalid command parameters: {0}")]
    Validation(String),

    /// Malformed or incomplete static catalog data. Fatal to startup
    /// only, never to a running session.
    #[error("catalog load failed: {0}")]
    CatalogLoad(String),

    /// A frame that violates the wire format (bad padding, oversize
    /// length, truncated preamble).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Wrapper around IO errors from the socket layer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the library crate.
pub type Result<T> = std::result::Result<T, AdminError>;
