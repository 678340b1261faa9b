//! Error types for the Stratum client.

use thiserror::Error;

/// Errors produced by the client.
///
/// `Transport`, `Framing`, and `ProtocolShape` are connection-fatal: they
/// fail the caller's current call and close the socket. `Rpc`, `Timeout`,
/// and `LocalReject` are per-call; the connection stays usable. `OwnerGone`
/// never crosses the API boundary.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Socket open/read/write/close failed, or the peer closed the
    /// connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// A line failed to parse as JSON or exceeded the line-length cap.
    #[error("framing error: {0}")]
    Framing(String),

    /// JSON parsed, but a required field is missing or has the wrong type.
    #[error("malformed message: {0}")]
    ProtocolShape(String),

    /// The pool returned a non-null error object; the payload is preserved
    /// verbatim.
    #[error("pool error: {0}")]
    Rpc(serde_json::Value),

    /// The deadline elapsed before a response arrived.
    #[error("timeout waiting for response")]
    Timeout,

    /// A submit was refused locally: empty result, or a job id that is not
    /// (or no longer) in the job table. Nothing was sent on the wire.
    #[error("rejected locally: {0}")]
    LocalReject(String),

    /// The owning side of the connection went away while the I/O task was
    /// still running.
    #[error("connection owner terminated")]
    OwnerGone,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Framing(err.to_string())
    }
}

/// Convenient Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
