use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection to {addr} failed: {kind}")]
    ConnectFailed { addr: SocketAddr, kind: io::ErrorKind },
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Name not resolved")]
    NameNotResolved,

    // Transfer Errors
    #[error("Sending request failed: {0}")]
    SendFailed(io::ErrorKind),
    #[error("Reading response failed: {0}")]
    ReceiveFailed(io::ErrorKind),

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Connection closed before full body was received ({received} of {expected:?} bytes)")]
    PrematureClose {
        received: usize,
        expected: Option<usize>,
    },
    #[error("No Content-Length header found")]
    MissingContentLength,

    #[error("Transaction ended without an outcome")]
    TransactionAborted,
}

/// Coarse error classes a caller reasons about (retry, reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connect,
    Send,
    Receive,
    PrematureClose,
    MissingContentLength,
    Other,
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectFailed { .. } => -104,
            NetError::NameNotResolved => -105,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,
            NetError::InvalidUrl => -300,
            NetError::MissingContentLength => -320,
            NetError::PrematureClose { .. } => -354,
            // Custom codes starting at -900
            NetError::SendFailed(_) => -910,
            NetError::ReceiveFailed(_) => -911,
            NetError::TransactionAborted => -912,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            NetError::ConnectFailed { .. } | NetError::ConnectionTimedOut => ErrorCategory::Connect,
            NetError::SendFailed(_) | NetError::SocketNotConnected => ErrorCategory::Send,
            NetError::ReceiveFailed(_) => ErrorCategory::Receive,
            NetError::PrematureClose { .. } => ErrorCategory::PrematureClose,
            NetError::MissingContentLength => ErrorCategory::MissingContentLength,
            NetError::NameNotResolved | NetError::InvalidUrl | NetError::TransactionAborted => {
                ErrorCategory::Other
            }
        }
    }

    /// Build a connect error, folding `TimedOut` into [`NetError::ConnectionTimedOut`].
    pub fn connect_failed(addr: SocketAddr, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            kind => NetError::ConnectFailed { addr, kind },
        }
    }
}
