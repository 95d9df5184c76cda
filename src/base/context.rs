//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into the matching `NetError` variants.

use crate::base::neterror::NetError;
use std::io;
use std::net::SocketAddr;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use trifetch::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await.connect_context(addr)?;
    /// // Error: "Connection to 127.0.0.1:8080 failed: connection refused"
    /// ```
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError>;

    /// Mark an IO error as a failed request write.
    fn send_context(self) -> Result<T, NetError>;

    /// Mark an IO error as a failed response read.
    fn receive_context(self) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connect_context(self, addr: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| NetError::connect_failed(addr, e))
    }

    fn send_context(self) -> Result<T, NetError> {
        self.map_err(|e| NetError::SendFailed(e.kind()))
    }

    fn receive_context(self) -> Result<T, NetError> {
        self.map_err(|e| NetError::ReceiveFailed(e.kind()))
    }
}
