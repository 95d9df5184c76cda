//! One TCP socket carrying exactly one request/response pair.
//!
//! Assumes `Connection: close` semantics: no pipelining and no reuse. Each
//! operation suspends only the calling task.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::http::request::Target;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A connected TCP socket owned by exactly one transaction.
///
/// Closing is idempotent and also happens on drop.
#[derive(Debug)]
pub struct Connection {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl Connection {
    /// Connect to the target's address, giving up after `timeout` if set.
    pub async fn connect(target: &Target, timeout: Option<Duration>) -> Result<Self, NetError> {
        let addr = target.addr();
        tracing::debug!(%addr, "connecting");

        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| NetError::ConnectionTimedOut)?,
            None => TcpStream::connect(addr).await,
        }
        .connect_context(addr)?;

        // Small request, no point waiting for Nagle.
        let _ = stream.set_nodelay(true);

        tracing::debug!(%addr, "connected");
        Ok(Self {
            stream: Some(stream),
            peer: addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Write the GET request for `target` in full.
    pub async fn send_request(&mut self, target: &Target) -> Result<usize, NetError> {
        let stream = self.stream.as_mut().ok_or(NetError::SocketNotConnected)?;
        let request = target.request_bytes();
        stream.write_all(&request).await.send_context()?;
        stream.flush().await.send_context()?;
        tracing::debug!(
            peer = %self.peer,
            path = %target.path(),
            bytes = request.len(),
            "request sent"
        );
        Ok(request.len())
    }

    /// One receive call filling at most `buf.len()` bytes. `Ok(0)` means
    /// the peer closed and nothing more will arrive.
    pub async fn receive_chunk(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        let stream = self.stream.as_mut().ok_or(NetError::SocketNotConnected)?;
        let n = stream.read(buf).await.receive_context()?;
        tracing::trace!(peer = %self.peer, bytes = n, "chunk received");
        Ok(n)
    }

    /// Release the socket. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(peer = %self.peer, "connection closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_receive_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"pong").await.unwrap();
            buf.truncate(n);
            buf
        });

        let target = Target::new(addr, "localhost", "/ping");
        let mut conn = Connection::connect(&target, None).await.unwrap();
        assert_eq!(conn.peer_addr(), addr);

        let sent = conn.send_request(&target).await.unwrap();
        assert_eq!(sent, target.request_bytes().len());

        let mut buf = [0u8; 16];
        let mut received = Vec::new();
        loop {
            let n = conn.receive_chunk(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, b"pong");

        conn.close();
        conn.close();
        assert!(!conn.is_open());
        assert_eq!(
            conn.send_request(&target).await,
            Err(NetError::SocketNotConnected)
        );

        let request = server.await.unwrap();
        assert_eq!(request, target.request_bytes());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let target = Target::new(addr, "localhost", "/");
        let err = Connection::connect(&target, None).await.unwrap_err();
        assert!(matches!(
            err,
            NetError::ConnectFailed { kind: std::io::ErrorKind::ConnectionRefused, .. }
        ));
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_send_after_peer_reset() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            socket.set_linger(Some(Duration::ZERO)).unwrap();
        });

        let target = Target::new(addr, "localhost", "/file1");
        let mut conn = Connection::connect(&target, None).await.unwrap();
        server.await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = conn.send_request(&target).await.unwrap_err();
        assert!(matches!(err, NetError::SendFailed(_)), "{err:?}");
        assert_eq!(err.category(), crate::base::neterror::ErrorCategory::Send);
    }
}
