//! Download targets and the request they put on the wire.

use crate::base::neterror::NetError;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

/// Where to fetch from: a resolved address plus the `Host` and path to ask for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    addr: SocketAddr,
    host_name: String,
    path: String,
}

impl Target {
    /// Create a target. A path without a leading `/` gets one.
    pub fn new(addr: SocketAddr, host_name: impl Into<String>, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            addr,
            host_name: host_name.into(),
            path,
        }
    }

    /// Resolve an `http://` URL into a target. The first resolved address wins.
    pub async fn from_url(url: &Url) -> Result<Self, NetError> {
        if url.scheme() != "http" {
            return Err(NetError::InvalidUrl);
        }
        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        let mut addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            tracing::debug!(host = %host, error = %e, "target resolution failed");
            NetError::NameNotResolved
        })?;
        let addr = addrs.next().ok_or(NetError::NameNotResolved)?;

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        // Host carries the port unless it is the scheme default.
        let host_name = match url.port() {
            Some(p) => format!("{host}:{p}"),
            None => host.to_string(),
        };

        Ok(Self::new(addr, host_name, path))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The single GET request sent for this target.
    pub fn request_bytes(&self) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.path, self.host_name
        )
        .into_bytes()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{} ({})", self.host_name, self.path, self.addr)
    }
}
