use crate::server::ServerConfig;
use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Largest request head the server reads before answering anyway.
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Serves files under a root directory, one request per connection.
///
/// Every reply carries `Content-Length` and `Connection: close`, and the
/// socket is shut down after it is written.
pub struct FileServer {
    listener: TcpListener,
    root: Arc<PathBuf>,
}

/// What to send back for one request.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    File(Vec<u8>),
    NotFound,
    BadRequest,
}

impl FileServer {
    pub async fn bind(config: &ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            root = %config.root.display(),
            "file server listening"
        );
        Ok(Self {
            listener,
            root: Arc::new(config.root.clone()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task each.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let root = self.root.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, &root).await {
                    tracing::debug!(%peer, error = %e, "connection ended with error");
                }
            });
        }
    }

    /// Run the accept loop in the background.
    pub fn spawn(self) -> JoinHandle<io::Result<()>> {
        tokio::spawn(self.run())
    }
}

async fn handle_connection(mut stream: TcpStream, root: &Path) -> io::Result<()> {
    let head = read_request_head(&mut stream).await?;
    let reply = match parse_request_line(&head) {
        Some(path) => match resolve_path(root, &path) {
            Some(file) => match tokio::fs::read(&file).await {
                Ok(bytes) => Reply::File(bytes),
                Err(_) => Reply::NotFound,
            },
            None => Reply::NotFound,
        },
        None => Reply::BadRequest,
    };

    match &reply {
        Reply::File(bytes) => tracing::info!(bytes = bytes.len(), "200 serving file"),
        Reply::NotFound => tracing::info!("404 file not found"),
        Reply::BadRequest => tracing::info!("400 bad request"),
    }

    stream.write_all(&render(&reply)).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// Read until the end of the request head, the size cap, or peer close.
async fn read_request_head(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    while head.len() < MAX_REQUEST_HEAD {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    Ok(head)
}

/// Extract the path from `GET /{path} HTTP/1.x`, without the leading `/`.
fn parse_request_line(head: &[u8]) -> Option<String> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(head.len());
    let line = std::str::from_utf8(&head[..line_end]).ok()?;

    let mut parts = line.split(' ');
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if method != "GET" || !version.starts_with("HTTP/1.") || parts.next().is_some() {
        return None;
    }
    Some(target.trim_start_matches('/').to_string())
}

/// Map a request path onto a file under `root`. Anything that could leave
/// the root is rejected.
fn resolve_path(root: &Path, path: &str) -> Option<PathBuf> {
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    let relative = Path::new(path);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn render(reply: &Reply) -> Vec<u8> {
    let (status, body): (&str, &[u8]) = match reply {
        Reply::File(bytes) => ("200 OK", bytes.as_slice()),
        Reply::NotFound => ("404 Not Found", &[]),
        Reply::BadRequest => ("400 Bad Request", &[]),
    };
    let mut out = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}
