//! Minimal HTTP server for exercising the engine against localhost. Serves
//! fixed byte bodies, answers HEAD with Content-Length and GET with optional
//! Range handling, and can fail a configurable number of GETs per path.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

pub struct ServedFile {
    body: Vec<u8>,
    failures_left: AtomicUsize,
}

impl ServedFile {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            failures_left: AtomicUsize::new(0),
        }
    }

    /// The next `count` GETs for this path answer 500 before it recovers.
    pub fn fail_first(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    pub async fn spawn(files: HashMap<String, ServedFile>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let files = Arc::new(files);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let files = files.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, files).await;
                });
            }
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }
}

async fn handle(
    mut stream: TcpStream,
    files: Arc<HashMap<String, ServedFile>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 || head.len() > 16 * 1024 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&head);
    let mut lines = text.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let path = request_line.next().unwrap_or_default();
    let range = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("range"))
        .and_then(|(_, value)| parse_range(value.trim()));

    let Some(file) = files.get(path) else {
        return respond(&mut stream, "404 Not Found", b"", None).await;
    };

    if method == "HEAD" {
        return respond(&mut stream, "200 OK", b"", Some(file.body.len())).await;
    }

    if file.take_failure() {
        return respond(&mut stream, "500 Internal Server Error", b"", None).await;
    }

    match range {
        Some((start, end)) if start <= end && end < file.body.len() as u64 => {
            let slice = &file.body[start as usize..=end as usize];
            respond(&mut stream, "206 Partial Content", slice, None).await
        }
        Some(_) => respond(&mut stream, "416 Range Not Satisfiable", b"", None).await,
        None => respond(&mut stream, "200 OK", &file.body, None).await,
    }
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn respond(
    stream: &mut TcpStream,
    status: &str,
    body: &[u8],
    head_length: Option<usize>,
) -> std::io::Result<()> {
    let content_length = head_length.unwrap_or(body.len());
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, content_length
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await
}
