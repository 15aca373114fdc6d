#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[path = "../../src/testutil.rs"]
mod testutil;

pub(crate) use testutil::{TarFixture, gzip};

/// 50-byte text file used by the readme scenarios
pub fn readme() -> Vec<u8> {
    let mut text = b"hello world, this readme is exactly fifty bytes.".to_vec();
    text.resize(50, b'\n');
    text
}

/// 1 MiB of non-text data
pub fn large_binary() -> Vec<u8> {
    (0..1024 * 1024).map(|i| (i % 251) as u8).collect()
}

/// The three-entry package used across scenarios
pub fn package() -> Vec<u8> {
    gzip(
        &TarFixture::new()
            .dir("pkg/")
            .file("pkg/readme.txt", &readme())
            .file("pkg/data.bin", &large_binary())
            .build(),
    )
}

/// Incompressible bytes, so the gzip body is as large as the data
pub fn noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// Canned response served for every request
pub struct Canned {
    pub status: &'static str,
    pub body: Vec<u8>,
    /// `None` sends the body without a length, delimited by connection close
    pub content_length: Option<u64>,
}

impl Canned {
    pub fn ok(body: Vec<u8>) -> Self {
        let len = body.len() as u64;
        Self {
            status: "200 OK",
            body,
            content_length: Some(len),
        }
    }

    pub fn status(status: &'static str) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: Some(0),
        }
    }
}

/// Minimal HTTP/1.1 server on a random local port.
///
/// Returns the archive URL and the raw request heads it received.
pub async fn serve(canned: Canned) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    let canned = Arc::new(canned);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let canned = canned.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());

                let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", canned.status);
                if let Some(len) = canned.content_length {
                    response.push_str(&format!("Content-Length: {}\r\n", len));
                }
                response.push_str("\r\n");

                if socket.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.write_all(&canned.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/pkg.tgz", addr), requests)
}

/// Server that trickles `body` out in `chunk`-sized writes spaced by `delay`.
///
/// Returns the archive URL and the number of body bytes the socket accepted.
/// A write failing (peer gone) ends the response.
pub async fn serve_slowly(body: Vec<u8>, chunk: usize, delay: Duration) -> (String, Arc<AtomicU64>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let sent = Arc::new(AtomicU64::new(0));
    let counter = sent.clone();
    let body = Arc::new(body);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
                    body.len()
                );
                if socket.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
                for piece in body.chunks(chunk) {
                    if socket.write_all(piece).await.is_err() {
                        return;
                    }
                    counter.fetch_add(piece.len() as u64, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/slow.tgz", addr), sent)
}
