use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the fake service answers its single request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with `status` and a JSON `body`.
    Respond { status: u16, body: String },
    /// Read the request and never answer.
    Stall,
}

/// One-shot HTTP service bound to a local port.
pub struct FakeService {
    addr: SocketAddr,
    handle: JoinHandle<String>,
}

impl FakeService {
    /// Accept one connection and answer it with `reply`.
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake service");
        let addr = listener.local_addr().expect("local address");
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept request");
            let body = read_request_body(&mut stream).await;
            match reply {
                Reply::Respond { status, body: reply } => {
                    let response = format!(
                        "HTTP/1.1 {status} Fake\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                        reply.len()
                    );
                    stream
                        .write_all(response.as_bytes())
                        .await
                        .expect("write response");
                    stream.shutdown().await.expect("close response");
                }
                Reply::Stall => std::future::pending::<()>().await,
            }
            body
        });
        Self { addr, handle }
    }

    /// Base URL to point a provider at.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Body of the request the service received.
    pub async fn request_body(self) -> String {
        self.handle.await.expect("fake service task")
    }
}

/// Base URL of a port nobody listens on.
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe");
    let addr = listener.local_addr().expect("local address");
    drop(listener);
    format!("http://{addr}")
}

async fn read_request_body(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await.expect("read request");
        assert!(read > 0, "connection closed before the request completed");
        buffer.extend_from_slice(&chunk[..read]);
        let Some(head_end) = find_head_end(&buffer) else {
            continue;
        };
        let head = String::from_utf8_lossy(&buffer[..head_end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map_or(0, |value| value.trim().parse().expect("numeric length"));
        let body_start = head_end + 4;
        if buffer.len() >= body_start + length {
            return String::from_utf8_lossy(&buffer[body_start..body_start + length]).into_owned();
        }
    }
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
