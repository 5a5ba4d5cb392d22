use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// HTTP endpoint that answers every request with the same status and body.
pub struct FakeMetaServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl FakeMetaServer {
    pub async fn start(status: u16, body: &str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n{body}",
            reason = if status < 400 { "OK" } else { "Error" },
            len = body.len(),
        );

        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let response = response.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn server_url(&self) -> anyhow::Result<Url> {
        Ok(Url::parse(&format!("http://{}", self.addr))?)
    }
}

impl Drop for FakeMetaServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
