use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::eyre;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TRAIN_SAMPLE: &str = "./tests/test-data/train_sample.csv";

pub fn test_data(name: impl AsRef<Path>) -> PathBuf {
    Path::new("./tests/test-data").join(name)
}

pub fn assert_epsilon(left: f64, right: f64, epsilon: f64) {
    println!(
        "left: {left}, right: {right}, epsilon: {epsilon}, |left - right| = {}",
        (left - right).abs()
    );
    assert!((left - right).abs() <= epsilon.abs());
}

/// A local HTTP server that answers exactly one request with a canned
/// response and hands back what it received.
pub struct Responder {
    pub base_url: String,
    request: JoinHandle<Result<String>>,
}

impl Responder {
    pub async fn start(status: u16, body: &str) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let response = format!(
            "HTTP/1.1 {status} Canned\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );

        let request = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let request = read_request(&mut socket).await?;
            socket.write_all(response.as_bytes()).await?;
            socket.shutdown().await?;
            Ok::<_, color_eyre::Report>(request)
        });

        Ok(Self { base_url, request })
    }

    /// Body of the request the server answered.
    pub async fn request_body(self) -> Result<String> {
        let request = self.request.await??;
        let (_, body) = request
            .split_once("\r\n\r\n")
            .ok_or_else(|| eyre!("request had no header terminator"))?;
        Ok(body.to_string())
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }

    Ok(String::from_utf8(buf)?)
}
