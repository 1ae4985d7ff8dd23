//! Scripted mock of the provider's HTTP surface. Serves one canned response
//! per connection, in order, and records every request it sees.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use veogen::config::Config;

pub const TEST_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path plus query, as sent on the request line.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Content-Length framed.
    Sized,
    /// Transfer-Encoding: chunked, no Content-Length.
    Chunked,
    /// Accept and read the request, then never answer.
    Stall,
}

pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delivery: Delivery,
}

impl MockResponse {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
            delivery: Delivery::Sized,
        }
    }

    pub fn video(bytes: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "video/mp4",
            body: bytes.to_vec(),
            delivery: Delivery::Sized,
        }
    }

    pub fn error(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
            delivery: Delivery::Sized,
        }
    }

    pub fn stall() -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: Vec::new(),
            delivery: Delivery::Stall,
        }
    }

    pub fn chunked(mut self) -> Self {
        self.delivery = Delivery::Chunked;
        self
    }
}

pub struct MockProvider {
    listener: TcpListener,
    port: u16,
}

pub struct MockHandle {
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: JoinHandle<()>,
}

impl MockHandle {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl MockProvider {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    /// Config pointed at this mock with a short poll interval and timeouts.
    pub fn config(&self, artifact_dir: &std::path::Path) -> Config {
        let mut config = Config::new(TEST_KEY);
        config.base_url = self.url("/v1beta");
        config.poll_interval = Duration::from_millis(10);
        config.request_timeout = Duration::from_secs(5);
        config.download_timeout = Duration::from_secs(5);
        config.artifact_dir = artifact_dir.to_path_buf();
        config
    }

    pub fn serve(self, script: Vec<MockResponse>) -> MockHandle {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let listener = self.listener;
        let task = tokio::spawn(async move {
            for response in script {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let req = read_request(&mut socket).await;
                recorded.lock().unwrap().push(req);
                if response.delivery == Delivery::Stall {
                    tokio::spawn(async move {
                        let _held = socket;
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    });
                    continue;
                }
                write_response(&mut socket, &response).await;
            }
            // Unexpected extra calls get a closed connection; tests assert on
            // the recorded count.
            loop {
                if listener.accept().await.is_err() {
                    return;
                }
            }
        });
        MockHandle { requests, task }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(socket: &mut TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);

    Recorded {
        method,
        target,
        headers,
        body: buf[header_end..body_end].to_vec(),
    }
}

async fn write_response(socket: &mut TcpStream, response: &MockResponse) {
    let reason = if response.status < 400 { "OK" } else { "Error" };
    let framing = match response.delivery {
        Delivery::Chunked => "Transfer-Encoding: chunked".to_string(),
        _ => format!("Content-Length: {}", response.body.len()),
    };
    let head = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: {}\r\n{framing}\r\nConnection: close\r\n\r\n",
        response.status, response.content_type,
    );
    // Peer may hang up early once it has seen enough; ignore write errors.
    let _ = socket.write_all(head.as_bytes()).await;
    if response.delivery == Delivery::Chunked {
        for chunk in response.body.chunks(16) {
            let _ = socket.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await;
            let _ = socket.write_all(chunk).await;
            let _ = socket.write_all(b"\r\n").await;
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    } else {
        let _ = socket.write_all(&response.body).await;
    }
    let _ = socket.shutdown().await;
}

/// Operation JSON as the provider returns it while a job runs.
pub fn pending(name: &str) -> MockResponse {
    MockResponse::json(serde_json::json!({ "name": name }))
}

/// Finished operation with one generated sample at `uri`.
pub fn finished(name: &str, uri: &str) -> MockResponse {
    MockResponse::json(serde_json::json!({
        "name": name,
        "done": true,
        "response": {
            "@type": "type.googleapis.com/google.ai.generativelanguage.v1beta.PredictLongRunningResponse",
            "generateVideoResponse": {
                "generatedSamples": [{ "video": { "uri": uri } }]
            }
        }
    }))
}

/// `generateContent` response whose single text part is `text`.
pub fn text_reply(text: &str) -> MockResponse {
    MockResponse::json(serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}
