pub mod poll;
pub mod resolve;
pub mod text;
pub mod veo;

use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Result, VeogenError};

/// Max body size for JSON responses from the provider.
pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Header carrying the credential on JSON API calls.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Paths (JSON pointers into `Operation::response`) where a finished job
/// may report its first video locator.
const LOCATOR_POINTERS: [&str; 3] = [
    "/generateVideoResponse/generatedSamples/0/video/uri",
    "/generateVideoResponse/generatedSamples/0/videoUri",
    "/generatedVideos/0/video/uri",
];

/// Server-tracked long-running job. Only ever built by parsing a provider
/// response; never mutated locally.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Locator of the first generated video, if the response carries one.
    pub fn locator(&self) -> Option<&str> {
        let response = self.response.as_ref()?;
        LOCATOR_POINTERS
            .iter()
            .filter_map(|p| response.pointer(p).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|uri| !uri.is_empty())
    }
}

/// Receives human-readable progress messages, synchronously and in order.
/// Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Sink that keeps every message and mirrors it to the log. Optionally
/// forwards each message on a channel as it arrives.
#[derive(Default)]
pub struct ProgressLog {
    messages: Mutex<Vec<String>>,
    forward: Option<UnboundedSender<String>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also send every message to `tx`. A closed receiver is ignored.
    pub fn forwarding(tx: UnboundedSender<String>) -> Self {
        Self {
            messages: Mutex::default(),
            forward: Some(tx),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, message: &str) {
        tracing::info!(progress = message, "generation progress");
        match self.messages.lock() {
            Ok(mut m) => m.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
        if let Some(tx) = &self.forward {
            let _ = tx.send(message.to_string());
        }
    }
}

/// Shared HTTP client for all provider calls.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(4)
        .build()
        .map_err(VeogenError::Request)
}

/// Read a JSON API response body, mapping non-2xx to `Transport` and
/// enforcing [`MAX_RESPONSE_BYTES`].
pub(crate) async fn read_json_body(response: Response) -> Result<Vec<u8>> {
    let status = response.status();

    if !status.is_success() {
        let error_bytes = response
            .bytes()
            .await
            .map_err(|e| VeogenError::Request(e.without_url()))?;
        let truncated = &error_bytes[..error_bytes.len().min(MAX_RESPONSE_BYTES)];
        return Err(VeogenError::Transport {
            status: status.as_u16(),
            body: String::from_utf8_lossy(truncated).into_owned(),
        });
    }

    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(VeogenError::Parse(format!(
            "response too large: {len} bytes (max {MAX_RESPONSE_BYTES})"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| VeogenError::Request(e.without_url()))?;

    if bytes.len() > MAX_RESPONSE_BYTES {
        return Err(VeogenError::Parse(format!(
            "response too large: {} bytes (max {MAX_RESPONSE_BYTES})",
            bytes.len()
        )));
    }

    Ok(bytes.to_vec())
}
