use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};

use crate::artifact::{ArtifactHandle, ArtifactStore};
use crate::config::DEFAULT_DOWNLOAD_TIMEOUT;
use crate::error::{Result, VeogenError};

/// Upper bound on a downloaded video.
pub const MAX_ARTIFACT_BYTES: usize = 512 * 1024 * 1024;

/// Upper bound on the error body kept from a failed download.
pub const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// Fetches a finished video and turns it into a local [`ArtifactHandle`].
pub struct ResultResolver {
    client: Client,
    api_key: String,
    store: ArtifactStore,
    timeout: Duration,
    max_bytes: usize,
}

/// Append `key=<credential>` to the locator, keeping its existing query.
pub fn authorized_locator(locator: &str, api_key: &str) -> Result<Url> {
    let mut url = Url::parse(locator)
        .map_err(|e| VeogenError::Parse(format!("invalid video locator: {e}")))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Stream a body into memory, keeping at most `limit` bytes. The flag is set
/// when the body ran past `limit`; the rest is not read.
async fn read_capped(response: Response, limit: usize) -> Result<(Vec<u8>, bool)> {
    let mut stream = response.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| VeogenError::Request(e.without_url()))?;
        let room = limit - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok((buf, false))
}

impl ResultResolver {
    pub fn new(client: Client, api_key: impl Into<String>, store: ArtifactStore) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            store,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            max_bytes: MAX_ARTIFACT_BYTES,
        }
    }

    /// Bound on the whole download, headers through last byte.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub async fn resolve(&self, locator: &str) -> Result<ArtifactHandle> {
        let url = authorized_locator(locator, &self.api_key)?;
        let start = Instant::now();

        let (bytes, mime_type) = tokio::time::timeout(self.timeout, self.fetch(url))
            .await
            .map_err(|_| {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "video download timed out"
                );
                VeogenError::Timeout(start.elapsed().as_millis() as u64)
            })??;

        tracing::info!(
            bytes = bytes.len(),
            mime_type = mime_type,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "video downloaded"
        );

        self.store.create(&bytes, &mime_type).await
    }

    async fn fetch(&self, url: Url) -> Result<(Vec<u8>, String)> {
        // The URL carries the credential; strip it from any transport error.
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VeogenError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = match read_capped(response, MAX_ERROR_BODY_BYTES).await {
                Ok((bytes, false)) => String::from_utf8_lossy(&bytes).into_owned(),
                Ok((bytes, true)) => format!("{}... (truncated)", String::from_utf8_lossy(&bytes)),
                Err(e) => format!("(error body unreadable: {e})"),
            };
            tracing::warn!(status = status.as_u16(), "video download failed");
            return Err(VeogenError::Download {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(len) = response.content_length()
            && len > self.max_bytes as u64
        {
            return Err(self.too_large(&len.to_string()));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();

        // No usable Content-Length (chunked): enforce the cap while streaming.
        let (bytes, overflowed) = read_capped(response, self.max_bytes).await?;
        if overflowed {
            return Err(self.too_large(&format!("more than {}", self.max_bytes)));
        }
        Ok((bytes, mime_type))
    }

    fn too_large(&self, size: &str) -> VeogenError {
        VeogenError::Parse(format!(
            "video too large: {size} bytes (max {})",
            self.max_bytes
        ))
    }
}
