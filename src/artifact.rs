//! File-backed storage for downloaded videos.
//!
//! A handle owns one file. The file is removed exactly once: on
//! [`ArtifactHandle::release`], when the handle is dropped, or when an
//! [`ArtifactSlot`] replaces it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Default file name for a saved video.
pub const DEFAULT_DOWNLOAD_NAME: &str = "generated-video.mp4";

/// Unique suffix for artifact file names created within one process.
static ARTIFACT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `bytes` to a fresh file and return a handle that owns it.
    pub async fn create(&self, bytes: &[u8], mime_type: &str) -> Result<ArtifactHandle> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let seq = ARTIFACT_COUNTER.fetch_add(1, Ordering::Relaxed);
        let filename = format!("{ts}_{seq}.{}", extension_for(mime_type));
        let path = self.dir.join(&filename);

        // Temp file + rename so a reader never sees a partial video.
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact stored");

        Ok(ArtifactHandle {
            path,
            mime_type: mime_type.to_string(),
            len: bytes.len() as u64,
            released: false,
        })
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.split(';').next().map(str::trim) {
        Some("video/webm") => "webm",
        Some("video/quicktime") => "mov",
        _ => "mp4",
    }
}

/// Locally addressable reference to a downloaded video.
#[derive(Debug)]
pub struct ArtifactHandle {
    path: PathBuf,
    mime_type: String,
    len: u64,
    released: bool,
}

impl ArtifactHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL for players that take a URL.
    pub fn url(&self) -> String {
        let absolute = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        format!("file://{}", absolute.display())
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the video to `dest`. A directory destination gets
    /// [`DEFAULT_DOWNLOAD_NAME`] inside it.
    pub async fn save_as(&self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let mut dest = dest.as_ref().to_path_buf();
        if tokio::fs::metadata(&dest).await.is_ok_and(|m| m.is_dir()) {
            dest.push(DEFAULT_DOWNLOAD_NAME);
        }
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&self.path, &dest).await?;
        Ok(dest)
    }

    /// Remove the backing file now.
    pub fn release(mut self) {
        self.release_file();
    }

    fn release_file(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "artifact released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "failed to release artifact: {e}"),
        }
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        self.release_file();
    }
}

/// Holds at most one live handle; putting a new one in releases the old.
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    current: Option<ArtifactHandle>,
}

impl ArtifactSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ArtifactHandle> {
        self.current.as_ref()
    }

    /// Store `handle`, releasing whatever was held before.
    pub fn replace(&mut self, handle: ArtifactHandle) -> &ArtifactHandle {
        if let Some(old) = self.current.take() {
            old.release();
        }
        self.current.insert(handle)
    }

    /// Release the held handle. Returns false when the slot was empty.
    pub fn clear(&mut self) -> bool {
        match self.current.take() {
            Some(old) => {
                old.release();
                true
            }
            None => false,
        }
    }
}
