use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactHandle;
use crate::request::{AspectRatio, Resolution, VideoOptions};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateVideoRequest {
    /// Descriptive prompt (plain text or a JSON object as text). Must not be empty.
    pub prompt: String,
    /// Path to a reference image (.png, .jpg, .jpeg, .webp) used as the first frame.
    pub image_path: Option<String>,
    /// "16:9" (default) or "9:16".
    pub aspect_ratio: Option<AspectRatio>,
    /// "720p" or "1080p" (default).
    pub resolution: Option<Resolution>,
    /// Generate an audio track (default true).
    pub sound_enabled: Option<bool>,
}

impl GenerateVideoRequest {
    pub fn options(&self) -> VideoOptions {
        let defaults = VideoOptions::default();
        VideoOptions {
            aspect_ratio: self.aspect_ratio.unwrap_or(defaults.aspect_ratio),
            resolution: self.resolution.unwrap_or(defaults.resolution),
            sound_enabled: self.sound_enabled.unwrap_or(defaults.sound_enabled),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveVideoRequest {
    /// File or directory to copy the current video to (default "generated-video.mp4").
    pub destination: Option<String>,
}

/// Description of the video currently held by the server.
#[derive(Debug, Serialize)]
pub struct VideoInfo {
    pub url: String,
    pub path: String,
    pub mime_type: String,
    pub bytes: u64,
}

impl From<&ArtifactHandle> for VideoInfo {
    fn from(handle: &ArtifactHandle) -> Self {
        Self {
            url: handle.url(),
            path: handle.path().display().to_string(),
            mime_type: handle.mime_type().to_string(),
            bytes: handle.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateVideoResponse {
    pub video: VideoInfo,
    /// Progress messages in the order they were reported.
    pub progress: Vec<String>,
}
