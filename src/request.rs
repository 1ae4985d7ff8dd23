use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VeogenError};

/// Reference image types the provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMimeType {
    Png,
    Jpeg,
    Webp,
}

impl ImageMimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    pub fn parse(mime: &str) -> Result<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Ok(Self::Png),
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/webp" => Ok(Self::Webp),
            other => Err(VeogenError::Validation(format!(
                "unsupported image type: {other} (expected png, jpeg or webp)"
            ))),
        }
    }

    pub fn from_extension(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("webp") => Ok(Self::Webp),
            _ => Err(VeogenError::Validation(format!(
                "unsupported image file: {} (expected .png, .jpg, .jpeg or .webp)",
                path.display()
            ))),
        }
    }
}

/// Raw image bytes used as the first frame of the video.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: ImageMimeType,
}

impl std::fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Result<Self> {
        let mime_type = ImageMimeType::parse(mime_type)?;
        if bytes.is_empty() {
            return Err(VeogenError::Validation("reference image is empty".to_string()));
        }
        Ok(Self { bytes, mime_type })
    }

    /// Read an image file, inferring its type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = ImageMimeType::from_extension(path)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            VeogenError::Validation(format!("cannot read image {}: {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(VeogenError::Validation(format!(
                "image file is empty: {}",
                path.display()
            )));
        }
        Ok(Self { bytes, mime_type })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd,
    #[default]
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hd => "720p",
            Self::FullHd => "1080p",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOptions {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub sound_enabled: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            sound_enabled: true,
        }
    }
}

/// A validated video generation request. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    prompt: String,
    image: Option<ReferenceImage>,
    options: VideoOptions,
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&ReferenceImage> {
        self.image.as_ref()
    }

    pub fn options(&self) -> &VideoOptions {
        &self.options
    }
}

/// Validate inputs into a [`GenerationRequest`]. No I/O.
pub fn build_request(
    prompt: &str,
    image: Option<ReferenceImage>,
    options: VideoOptions,
) -> Result<GenerationRequest> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(VeogenError::Validation("Prompt cannot be empty.".to_string()));
    }
    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        image,
        options,
    })
}
