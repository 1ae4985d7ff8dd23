use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VeogenError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.0-generate-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Bound on one submit or status call (send plus body).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound on the whole video download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_ARTIFACT_DIR: &str = ".veogen/videos";
pub const DEFAULT_PROMPT_LANGUAGE: &str = "Bahasa Indonesia";

/// Credential variables, checked in order.
const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Optional TOML overlay. Every key is optional; env vars win.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub video_model: Option<String>,
    pub text_model: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub artifact_dir: Option<PathBuf>,
    pub prompt_language: Option<String>,
    pub forward_video_options: Option<bool>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VeogenError::Config(e.to_string()))
    }

    fn read(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VeogenError::Config(format!("{}: {e}", path.display()))),
        }
    }
}

/// Process-wide configuration, built once at startup and passed explicitly
/// to every service.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub video_model: String,
    pub text_model: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub artifact_dir: PathBuf,
    /// Language of the localized narrative produced by the prompt service.
    pub prompt_language: String,
    /// Send aspect ratio, resolution and audio flags to the provider.
    /// Off unless the provider contract is known to accept them.
    pub forward_video_options: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("video_model", &self.video_model)
            .field("text_model", &self.text_model)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("download_timeout", &self.download_timeout)
            .field("artifact_dir", &self.artifact_dir)
            .field("prompt_language", &self.prompt_language)
            .field("forward_video_options", &self.forward_video_options)
            .finish()
    }
}

impl Config {
    /// Config with defaults for everything except the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            prompt_language: DEFAULT_PROMPT_LANGUAGE.to_string(),
            forward_video_options: false,
        }
    }

    /// Load from `VEOGEN_CONFIG` (or `./veogen.toml`) overlaid with env vars.
    /// Fails when no credential is present.
    pub fn load() -> Result<Self> {
        let path = env::var("VEOGEN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("veogen.toml"));
        let file = FileConfig::read(&path)?.unwrap_or_default();
        Self::from_parts(file, |name| env::var(name).ok())
    }

    /// Merge a file overlay with an env lookup. Env values win over the file.
    pub fn from_parts(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|name| lookup(*name))
            .ok_or_else(|| VeogenError::MissingCredential(API_KEY_VARS[0].to_string()))?;

        let mut config = Self::new(api_key);

        if let Some(v) = lookup("VEOGEN_BASE_URL").or(file.base_url) {
            config.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("VEOGEN_VIDEO_MODEL").or(file.video_model) {
            config.video_model = v;
        }
        if let Some(v) = lookup("VEOGEN_TEXT_MODEL").or(file.text_model) {
            config.text_model = v;
        }
        if let Some(d) = seconds(&lookup, "VEOGEN_POLL_INTERVAL_SECS", file.poll_interval_secs)? {
            config.poll_interval = d;
        }
        if let Some(d) = seconds(&lookup, "VEOGEN_REQUEST_TIMEOUT_SECS", file.request_timeout_secs)? {
            config.request_timeout = d;
        }
        if let Some(d) =
            seconds(&lookup, "VEOGEN_DOWNLOAD_TIMEOUT_SECS", file.download_timeout_secs)?
        {
            config.download_timeout = d;
        }
        if let Some(v) = lookup("VEOGEN_ARTIFACT_DIR")
            .map(PathBuf::from)
            .or(file.artifact_dir)
        {
            config.artifact_dir = v;
        }
        if let Some(v) = lookup("VEOGEN_PROMPT_LANGUAGE").or(file.prompt_language) {
            config.prompt_language = v;
        }
        if let Some(v) = file.forward_video_options {
            config.forward_video_options = v;
        }

        if config.forward_video_options {
            tracing::warn!("forwarding video options to provider; unsupported fields may be rejected");
        }

        Ok(config)
    }
}

/// Positive whole seconds from `var`, falling back to the file value.
fn seconds(
    lookup: impl Fn(&str) -> Option<String>,
    var: &str,
    file_value: Option<u64>,
) -> Result<Option<Duration>> {
    let secs = match lookup(var) {
        Some(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|e| VeogenError::Config(format!("{var}={raw}: {e}")))?,
        ),
        None => file_value,
    };
    match secs {
        Some(0) => Err(VeogenError::Config(format!("{var} must be at least 1 second"))),
        Some(s) => Ok(Some(Duration::from_secs(s))),
        None => Ok(None),
    }
}
