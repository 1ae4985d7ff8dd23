use thiserror::Error;

#[derive(Debug, Error)]
pub enum VeogenError {
    #[error("{0}")]
    Validation(String),

    #[error("provider returned HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("Video generation failed: {0}")]
    Provider(String),

    #[error("Video URI not found in the API response.")]
    MissingArtifact,

    #[error("Failed to download the generated video. Status: {status}. Details: {body}")]
    Download { status: u16, body: String },

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("The {0} environment variable is missing.")]
    MissingCredential(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("artifact store error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VeogenError>;

impl VeogenError {
    /// HTTP status carried by transport-level variants.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } | Self::Download { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Single human-readable message for the caller.
    ///
    /// Provider, download and validation messages are passed through verbatim;
    /// connection-level detail (URLs with the credential in the query) is not.
    pub fn user_message(&self) -> String {
        match self {
            Self::Request(e) if e.is_timeout() => "request to provider timed out".to_string(),
            Self::Request(_) => "request to provider failed".to_string(),
            other => other.to_string(),
        }
    }
}
