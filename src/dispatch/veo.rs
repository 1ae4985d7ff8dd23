use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::config::Config;
use crate::dispatch::Operation;
use crate::error::{Result, VeogenError};
use crate::request::GenerationRequest;

/// Provider-specific request/response shaping for a long-running
/// generation API. Transport is handled by the poller.
pub trait LongRunningApi: Send + Sync {
    /// URL of the creation call.
    fn submit_url(&self) -> String;

    /// JSON body of the creation call.
    fn build_submit_body(&self, request: &GenerationRequest) -> serde_json::Value;

    /// URL of the status call for an operation handle. Always on the
    /// configured host, since the call carries the credential.
    fn status_url(&self, operation_name: &str) -> String;

    /// Parse a creation or status response into an [`Operation`].
    fn parse_operation(&self, body: &[u8]) -> Result<Operation>;
}

// ---------------------------------------------------------------------------
// Gemini API `predictLongRunning` (Veo)
// ---------------------------------------------------------------------------

pub struct VeoApi {
    base_url: String,
    model: String,
    forward_options: bool,
}

impl VeoApi {
    pub fn new(base_url: &str, model: &str, forward_options: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: normalize_model_id(model),
            forward_options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.base_url,
            &config.video_model,
            config.forward_video_options,
        )
    }
}

/// Accept `veo-x`, `models/veo-x` or a full resource path.
fn normalize_model_id(model: &str) -> String {
    let trimmed = model.trim().trim_matches('/');
    if let Some(pos) = trimmed.rfind("models/") {
        return trimmed[pos + "models/".len()..].to_string();
    }
    trimmed.to_string()
}

impl LongRunningApi for VeoApi {
    fn submit_url(&self) -> String {
        format!("{}/models/{}:predictLongRunning", self.base_url, self.model)
    }

    fn build_submit_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut instance = serde_json::json!({ "prompt": request.prompt() });
        if let Some(image) = request.image() {
            instance["image"] = serde_json::json!({
                "imageBytes": BASE64_STANDARD.encode(&image.bytes),
                "mimeType": image.mime_type.as_str(),
            });
        }

        let mut parameters = serde_json::json!({ "sampleCount": 1 });
        if self.forward_options {
            let options = request.options();
            parameters["aspectRatio"] = options.aspect_ratio.as_str().into();
            parameters["resolution"] = options.resolution.as_str().into();
            parameters["generateAudio"] = options.sound_enabled.into();
        }

        serde_json::json!({
            "instances": [instance],
            "parameters": parameters,
        })
    }

    fn status_url(&self, operation_name: &str) -> String {
        let name = operation_name.trim().trim_start_matches('/');
        format!("{}/{name}", self.base_url)
    }

    fn parse_operation(&self, body: &[u8]) -> Result<Operation> {
        let op: Operation = serde_json::from_slice(body)
            .map_err(|e| VeogenError::Parse(format!("Veo operation: {e}")))?;
        if op.name.trim().is_empty() {
            return Err(VeogenError::Parse("Veo operation missing 'name'".into()));
        }
        Ok(op)
    }
}
