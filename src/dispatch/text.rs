use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::dispatch::{API_KEY_HEADER, read_json_body};
use crate::error::{Result, VeogenError};

/// Single-shot text generations finish well within this.
const TEXT_TIMEOUT: Duration = Duration::from_secs(120);

/// One schema-constrained generation call.
pub struct StructuredRequest<'a> {
    pub contents: &'a str,
    pub system_instruction: &'a str,
    /// Response schema in the provider's OpenAPI subset.
    pub schema: serde_json::Value,
}

/// Gemini API `generateContent` with JSON output.
pub struct TextDispatch {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl TextDispatch {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.text_model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn build_body(req: &StructuredRequest<'_>) -> serde_json::Value {
        serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": req.contents}]}],
            "systemInstruction": {"parts": [{"text": req.system_instruction}]},
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": req.schema,
            },
        })
    }

    /// Run the call and return the raw JSON text the model produced.
    pub async fn generate_json(&self, req: &StructuredRequest<'_>) -> Result<String> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(TEXT_TIMEOUT)
            .json(&Self::build_body(req))
            .send()
            .await
            .map_err(|e| VeogenError::Request(e.without_url()))?;

        let bytes = read_json_body(response).await?;
        let text = extract_text(&bytes)?;

        tracing::info!(
            model = self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "text generation completed"
        );

        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(body: &[u8]) -> Result<String> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body)
        .map_err(|e| VeogenError::Parse(format!("generateContent response: {e}")))?;

    if parsed.candidates.is_empty()
        && let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason)
    {
        return Err(VeogenError::Parse(format!("prompt blocked: {reason}")));
    }

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(VeogenError::Parse(
            "empty candidates or no text in response".to_string(),
        ));
    }
    Ok(text)
}
