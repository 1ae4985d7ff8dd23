//! Prompt drafting: expand a seed idea into form fields, and turn a filled
//! form into a localized narrative, an English translation and a JSON
//! rendering. Single-shot text generation calls; nothing here polls.

pub mod form;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::dispatch::text::{StructuredRequest, TextDispatch};
use crate::error::{Result, VeogenError};

pub use form::{EXPAND_FIELDS, ExpandedFields, PromptFormData};

/// Output of [`PromptService::generate_final_prompts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPrompts {
    /// Narrative prompt in the configured language.
    pub localized: String,
    /// English translation of the narrative.
    pub translated: String,
    /// English prompt as JSON text; pretty-printed when it parses.
    pub json: String,
}

pub struct PromptService {
    text: TextDispatch,
    language: String,
}

/// Response schema for idea expansion: one string property per form field.
pub fn expand_schema() -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = EXPAND_FIELDS
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                serde_json::json!({"type": "STRING", "description": description}),
            )
        })
        .collect();
    serde_json::json!({"type": "OBJECT", "properties": properties})
}

/// Response schema for the three final prompt variants.
pub fn finalize_schema(language: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "localized": {
                "type": "STRING",
                "description": format!("A descriptive, narrative video prompt paragraph in {language}."),
            },
            "translated": {
                "type": "STRING",
                "description": "An accurate, natural English translation of the narrative prompt. Keep any spoken dialogue in its original language.",
            },
            "json": {
                "type": "STRING",
                "description": "The English prompt formatted as a tidy JSON string.",
            },
        },
        "required": ["localized", "translated", "json"],
    })
}

/// Re-serialize `raw` pretty-printed when it is JSON, otherwise return it as is.
pub fn pretty_json_or_raw(raw: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
        Err(_) => raw,
    }
}

impl PromptService {
    pub fn new(text: TextDispatch, config: &Config) -> Self {
        Self {
            text,
            language: config.prompt_language.clone(),
        }
    }

    pub fn model(&self) -> &str {
        self.text.model()
    }

    fn expand_instruction(&self) -> String {
        format!(
            "You are a creative assistant who specializes in visual concepts for video. \
             Take a simple idea and develop it into specific, imaginative details for every \
             category provided. Answer in {}.",
            self.language
        )
    }

    fn finalize_instruction(&self) -> String {
        format!(
            "You are an expert prompt engineer. Take the structured details and turn them into \
             three formats: 1. A well-written narrative paragraph in {lang}. 2. An accurate English \
             translation that keeps any original dialogue. 3. A JSON string of the English prompt.",
            lang = self.language
        )
    }

    /// Expand a free-text idea into form fields.
    pub async fn expand_prompt_idea(&self, idea: &str) -> Result<ExpandedFields> {
        let idea = idea.trim();
        if idea.is_empty() {
            return Err(VeogenError::Validation(
                "Enter a prompt idea first.".to_string(),
            ));
        }

        let contents =
            format!("Develop this video prompt idea into rich, specific details: \"{idea}\"");
        let instruction = self.expand_instruction();
        let raw = self
            .text
            .generate_json(&StructuredRequest {
                contents: &contents,
                system_instruction: &instruction,
                schema: expand_schema(),
            })
            .await?;

        serde_json::from_str(&raw)
            .map_err(|e| VeogenError::Parse(format!("expanded fields: {e}")))
    }

    /// Produce the final prompt variants from a filled form.
    pub async fn generate_final_prompts(&self, form: &PromptFormData) -> Result<FinalPrompts> {
        let contents = form.to_context();
        let instruction = self.finalize_instruction();
        let raw = self
            .text
            .generate_json(&StructuredRequest {
                contents: &contents,
                system_instruction: &instruction,
                schema: finalize_schema(&self.language),
            })
            .await?;

        let mut prompts: FinalPrompts = serde_json::from_str(&raw)
            .map_err(|e| VeogenError::Parse(format!("final prompts: {e}")))?;
        prompts.json = pretty_json_or_raw(prompts.json);
        Ok(prompts)
    }
}
