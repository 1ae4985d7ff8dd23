use std::time::Instant;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Json,
}

/// Envelope every tool returns as a single text block. Failures carry the
/// error's user message in `content` and set `isError` on the MCP result.
#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    pub content: String,
    pub content_type: ContentType,
    pub metadata: ToolMetadata,
}

#[derive(Debug, Serialize)]
pub struct ToolMetadata {
    pub tool_name: &'static str,
    pub model_used: String,
    pub duration_seconds: f64,
}

impl ToolMetadata {
    /// Metadata for a call to `tool_name` that began at `start`.
    pub fn since(tool_name: &'static str, model_used: &str, start: Instant) -> Self {
        Self {
            tool_name,
            model_used: model_used.to_string(),
            duration_seconds: start.elapsed().as_secs_f64(),
        }
    }
}

impl ToolResponse {
    pub fn success(content: impl Into<String>, metadata: ToolMetadata) -> Self {
        Self {
            status: ToolStatus::Success,
            content: content.into(),
            content_type: ContentType::Text,
            metadata,
        }
    }

    /// Success whose content is `value` as pretty-printed JSON.
    pub fn success_json<T: Serialize>(value: &T, metadata: ToolMetadata) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(content) => Self {
                status: ToolStatus::Success,
                content,
                content_type: ContentType::Json,
                metadata,
            },
            Err(e) => Self::error(format!("failed to encode result: {e}"), metadata),
        }
    }

    pub fn error(message: impl Into<String>, metadata: ToolMetadata) -> Self {
        Self {
            status: ToolStatus::Error,
            content: message.into(),
            content_type: ContentType::Text,
            metadata,
        }
    }

    pub fn into_call_tool_result(self) -> CallToolResult {
        let failed = self.status == ToolStatus::Error;
        match serde_json::to_string(&self) {
            Ok(json) if failed => CallToolResult::error(vec![Content::text(json)]),
            Ok(json) => CallToolResult::success(vec![Content::text(json)]),
            Err(e) => CallToolResult::error(vec![Content::text(format!(
                "failed to encode tool response: {e}"
            ))]),
        }
    }
}
