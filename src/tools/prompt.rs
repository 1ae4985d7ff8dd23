use schemars::JsonSchema;
use serde::Deserialize;

use crate::prompt::PromptFormData;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExpandIdeaRequest {
    /// Seed idea, e.g. "astronaut on a beach".
    pub idea: String,
    /// Current form. Fields the expansion fills in are overwritten; the idea is kept.
    pub form: Option<PromptFormData>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FinalizeRequest {
    /// The filled prompt form.
    pub form: PromptFormData,
}
