use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Implementation, ProgressNotificationParam, ProgressToken, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, Peer, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::artifact::{ArtifactSlot, DEFAULT_DOWNLOAD_NAME};
use crate::config::Config;
use crate::dispatch::text::TextDispatch;
use crate::dispatch::{ProgressLog, build_client};
use crate::error::VeogenError;
use crate::prompt::PromptService;
use crate::request::ReferenceImage;
use crate::response::{ToolMetadata, ToolResponse};
use crate::tools::prompt::{ExpandIdeaRequest, FinalizeRequest};
use crate::tools::video::{GenerateVideoRequest, GenerateVideoResponse, SaveVideoRequest, VideoInfo};
use crate::video::VideoService;

#[derive(Clone)]
pub struct VeogenServer {
    video: Arc<VideoService>,
    prompts: Arc<PromptService>,
    /// The video currently on offer. Replacing it releases the previous file.
    current: Arc<Mutex<ArtifactSlot>>,
    tool_router: ToolRouter<Self>,
}

fn invalid_params(e: VeogenError) -> McpError {
    McpError::invalid_params(e.user_message(), None)
}

/// Send each message to the client as a progress notification for `token`
/// until the channel closes.
async fn relay_progress(
    peer: Peer<RoleServer>,
    token: ProgressToken,
    mut rx: UnboundedReceiver<String>,
) {
    let mut step: u32 = 0;
    while let Some(message) = rx.recv().await {
        step += 1;
        let param = ProgressNotificationParam {
            progress_token: token.clone(),
            progress: f64::from(step),
            total: None,
            message: Some(message),
        };
        if let Err(e) = peer.notify_progress(param).await {
            tracing::debug!("progress notification not delivered: {e}");
        }
    }
}

#[tool_router]
impl VeogenServer {
    pub fn new(config: Config) -> Result<Self, VeogenError> {
        let client = build_client()?;
        let video = Arc::new(VideoService::new(client.clone(), &config));
        let prompts = Arc::new(PromptService::new(
            TextDispatch::new(client, &config),
            &config,
        ));
        Ok(Self {
            video,
            prompts,
            current: Arc::new(Mutex::new(ArtifactSlot::new())),
            tool_router: Self::tool_router(),
        })
    }

    #[tool(
        name = "generate_video",
        description = "Generate a video from a text prompt and optional reference image. Takes minutes; progress is sent as notifications when the request has a progress token, and returned with the result. Replaces (and deletes) the previously generated video."
    )]
    async fn generate_video(
        &self,
        Parameters(req): Parameters<GenerateVideoRequest>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let options = req.options();

        let image = match req.image_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(path) => Some(ReferenceImage::from_path(path).await.map_err(invalid_params)?),
            None => None,
        };

        let (progress, relay) = match ctx.meta.get_progress_token() {
            Some(token) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let relay = tokio::spawn(relay_progress(ctx.peer.clone(), token, rx));
                (ProgressLog::forwarding(tx), Some(relay))
            }
            None => (ProgressLog::new(), None),
        };

        let result = self
            .video
            .generate_video(&req.prompt, image, options, &progress)
            .await;
        let messages = progress.messages();

        // Closing the channel lets the relay drain, so every notification
        // precedes the result.
        drop(progress);
        if let Some(relay) = relay
            && let Err(e) = relay.await
        {
            tracing::debug!("progress relay ended abnormally: {e}");
        }

        let metadata = ToolMetadata::since("generate_video", self.video.model(), start);

        let response = match result {
            Ok(handle) => {
                let mut slot = self.current.lock().await;
                let video = VideoInfo::from(slot.replace(handle));
                ToolResponse::success_json(
                    &GenerateVideoResponse {
                        video,
                        progress: messages,
                    },
                    metadata,
                )
            }
            Err(e @ VeogenError::Validation(_)) => return Err(invalid_params(e)),
            Err(e) => {
                tracing::warn!("generate_video failed: {e}");
                ToolResponse::error(e.user_message(), metadata)
            }
        };

        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "save_video",
        description = "Copy the most recently generated video to a file or directory (default generated-video.mp4)."
    )]
    async fn save_video(
        &self,
        Parameters(req): Parameters<SaveVideoRequest>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let dest = req
            .destination
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_NAME));

        let slot = self.current.lock().await;
        let handle = slot
            .current()
            .ok_or_else(|| McpError::invalid_params("no video has been generated yet", None))?;

        let result = handle.save_as(&dest).await;
        let metadata = ToolMetadata::since("save_video", "none", start);
        let response = match result {
            Ok(saved) => ToolResponse::success(format!("saved to {}", saved.display()), metadata),
            Err(e) => {
                tracing::warn!("save_video failed: {e}");
                ToolResponse::error(e.user_message(), metadata)
            }
        };
        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "release_video",
        description = "Delete the most recently generated video from local storage."
    )]
    async fn release_video(&self) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let released = self.current.lock().await.clear();
        let content = if released {
            "video released"
        } else {
            "no video to release"
        };
        let response =
            ToolResponse::success(content, ToolMetadata::since("release_video", "none", start));
        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "expand_prompt_idea",
        description = "Expand a short video idea into detailed prompt form fields (subject, setting, camera, lighting, audio, ...). Returns the merged form as JSON; the original idea is kept.",
        annotations(read_only_hint = true)
    )]
    async fn expand_prompt_idea(
        &self,
        Parameters(req): Parameters<ExpandIdeaRequest>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let result = self.prompts.expand_prompt_idea(&req.idea).await;
        let metadata = ToolMetadata::since("expand_prompt_idea", self.prompts.model(), start);

        let response = match result {
            Ok(expanded) => {
                let mut form = req.form.unwrap_or_default();
                form.idea = req.idea;
                form.merge(expanded);
                ToolResponse::success_json(&form, metadata)
            }
            Err(e @ VeogenError::Validation(_)) => return Err(invalid_params(e)),
            Err(e) => {
                tracing::warn!("expand_prompt_idea failed: {e}");
                ToolResponse::error(e.user_message(), metadata)
            }
        };
        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "generate_final_prompts",
        description = "Turn a filled prompt form into a localized narrative prompt, an English translation and a JSON prompt. The English or JSON output can be passed to generate_video.",
        annotations(read_only_hint = true)
    )]
    async fn generate_final_prompts(
        &self,
        Parameters(req): Parameters<FinalizeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let start = Instant::now();
        let result = self.prompts.generate_final_prompts(&req.form).await;
        let metadata = ToolMetadata::since("generate_final_prompts", self.prompts.model(), start);

        let response = match result {
            Ok(prompts) => ToolResponse::success_json(&prompts, metadata),
            Err(e) => {
                tracing::warn!("generate_final_prompts failed: {e}");
                ToolResponse::error(e.user_message(), metadata)
            }
        };
        Ok(response.into_call_tool_result())
    }
}

#[tool_handler]
impl ServerHandler for VeogenServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "veogen".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "veogen: video generation and prompt drafting.\n\n\
                 Workflow:\n\
                 1. Optional: `expand_prompt_idea` with a short idea to fill the prompt form.\n\
                 2. Optional: `generate_final_prompts` with the form for narrative, English and JSON prompts.\n\
                 3. `generate_video` with a prompt (and optional image_path). This polls until the job\n\
                    finishes, usually a few minutes.\n\
                 4. `save_video` to copy the result somewhere; `release_video` to delete it."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
