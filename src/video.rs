use reqwest::Client;

use crate::artifact::{ArtifactHandle, ArtifactStore};
use crate::config::Config;
use crate::dispatch::ProgressSink;
use crate::dispatch::poll::OperationPoller;
use crate::dispatch::resolve::ResultResolver;
use crate::dispatch::veo::{LongRunningApi, VeoApi};
use crate::error::Result;
use crate::request::{ReferenceImage, VideoOptions, build_request};

pub const SENDING_MESSAGE: &str = "Sending request to VEO-3...";
pub const DOWNLOADING_MESSAGE: &str = "Downloading generated video...";

/// Prompt in, local video handle out.
pub struct VideoService<A = VeoApi> {
    poller: OperationPoller<A>,
    resolver: ResultResolver,
    model: String,
}

impl VideoService<VeoApi> {
    pub fn new(client: Client, config: &Config) -> Self {
        Self::with_api(client, VeoApi::from_config(config), config)
    }
}

impl<A: LongRunningApi> VideoService<A> {
    pub fn with_api(client: Client, api: A, config: &Config) -> Self {
        let poller = OperationPoller::new(
            client.clone(),
            api,
            config.api_key.clone(),
            config.poll_interval,
        )
        .with_request_timeout(config.request_timeout);
        let resolver = ResultResolver::new(
            client,
            config.api_key.clone(),
            ArtifactStore::new(&config.artifact_dir),
        )
        .with_timeout(config.download_timeout);
        Self {
            poller,
            resolver,
            model: config.video_model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate one video. Validation failures return before any network call
    /// or progress message.
    pub async fn generate_video(
        &self,
        prompt: &str,
        image: Option<ReferenceImage>,
        options: VideoOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ArtifactHandle> {
        let request = build_request(prompt, image, options)?;
        tracing::info!(
            model = self.model,
            prompt_chars = request.prompt().len(),
            has_image = request.image().is_some(),
            aspect_ratio = request.options().aspect_ratio.as_str(),
            resolution = request.options().resolution.as_str(),
            sound = request.options().sound_enabled,
            "video generation requested"
        );

        sink.report(SENDING_MESSAGE);
        let locator = self.poller.run(&request, sink).await?;

        sink.report(DOWNLOADING_MESSAGE);
        self.resolver.resolve(&locator).await
    }
}
