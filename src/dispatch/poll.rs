use std::time::{Duration, Instant};

use reqwest::Client;

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::dispatch::veo::LongRunningApi;
use crate::dispatch::{API_KEY_HEADER, Operation, ProgressSink, read_json_body};
use crate::error::{Result, VeogenError};
use crate::request::GenerationRequest;

/// Status strings shown while a job runs. There is no real progress
/// telemetry, so these rotate one step per poll.
pub const PROGRESS_MESSAGES: [&str; 7] = [
    "The model is warming up...",
    "Analyzing your prompt and image...",
    "Generating initial video frames...",
    "This can take a few minutes, hang tight!",
    "Compositing video scenes...",
    "Rendering the final video at high resolution...",
    "Almost there, adding finishing touches...",
];

/// Message for poll iteration `iteration` (0-indexed). Wraps forever.
pub fn progress_message(iteration: usize) -> &'static str {
    PROGRESS_MESSAGES[iteration % PROGRESS_MESSAGES.len()]
}

/// Terminal check of a finished operation: provider error first, then the
/// artifact locator.
pub fn evaluate(operation: &Operation) -> Result<String> {
    if let Some(error) = &operation.error {
        return Err(VeogenError::Provider(error.message.clone()));
    }
    operation
        .locator()
        .map(str::to_string)
        .ok_or(VeogenError::MissingArtifact)
}

/// Drives one long-running job from submission to a terminal state with a
/// fixed delay between status calls. No backoff, no retry, no iteration cap.
/// Each individual call is bounded by the request timeout.
pub struct OperationPoller<A> {
    client: Client,
    api: A,
    api_key: String,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl<A: LongRunningApi> OperationPoller<A> {
    pub fn new(client: Client, api: A, api_key: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            client,
            api,
            api_key: api_key.into(),
            poll_interval,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Submit `request` and poll until done. Returns the first artifact locator.
    pub async fn run(&self, request: &GenerationRequest, sink: &dyn ProgressSink) -> Result<String> {
        let start = Instant::now();

        let mut operation = self.submit(request).await?;
        tracing::info!(
            operation = operation.name,
            done = operation.done,
            interval_ms = self.poll_interval.as_millis() as u64,
            "generation job submitted"
        );

        let mut iteration: usize = 0;
        while !operation.done {
            sink.report(progress_message(iteration));
            iteration += 1;

            tokio::time::sleep(self.poll_interval).await;

            operation = self.status(&operation.name).await?;
            tracing::debug!(
                operation = operation.name,
                attempt = iteration,
                done = operation.done,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "polled generation job"
            );
        }

        let result = evaluate(&operation);
        match &result {
            Ok(_) => tracing::info!(
                operation = operation.name,
                polls = iteration,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "generation job completed"
            ),
            Err(e) => tracing::warn!(
                operation = operation.name,
                polls = iteration,
                code = operation.error.as_ref().and_then(|err| err.code),
                "generation job failed: {e}"
            ),
        }
        result
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Operation> {
        let body = self.api.build_submit_body(request);
        let call = self
            .client
            .post(self.api.submit_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body);
        self.exchange(call).await
    }

    async fn status(&self, operation_name: &str) -> Result<Operation> {
        let call = self
            .client
            .get(self.api.status_url(operation_name))
            .header(API_KEY_HEADER, &self.api_key);
        self.exchange(call).await
    }

    /// Send one call and parse the operation it returns, within the request
    /// timeout. Expiry is reported once and never retried.
    async fn exchange(&self, call: reqwest::RequestBuilder) -> Result<Operation> {
        let start = Instant::now();
        let bytes = tokio::time::timeout(self.request_timeout, async {
            let response = call
                .send()
                .await
                .map_err(|e| VeogenError::Request(e.without_url()))?;
            read_json_body(response).await
        })
        .await
        .map_err(|_| {
            tracing::warn!(
                timeout_ms = self.request_timeout.as_millis() as u64,
                "provider call timed out"
            );
            VeogenError::Timeout(start.elapsed().as_millis() as u64)
        })??;
        self.api.parse_operation(&bytes)
    }
}
