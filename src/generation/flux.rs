use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    config::GenerationConfig,
    error::{AppError, Result},
    generation::Generation,
    models::{
        GenerationRequest, GenerationResult, ModelTier, OutputFormat, QueueStatus, QueueUpdate,
    },
};

/// Client for a FLUX Kontext image editing service behind a submit/poll
/// queue API. One model handles single-image edits (with a cheaper fast
/// variant), another handles two-image compositions.
pub struct FluxClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_single: String,
    model_single_fast: String,
    model_multi: String,
    poll_interval: Duration,
    updates: Option<UnboundedSender<QueueUpdate>>,
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_urls: Option<Vec<&'a str>>,
    guidance_scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_inference_steps: Option<u32>,
    output_format: OutputFormat,
    safety_tolerance: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct QueueHandshake {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: QueueStatus,
    #[serde(default)]
    logs: Option<Vec<LogEntry>>,
}

#[derive(Debug, Deserialize)]
struct LogEntry {
    message: String,
}

impl FluxClient {
    pub fn new(config: &GenerationConfig, updates: Option<UnboundedSender<QueueUpdate>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model_single: config.model_single.clone(),
            model_single_fast: config.model_single_fast.clone(),
            model_multi: config.model_multi.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            updates,
        }
    }

    // Two input images always route to the multi model; single images pick
    // the tier requested.
    fn model_for(&self, request: &GenerationRequest) -> &str {
        if request.image_refs.len() > 1 {
            &self.model_multi
        } else {
            match request.tier {
                ModelTier::Max => &self.model_single,
                ModelTier::Fast => &self.model_single_fast,
            }
        }
    }

    fn submit_body<'a>(&self, request: &'a GenerationRequest) -> SubmitBody<'a> {
        let multi = request.image_refs.len() > 1;
        let params = &request.params;

        SubmitBody {
            prompt: &request.prompt,
            image_url: if multi {
                None
            } else {
                request.image_refs.first().map(|r| r.as_str())
            },
            image_urls: multi.then(|| request.image_refs.iter().map(|r| r.as_str()).collect()),
            guidance_scale: params.guidance_scale,
            // The fast single-image model does not take a step count; the
            // multi model does not take an aspect ratio.
            num_inference_steps: match (multi, request.tier) {
                (false, ModelTier::Fast) => None,
                _ => Some(params.num_inference_steps),
            },
            output_format: params.output_format,
            safety_tolerance: &params.safety_tolerance,
            aspect_ratio: if multi {
                None
            } else {
                Some(params.aspect_ratio.as_deref().unwrap_or("1:1"))
            },
            seed: params.seed,
        }
    }

    fn notify(&self, update: QueueUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }

    async fn enqueue(&self, model: &str, request: &GenerationRequest) -> Result<QueueHandshake> {
        let url = format!("{}/{}", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&self.submit_body(request))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("submit request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "submit rejected with status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("malformed queue handshake: {e}")))
    }

    async fn fetch_status(&self, status_url: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(status_url)
            .query(&[("logs", "1")])
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("status request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Generation(format!(
                "status request rejected with status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("malformed status response: {e}")))
    }

    async fn fetch_result(&self, response_url: &str) -> Result<GenerationResult> {
        let response = self
            .client
            .get(response_url)
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("result request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Generation(format!(
                "result request rejected with status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("malformed result payload: {e}")))
    }

    fn status_url(&self, model: &str, request_id: &str) -> String {
        format!("{}/{}/requests/{}/status", self.base_url, model, request_id)
    }

    fn response_url(&self, model: &str, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.base_url, model, request_id)
    }
}

#[async_trait]
impl Generation for FluxClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let model = self.model_for(request);
        let handshake = self.enqueue(model, request).await?;
        tracing::info!(request_id = %handshake.request_id, model, "generation request queued");

        let status_url = handshake
            .status_url
            .clone()
            .unwrap_or_else(|| self.status_url(model, &handshake.request_id));
        let response_url = handshake
            .response_url
            .clone()
            .unwrap_or_else(|| self.response_url(model, &handshake.request_id));

        loop {
            let poll = self.fetch_status(&status_url).await?;
            let logs = poll
                .logs
                .unwrap_or_default()
                .into_iter()
                .map(|entry| entry.message)
                .collect();
            self.notify(QueueUpdate {
                request_id: handshake.request_id.clone(),
                status: poll.status,
                logs,
            });

            if poll.status == QueueStatus::Completed {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let mut result = self.fetch_result(&response_url).await?;
        if result.images.is_empty() {
            return Err(AppError::Generation(
                "service returned no images".to_string(),
            ));
        }
        result.request_id = Some(handshake.request_id);
        Ok(result)
    }

    async fn status(&self, request_id: &str) -> Result<QueueStatus> {
        let url = self.status_url(&self.model_single, request_id);
        Ok(self.fetch_status(&url).await?.status)
    }

    async fn result(&self, request_id: &str) -> Result<GenerationResult> {
        let url = self.response_url(&self.model_single, request_id);
        self.fetch_result(&url).await
    }
}
