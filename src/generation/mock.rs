use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::{
    error::Result,
    generation::Generation,
    models::{GenerationRequest, GenerationResult, OutputAsset, QueueStatus, QueueUpdate},
};

/// Stand-in backend used when no credential is configured. Simulates queue
/// progress and answers with a placeholder image.
pub struct MockGeneration {
    updates: Option<UnboundedSender<QueueUpdate>>,
    delay: Duration,
}

impl MockGeneration {
    pub fn new(updates: Option<UnboundedSender<QueueUpdate>>) -> Self {
        Self::with_delay(updates, Duration::from_secs(2))
    }

    pub fn with_delay(updates: Option<UnboundedSender<QueueUpdate>>, delay: Duration) -> Self {
        Self { updates, delay }
    }

    fn notify(&self, request_id: &str, status: QueueStatus) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(QueueUpdate {
                request_id: request_id.to_string(),
                status,
                logs: Vec::new(),
            });
        }
    }

    fn placeholder() -> OutputAsset {
        OutputAsset {
            url: format!("https://picsum.photos/512/512?random={}", rand::random::<u32>()),
            width: 512,
            height: 512,
            content_type: Some("image/jpeg".to_string()),
        }
    }
}

#[async_trait]
impl Generation for MockGeneration {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let request_id = Uuid::new_v4().to_string();
        tracing::info!(%request_id, "running mock generation");

        self.notify(&request_id, QueueStatus::InQueue);
        tokio::time::sleep(self.delay / 4).await;
        self.notify(&request_id, QueueStatus::InProgress);
        tokio::time::sleep(self.delay / 2).await;
        self.notify(&request_id, QueueStatus::InProgress);
        tokio::time::sleep(self.delay / 4).await;
        self.notify(&request_id, QueueStatus::Completed);

        Ok(GenerationResult {
            images: vec![Self::placeholder()],
            seed: request.params.seed,
            request_id: Some(request_id),
        })
    }

    async fn status(&self, _request_id: &str) -> Result<QueueStatus> {
        Ok(QueueStatus::Completed)
    }

    async fn result(&self, request_id: &str) -> Result<GenerationResult> {
        Ok(GenerationResult {
            images: vec![Self::placeholder()],
            seed: None,
            request_id: Some(request_id.to_string()),
        })
    }
}
