use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::models::{GenerationRequest, GenerationResult, QueueStatus, QueueUpdate};

pub mod flux;
pub mod mock;

pub use flux::FluxClient;
pub use mock::MockGeneration;

/// Queue-backed image generation capability. Implementations are chosen at
/// construction time and hidden behind this trait.
#[async_trait]
pub trait Generation: Send + Sync {
    /// Submit a request, wait for it to finish, and return the result.
    /// Queue progress is reported through the update channel supplied at
    /// construction.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// Queue state of an in-flight request.
    async fn status(&self, request_id: &str) -> Result<QueueStatus>;

    /// Result of a completed request.
    async fn result(&self, request_id: &str) -> Result<GenerationResult>;
}

/// Build the generation backend for this configuration. Without a
/// credential the built-in mock stands in, so the rest of the flow works
/// in development unchanged.
pub fn create_generation(
    config: &GenerationConfig,
    updates: Option<UnboundedSender<QueueUpdate>>,
) -> Result<Box<dyn Generation>> {
    match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(Box::new(flux::FluxClient::new(config, updates))),
        _ => {
            tracing::warn!("no generation credential configured, using the built-in mock");
            Ok(Box::new(mock::MockGeneration::new(updates)))
        }
    }
}
