use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ImageRef;

/// Non-image parameters forwarded to the generation service.
///
/// Optional fields are omitted from the wire payload when unset.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationParams {
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub output_format: OutputFormat,
    pub safety_tolerance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            guidance_scale: 3.5,
            num_inference_steps: 28,
            output_format: OutputFormat::Jpeg,
            safety_tolerance: "2".to_string(),
            aspect_ratio: Some("1:1".to_string()),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension used when saving a downloaded asset.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(AppError::Config(format!("unknown output format: {other}"))),
        }
    }
}

/// Model quality tier: the full-quality endpoint or the cheaper, faster one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    #[default]
    Max,
    Fast,
}

/// A fully assembled generation request: the prompt text verbatim (including
/// any literal `##id` tag occurrences), the processed image references in
/// input order, and the non-image parameters.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image_refs: Vec<ImageRef>,
    pub params: GenerationParams,
    pub tier: ModelTier,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, image_refs: Vec<ImageRef>) -> Self {
        Self {
            prompt: prompt.into(),
            image_refs,
            params: GenerationParams::default(),
            tier: ModelTier::Max,
        }
    }
}

/// Queue state reported by the generation service while a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
}

/// One interim progress notification for an in-flight generation request.
#[derive(Debug, Clone)]
pub struct QueueUpdate {
    pub request_id: String,
    pub status: QueueStatus,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputAsset {
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResult {
    pub images: Vec<OutputAsset>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_service_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.guidance_scale, 3.5);
        assert_eq!(params.num_inference_steps, 28);
        assert_eq!(params.output_format, OutputFormat::Jpeg);
        assert_eq!(params.safety_tolerance, "2");
        assert_eq!(params.aspect_ratio.as_deref(), Some("1:1"));
        assert!(params.seed.is_none());
    }

    #[test]
    fn unset_optionals_are_omitted_from_the_wire() {
        let mut params = GenerationParams::default();
        params.aspect_ratio = None;

        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("aspect_ratio").is_none());
        assert!(json.get("seed").is_none());
        assert_eq!(json["output_format"], "jpeg");
    }

    #[test]
    fn output_format_parses_aliases() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert!("gif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn queue_status_parses_service_strings() {
        let status: QueueStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, QueueStatus::InProgress);
        let status: QueueStatus = serde_json::from_str("\"IN_QUEUE\"").unwrap();
        assert_eq!(status, QueueStatus::InQueue);
    }
}
