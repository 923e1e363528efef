use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data_dir: String,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub max_file_size: u64,
    pub allowed_mime_types: Vec<String>,
    pub max_dimension: u32,
    pub quality_levels: Vec<u8>,
    pub target_size: u64,
    pub fallback_dimension: u32,
    pub fallback_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: String,
    pub local_dir: String,
    pub upload_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model_single: String,
    pub model_single_fast: String,
    pub model_multi: String,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            max_dimension: 2048,
            quality_levels: vec![90, 80, 70, 60, 50],
            target_size: 5 * 1024 * 1024,
            fallback_dimension: 1024,
            fallback_size: 2 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            local_dir: "./uploads".to_string(),
            upload_url: None,
            api_key: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://queue.fal.run".to_string(),
            api_key: None,
            model_single: "fal-ai/flux-pro/kontext/max".to_string(),
            model_single_fast: "fal-ai/flux-pro/kontext".to_string(),
            model_multi: "fal-ai/flux-pro/kontext/max/multi".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.mymemory.translated.net/get".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let pipeline = PipelineConfig {
            max_file_size: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| "10485760".to_string()) // 10MB
                .parse()?,
            allowed_mime_types: env::var("ALLOWED_MIME_TYPES")
                .unwrap_or_else(|_| "image/jpeg,image/jpg,image/png,image/webp".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_dimension: env::var("MAX_IMAGE_DIMENSION")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()?,
            quality_levels: env::var("COMPRESSION_QUALITY_LEVELS")
                .unwrap_or_else(|_| "90,80,70,60,50".to_string())
                .split(',')
                .map(|s| s.trim().parse())
                .collect::<std::result::Result<Vec<u8>, _>>()?,
            target_size: env::var("TARGET_SIZE_BYTES")
                .unwrap_or_else(|_| "5242880".to_string()) // 5MB
                .parse()?,
            fallback_dimension: env::var("FALLBACK_DIMENSION")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()?,
            fallback_size: env::var("FALLBACK_SIZE_BYTES")
                .unwrap_or_else(|_| "2097152".to_string()) // 2MB
                .parse()?,
        };

        let storage = StorageConfig {
            backend: env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string()),
            local_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            upload_url: env::var("STORAGE_UPLOAD_URL").ok(),
            api_key: env::var("STORAGE_API_KEY").ok(),
        };

        let generation = GenerationConfig {
            base_url: env::var("GENERATION_URL")
                .unwrap_or_else(|_| "https://queue.fal.run".to_string()),
            api_key: env::var("GENERATION_API_KEY").ok(),
            model_single: env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| "fal-ai/flux-pro/kontext/max".to_string()),
            model_single_fast: env::var("GENERATION_MODEL_FAST")
                .unwrap_or_else(|_| "fal-ai/flux-pro/kontext".to_string()),
            model_multi: env::var("GENERATION_MODEL_MULTI")
                .unwrap_or_else(|_| "fal-ai/flux-pro/kontext/max/multi".to_string()),
            poll_interval_ms: env::var("GENERATION_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
        };

        let translate = TranslateConfig {
            enabled: env::var("TRANSLATE_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            base_url: env::var("TRANSLATE_URL")
                .unwrap_or_else(|_| "https://api.mymemory.translated.net/get".to_string()),
        };

        Ok(Config {
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            pipeline,
            storage,
            generation,
            translate,
        })
    }
}
