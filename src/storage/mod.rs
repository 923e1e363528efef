use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};

pub mod local;
pub mod remote;

pub use local::LocalStorage;
pub use remote::HttpStorage;

/// Durable home for processed images. `upload` stores one object and
/// returns its public URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, data: &[u8], mime: &str) -> Result<String>;
}

/// Content-addressed object name: a SHA-256 prefix of the payload plus an
/// extension derived from the mime type.
pub fn object_key(data: &[u8], mime: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = format!("{:x}", hasher.finalize());
    format!("{}.{}", &digest[..16], extension_for(mime))
}

pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

pub fn create_storage(config: &StorageConfig) -> Result<Box<dyn ObjectStorage>> {
    match config.backend.as_str() {
        "local" => {
            let storage = local::LocalStorage::new(&config.local_dir)?;
            Ok(Box::new(storage))
        }
        "http" => {
            let url = config.upload_url.clone().ok_or_else(|| {
                AppError::Config("STORAGE_UPLOAD_URL is required for the http backend".to_string())
            })?;
            Ok(Box::new(remote::HttpStorage::new(url, config.api_key.clone())))
        }
        other => Err(AppError::Config(format!(
            "unsupported storage backend: {other}"
        ))),
    }
}
