use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    storage::{object_key, ObjectStorage},
};

/// Storage behind an HTTP upload endpoint. The object goes up as a
/// multipart `file` field; the endpoint answers with the public URL.
pub struct HttpStorage {
    client: reqwest::Client,
    upload_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpStorage {
    pub fn new(upload_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpStorage {
    async fn upload(&self, data: &[u8], mime: &str) -> Result<String> {
        let key = object_key(data, mime);
        let part = Part::bytes(data.to_vec())
            .file_name(key)
            .mime_str(mime)
            .map_err(|e| AppError::StorageUnavailable(format!("invalid mime type: {e}")))?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&self.upload_url).multipart(form);
        if let Some(token) = &self.api_key {
            request = request.header("Authorization", format!("Key {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::StorageUnavailable(format!(
                "upload failed with status {status}"
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("malformed upload response: {e}")))?;

        Ok(body.url)
    }
}
