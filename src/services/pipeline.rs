use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::{
    config::PipelineConfig,
    error::{AppError, Result},
    models::{ImageFile, ImageRef},
    storage::ObjectStorage,
};

/// Typed progress notifications emitted while an image moves through the
/// pipeline. `slot` is the image's position in the submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Validating {
        slot: usize,
    },
    CompressionAttempt {
        slot: usize,
        attempt: usize,
        total: usize,
        quality: u8,
        size: usize,
    },
    Compressed {
        slot: usize,
        original_size: usize,
        final_size: usize,
        quality: u8,
    },
    Uploading {
        slot: usize,
    },
    Uploaded {
        slot: usize,
        url: String,
    },
    FallingBack {
        slot: usize,
        reason: String,
    },
}

/// A source image after validation, normalization, and placement: either a
/// storage URL or an inline data URI, plus what compression did to it.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub reference: ImageRef,
    pub original_size: usize,
    pub final_size: usize,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

struct CompressionOutcome {
    bytes: Vec<u8>,
    quality: u8,
    width: u32,
    height: u32,
    within_budget: bool,
}

/// Turns raw user files into references a generation request can carry.
///
/// Each image is validated, downscaled to the dimension cap, re-encoded as
/// JPEG at descending qualities, and uploaded. When storage is unreachable
/// the image falls back exactly once to an inline data URI built under a
/// stricter size budget.
pub struct ImagePipeline {
    config: PipelineConfig,
    storage: Arc<dyn ObjectStorage>,
    events: Option<UnboundedSender<PipelineEvent>>,
}

impl ImagePipeline {
    pub fn new(config: PipelineConfig, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            config,
            storage,
            events: None,
        }
    }

    /// Pipeline plus the receiving end of its progress stream.
    pub fn with_events(
        config: PipelineConfig,
        storage: Arc<dyn ObjectStorage>,
    ) -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = unbounded_channel();
        let pipeline = Self {
            config,
            storage,
            events: Some(tx),
        };
        (pipeline, rx)
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn ensure_live(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    /// Checks run before any decode work: the file must claim to be an
    /// image, fit the size cap, and carry an allowed format.
    pub fn validate(&self, file: &ImageFile) -> Result<()> {
        let kind: mime::Mime = file.mime.parse().map_err(|_| AppError::InvalidFileKind)?;
        if kind.type_() != mime::IMAGE {
            return Err(AppError::InvalidFileKind);
        }

        let size = file.size();
        if size > self.config.max_file_size {
            return Err(AppError::FileTooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }

        if !self.config.allowed_mime_types.iter().any(|m| m == &file.mime) {
            return Err(AppError::UnsupportedFormat(file.mime.clone()));
        }

        Ok(())
    }

    /// Process one image end to end.
    pub async fn prepare(
        &self,
        file: &ImageFile,
        cancel: &CancellationToken,
    ) -> Result<PreparedImage> {
        self.prepare_slot(0, file, cancel).await
    }

    /// Process a batch concurrently. Results come back in input order; the
    /// first failure fails the whole batch.
    pub async fn prepare_all(
        &self,
        files: &[ImageFile],
        cancel: &CancellationToken,
    ) -> Result<Vec<PreparedImage>> {
        let tasks = files
            .iter()
            .enumerate()
            .map(|(slot, file)| self.prepare_slot(slot, file, cancel));
        futures::future::try_join_all(tasks).await
    }

    async fn prepare_slot(
        &self,
        slot: usize,
        file: &ImageFile,
        cancel: &CancellationToken,
    ) -> Result<PreparedImage> {
        self.ensure_live(cancel)?;
        self.emit(PipelineEvent::Validating { slot });
        self.validate(file)?;

        let img = image::load_from_memory(&file.bytes)?;
        self.ensure_live(cancel)?;

        let original_size = file.size() as usize;
        let primary = self.compress(
            slot,
            &img,
            self.config.max_dimension,
            self.config.target_size,
            cancel,
        )?;
        self.emit(PipelineEvent::Compressed {
            slot,
            original_size,
            final_size: primary.bytes.len(),
            quality: primary.quality,
        });
        self.ensure_live(cancel)?;

        self.emit(PipelineEvent::Uploading { slot });
        let uploaded = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            result = self.storage.upload(&primary.bytes, "image/jpeg") => result,
        };

        match uploaded {
            Ok(url) => {
                self.emit(PipelineEvent::Uploaded {
                    slot,
                    url: url.clone(),
                });
                Ok(PreparedImage {
                    reference: ImageRef::Remote(url),
                    original_size,
                    final_size: primary.bytes.len(),
                    width: primary.width,
                    height: primary.height,
                    quality: primary.quality,
                })
            }
            Err(err) => {
                tracing::warn!(slot, error = %err, "storage upload failed, embedding as data URI");
                self.emit(PipelineEvent::FallingBack {
                    slot,
                    reason: err.to_string(),
                });
                self.ensure_live(cancel)?;

                let fallback = self.compress(
                    slot,
                    &img,
                    self.config.fallback_dimension,
                    self.config.fallback_size,
                    cancel,
                )?;
                if !fallback.within_budget {
                    return Err(AppError::CompressionExhausted);
                }

                let uri = format!(
                    "data:image/jpeg;base64,{}",
                    STANDARD.encode(&fallback.bytes)
                );
                Ok(PreparedImage {
                    reference: ImageRef::DataUri(uri),
                    original_size,
                    final_size: fallback.bytes.len(),
                    width: fallback.width,
                    height: fallback.height,
                    quality: fallback.quality,
                })
            }
        }
    }

    // Downscale to the dimension cap, then re-encode at each quality level
    // until one lands under target_size. The last attempt is returned either
    // way; within_budget records whether it made the target.
    fn compress(
        &self,
        slot: usize,
        img: &DynamicImage,
        max_dimension: u32,
        target_size: u64,
        cancel: &CancellationToken,
    ) -> Result<CompressionOutcome> {
        let (width, height) = fit_within(img.width(), img.height(), max_dimension);
        let resized = if (width, height) == (img.width(), img.height()) {
            img.to_rgb8()
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
        };

        let total = self.config.quality_levels.len();
        let mut last: Option<CompressionOutcome> = None;

        for (index, &quality) in self.config.quality_levels.iter().enumerate() {
            self.ensure_live(cancel)?;
            let bytes = encode_jpeg(&resized, quality)?;
            self.emit(PipelineEvent::CompressionAttempt {
                slot,
                attempt: index + 1,
                total,
                quality,
                size: bytes.len(),
            });

            let within_budget = bytes.len() as u64 <= target_size;
            let outcome = CompressionOutcome {
                bytes,
                quality,
                width,
                height,
                within_budget,
            };
            if within_budget {
                return Ok(outcome);
            }
            last = Some(outcome);
        }

        last.ok_or_else(|| AppError::Config("no compression quality levels configured".to_string()))
    }
}

/// Shrink `(width, height)` so the larger side fits `max`, preserving
/// aspect ratio. Images already inside the cap are never upscaled.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    if width > height {
        let scaled = (height as f64 * max as f64 / width as f64).round() as u32;
        (max, scaled.max(1))
    } else {
        let scaled = (width as f64 * max as f64 / height as f64).round() as u32;
        (scaled.max(1), max)
    }
}

fn encode_jpeg(img: &image::RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}
