use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("file is not an image")]
    InvalidFileKind,

    #[error("file size {size} bytes exceeds maximum allowed size {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("unable to compress image within the inline embedding budget")]
    CompressionExhausted,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("generation request failed: {0}")]
    Generation(String),

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
