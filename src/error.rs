//! Error types for the viewer engine.

use thiserror::Error;
use tileview_gpu::GpuError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// GPU failures: fatal during `initialize`, logged afterwards.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    #[error("GPU context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Tile worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Texture is no longer valid")]
    InvalidTexture,

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl From<image::ImageError> for ViewerError {
    fn from(e: image::ImageError) -> Self {
        ViewerError::ImageDecode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
