//! Error types for leafscan-eye

use leafscan_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Camera(msg) => CoreError::Capture(msg),
            VisionError::Config(msg) | VisionError::Model(msg) => CoreError::Configuration(msg),
            VisionError::Io(e) => CoreError::Io(e),
            VisionError::Core(e) => e,
            other => CoreError::Processing(format!("Vision error: {}", other)),
        }
    }
}
