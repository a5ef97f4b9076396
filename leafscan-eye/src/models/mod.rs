//! Detector seam and model management

pub mod detector;
pub mod manager;
pub mod onnx;
pub mod recorded;

pub use detector::{apply_nms, Detector, InferenceParams};
pub use manager::ModelManager;
#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;
pub use recorded::{DetectionFixture, RecordedBox, RecordedDetector};
