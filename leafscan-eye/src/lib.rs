//! leafscan-eye: detection pipeline and capture for LeafScan
//!
//! Runs a pluggable detector over still images or a stream of frames,
//! draws annotated results and feeds detections into a session's history
//! ledger.

pub mod camera;
pub mod capture_loop;
pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod session;

pub use camera::{DirectoryFrameSource, FrameSource};
pub use capture_loop::{CaptureLoop, CaptureSummary, FrameReport, StopReason};
pub use config::VisionConfig;
pub use error::VisionError;
pub use models::{Detector, InferenceParams, ModelManager, RecordedDetector};
pub use processing::{Annotation, DetectionPipeline, DisplayOptions};
pub use session::{ProcessingMode, Session};
