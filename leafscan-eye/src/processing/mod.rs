//! Vision processing pipelines

pub mod annotator;
pub mod detection;
pub mod text;

pub use annotator::{annotate, compose_label, draw_hud, hud_status, Annotation, DisplayOptions};
pub use detection::DetectionPipeline;
