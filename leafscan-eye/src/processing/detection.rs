//! Detection pipeline: inference followed by annotation

use crate::error::VisionError;
use crate::models::{Detector, InferenceParams};
use crate::processing::annotator::{annotate, Annotation, DisplayOptions};
use image::RgbImage;
use leafscan_core::DetectionSettings;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Detection pipeline
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
}

impl DetectionPipeline {
    /// Create a new detection pipeline
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.detector
    }

    /// Run the detector on `image` and annotate the result
    pub fn analyze(&self, image: &RgbImage, settings: &DetectionSettings) -> Result<Annotation, VisionError> {
        let started = Instant::now();
        let params = InferenceParams::from(settings);
        let detections = self.detector.predict(image, &params)?;
        let inference = started.elapsed();

        let annotation = annotate(image, &detections, &DisplayOptions::from(settings));
        debug!(
            "Detected {} objects in {:?} (total {:?})",
            annotation.detections.len(),
            inference,
            started.elapsed()
        );
        Ok(annotation)
    }
}
