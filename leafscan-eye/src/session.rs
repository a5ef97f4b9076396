//! Per-session state: settings, history ledger and capture statistics
//!
//! A session has a single writer. The host owns it and lends it to the
//! pipeline or the capture loop by `&mut`.

use crate::error::VisionError;
use crate::processing::{Annotation, DetectionPipeline};
use chrono::{DateTime, Local};
use image::RgbImage;
use leafscan_core::{
    Debouncer, DetectionSettings, DetectionSource, EnrichedDetection, HistoryLedger, LeafScanConfig,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// How frames reach the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// One still image per request
    Upload,
    /// Continuous capture from a frame source
    Camera,
}

pub struct Session {
    settings: DetectionSettings,
    mode: ProcessingMode,
    ledger: HistoryLedger,
    debouncer: Debouncer,
    frame_count: u64,
    fps: f64,
    last_detections: Vec<EnrichedDetection>,
    capture_started: Option<Instant>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DetectionSettings::default())
    }
}

impl Session {
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            settings,
            mode: ProcessingMode::Upload,
            ledger: HistoryLedger::new(),
            debouncer: Debouncer::default(),
            frame_count: 0,
            fps: 0.0,
            last_detections: Vec::new(),
            capture_started: None,
        }
    }

    /// Build a session from a validated configuration file
    pub fn from_config(config: &LeafScanConfig) -> Self {
        Self {
            ledger: HistoryLedger::with_capacity(config.history.capacity),
            debouncer: Debouncer::new(Duration::from_secs(config.history.debounce_secs)),
            ..Self::new(config.detection.clone())
        }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Replace the settings used by subsequent requests
    pub fn set_settings(&mut self, settings: DetectionSettings) -> Result<(), VisionError> {
        settings.validate().map_err(VisionError::Config)?;
        self.settings = settings;
        Ok(())
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second measured since capture started
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Detections of the most recent upload or frame
    pub fn last_detections(&self) -> &[EnrichedDetection] {
        &self.last_detections
    }

    /// Analyze one uploaded image. Every detection is logged.
    pub fn analyze_upload(
        &mut self,
        pipeline: &DetectionPipeline,
        image: &RgbImage,
    ) -> Result<Annotation, VisionError> {
        self.mode = ProcessingMode::Upload;
        let annotation = pipeline.analyze(image, &self.settings)?;
        self.ledger.record(&annotation.detections, DetectionSource::Upload);
        self.last_detections = annotation.detections.clone();
        Ok(annotation)
    }

    /// Reset frame statistics and switch to camera mode
    pub fn begin_capture(&mut self) {
        self.mode = ProcessingMode::Camera;
        self.frame_count = 0;
        self.fps = 0.0;
        self.capture_started = Some(Instant::now());
    }

    /// Account for one processed camera frame and log its debounced
    /// detections. Returns how many entries reached the ledger.
    pub fn observe_frame(&mut self, detections: &[EnrichedDetection], now: DateTime<Local>) -> usize {
        self.frame_count += 1;
        if let Some(started) = self.capture_started {
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                self.fps = self.frame_count as f64 / elapsed;
            }
        }

        let accepted = self.debouncer.filter(detections, now);
        if !accepted.is_empty() {
            self.ledger.record_at(&accepted, DetectionSource::Camera, now);
        }
        debug!(
            "Frame {}: {} detections, {} logged",
            self.frame_count,
            detections.len(),
            accepted.len()
        );

        self.last_detections = detections.to_vec();
        accepted.len()
    }

    pub fn end_capture(&mut self) {
        self.capture_started = None;
    }

    pub fn is_capturing(&self) -> bool {
        self.capture_started.is_some()
    }

    /// Empty the history and forget debounce timing
    pub fn clear_history(&mut self) {
        self.ledger.clear();
        self.debouncer.reset();
    }
}
